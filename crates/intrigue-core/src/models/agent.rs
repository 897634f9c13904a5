use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The closed set of pipeline roles an agent can play.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Researcher,
    Planner,
    Writer,
    Reviewer,
    Seo,
    Image,
    ContentReview,
    XPosting,
}

impl AgentRole {
    pub const ALL: [AgentRole; 8] = [
        Self::Researcher,
        Self::Planner,
        Self::Writer,
        Self::Reviewer,
        Self::Seo,
        Self::Image,
        Self::ContentReview,
        Self::XPosting,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Researcher => "researcher",
            Self::Planner => "planner",
            Self::Writer => "writer",
            Self::Reviewer => "reviewer",
            Self::Seo => "seo",
            Self::Image => "image",
            Self::ContentReview => "content_review",
            Self::XPosting => "x_posting",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.as_str() == s)
    }
}

/// A named, role-tagged configuration for one pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentDefinition {
    pub id: String,
    pub name: String,
    pub role: AgentRole,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub model: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AgentDefinition {
    pub fn new(name: impl Into<String>, role: AgentRole, instructions: impl Into<String>, model: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            role,
            instructions: instructions.into(),
            model: model.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Input for creating or upserting an agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAgentInput {
    /// Explicit id (used by YAML imports); generated when absent.
    pub id: Option<String>,
    pub name: String,
    pub role: AgentRole,
    #[serde(default)]
    pub instructions: String,
    #[serde(default)]
    pub model: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// Partial update input for PATCH.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAgentInput {
    pub name: Option<String>,
    pub role: Option<AgentRole>,
    pub instructions: Option<String>,
    pub model: Option<String>,
    pub is_active: Option<bool>,
}

pub(crate) fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_strings_round_trip() {
        for role in AgentRole::ALL {
            assert_eq!(AgentRole::from_str(role.as_str()), Some(role));
        }
        assert_eq!(AgentRole::from_str("editor"), None);
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&AgentRole::XPosting).unwrap();
        assert_eq!(json, "\"x_posting\"");
        let role: AgentRole = serde_json::from_str("\"content_review\"").unwrap();
        assert_eq!(role, AgentRole::ContentReview);
    }
}
