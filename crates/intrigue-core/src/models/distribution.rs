use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hard limit on the length of a single X post.
pub const MAX_POST_CHARS: usize = 280;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DistributionStatus {
    Scheduled,
    Completed,
    Failed,
}

impl DistributionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Scheduled,
        }
    }
}

/// A batch of outbound posts for one issue on one channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distribution {
    pub id: String,
    pub issue_id: String,
    pub channel: String,
    pub status: DistributionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum XPostStatus {
    Scheduled,
    Posted,
    Failed,
}

impl XPostStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Scheduled => "scheduled",
            Self::Posted => "posted",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "posted" => Self::Posted,
            "failed" => Self::Failed,
            _ => Self::Scheduled,
        }
    }
}

/// One planned post. Only the distribution poster moves it out of `scheduled`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct XPostingScheduleEntry {
    pub id: String,
    pub distribution_id: String,
    pub issue_id: String,
    pub story_index: i64,
    pub post_text: String,
    pub scheduled_time: DateTime<Utc>,
    pub status: XPostStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl XPostingScheduleEntry {
    pub fn new(
        distribution_id: impl Into<String>,
        issue_id: impl Into<String>,
        story_index: i64,
        text: &str,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            distribution_id: distribution_id.into(),
            issue_id: issue_id.into(),
            story_index,
            post_text: truncate_post(text),
            scheduled_time,
            status: XPostStatus::Scheduled,
            posted_at: None,
            post_url: None,
            error_message: None,
        }
    }
}

/// A post planned by the `x_posting` step, before it is scheduled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlannedPost {
    #[serde(default)]
    pub story_index: i64,
    pub text: String,
    #[serde(default)]
    pub delay_minutes: Option<i64>,
}

/// Input for scheduling posts for an issue by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDistributionInput {
    #[serde(default = "default_channel")]
    pub channel: String,
    pub posts: Vec<PlannedPost>,
}

fn default_channel() -> String {
    "x".to_string()
}

/// Cut a post to the X limit on a char boundary, marking the cut with an ellipsis.
pub fn truncate_post(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_POST_CHARS {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_POST_CHARS - 1).collect();
    cut.push('…');
    cut
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_posts_are_kept() {
        assert_eq!(truncate_post("  gm bitcoin  "), "gm bitcoin");
    }

    #[test]
    fn long_posts_are_cut_to_limit() {
        let long = "₿".repeat(400);
        let cut = truncate_post(&long);
        assert_eq!(cut.chars().count(), MAX_POST_CHARS);
        assert!(cut.ends_with('…'));
    }
}
