use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::default_true;

/// An ordered list of agent steps defining one content pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Agent ids, executed in order. Soft references: ids that no longer
    /// resolve are skipped at run time.
    pub steps: Vec<String>,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub requires_approval: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approval_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WorkflowDefinition {
    /// Unset means approval is required.
    pub fn needs_approval(&self) -> bool {
        self.requires_approval.unwrap_or(true)
    }
}

/// Input for creating or upserting a workflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkflowInput {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub requires_approval: Option<bool>,
    pub approval_message: Option<String>,
}

/// Partial update input for PATCH.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkflowInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub steps: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub requires_approval: Option<bool>,
    pub approval_message: Option<String>,
}
