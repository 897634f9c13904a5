use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Outcome of one workflow step as recorded in the execution log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Success,
    Warning,
    Error,
    Skipped,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLogEntry {
    /// Agent display name, or the raw step id when the agent did not resolve.
    pub agent: String,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionLogEntry {
    pub fn success(agent: impl Into<String>) -> Self {
        Self { agent: agent.into(), status: StepStatus::Success, error: None }
    }

    pub fn warning(agent: impl Into<String>, error: impl Into<String>) -> Self {
        Self { agent: agent.into(), status: StepStatus::Warning, error: Some(error.into()) }
    }

    pub fn error(agent: impl Into<String>, error: impl Into<String>) -> Self {
        Self { agent: agent.into(), status: StepStatus::Error, error: Some(error.into()) }
    }

    pub fn skipped(agent: impl Into<String>, reason: impl Into<String>) -> Self {
        Self { agent: agent.into(), status: StepStatus::Skipped, error: Some(reason.into()) }
    }
}

/// One firing of a schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub id: String,
    pub schedule_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    pub status: ExecutionStatus,
    /// The cron instant this execution answers; `None` for manual runs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fire_at: Option<DateTime<Utc>>,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub logs: Vec<ExecutionLogEntry>,
}

impl ExecutionRecord {
    pub fn start(schedule_id: impl Into<String>, fire_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            schedule_id: schedule_id.into(),
            issue_id: None,
            status: ExecutionStatus::InProgress,
            fire_at,
            started_at: Utc::now(),
            completed_at: None,
            error_message: None,
            logs: Vec::new(),
        }
    }
}
