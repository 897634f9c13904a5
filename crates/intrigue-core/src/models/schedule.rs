use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::default_true;

/// A cron-triggered binding of a workflow to a recurring time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: String,
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Five fields: minute hour day-of-month month day-of-week.
    pub cron_expression: String,
    pub timezone: String,
    pub is_active: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateScheduleInput {
    pub workflow_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub cron_expression: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_timezone() -> String {
    "UTC".to_string()
}

/// Partial update input for PATCH.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateScheduleInput {
    pub workflow_id: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub cron_expression: Option<String>,
    pub timezone: Option<String>,
    pub is_active: Option<bool>,
    pub last_run_at: Option<DateTime<Utc>>,
}
