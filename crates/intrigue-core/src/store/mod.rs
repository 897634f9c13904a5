pub mod agent_store;
pub mod author_store;
pub mod distribution_store;
pub mod execution_store;
pub mod issue_store;
pub mod schedule_store;
pub mod subscriber_store;
pub mod workflow_store;

pub use agent_store::AgentStore;
pub use author_store::AuthorStore;
pub use distribution_store::{DistributionStore, XPostStore};
pub use execution_store::ExecutionStore;
pub use issue_store::IssueStore;
pub use schedule_store::ScheduleStore;
pub use subscriber_store::SubscriberStore;
pub use workflow_store::WorkflowStore;

use chrono::{DateTime, TimeZone, Utc};

pub(crate) fn to_dt(ms: Option<i64>) -> Option<DateTime<Utc>> {
    ms.and_then(|v| Utc.timestamp_millis_opt(v).single())
}

pub(crate) fn to_dt_or_now(ms: Option<i64>) -> DateTime<Utc> {
    to_dt(ms).unwrap_or_else(Utc::now)
}
