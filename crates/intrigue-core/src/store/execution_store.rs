use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::execution::{ExecutionLogEntry, ExecutionRecord, ExecutionStatus};
use crate::store::{to_dt, to_dt_or_now};

const EXECUTION_COLUMNS: &str =
    "id, schedule_id, issue_id, status, fire_at, started_at, completed_at, error_message, logs";

/// Append-only history of schedule firings.
#[derive(Clone)]
pub struct ExecutionStore {
    db: Database,
}

impl ExecutionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, record: &ExecutionRecord) -> Result<(), ServerError> {
        let r = record.clone();
        let logs = serde_json::to_string(&r.logs).unwrap_or_else(|_| "[]".to_string());
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO executions (id, schedule_id, issue_id, status, fire_at, started_at, \
                     completed_at, error_message, logs) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                    rusqlite::params![
                        r.id,
                        r.schedule_id,
                        r.issue_id,
                        r.status.as_str(),
                        r.fire_at.map(|t| t.timestamp_millis()),
                        r.started_at.timestamp_millis(),
                        r.completed_at.map(|t| t.timestamp_millis()),
                        r.error_message,
                        logs,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    /// Move a record to `completed`, storing the produced issue and step log.
    pub async fn complete(
        &self,
        id: &str,
        issue_id: Option<&str>,
        logs: &[ExecutionLogEntry],
    ) -> Result<(), ServerError> {
        self.finish(id, ExecutionStatus::Completed, issue_id.map(String::from), None, logs)
            .await
    }

    /// Move a record to `failed`, keeping whatever partial log exists.
    pub async fn fail(&self, id: &str, error: &str, logs: &[ExecutionLogEntry]) -> Result<(), ServerError> {
        self.finish(id, ExecutionStatus::Failed, None, Some(error.to_string()), logs)
            .await
    }

    async fn finish(
        &self,
        id: &str,
        status: ExecutionStatus,
        issue_id: Option<String>,
        error: Option<String>,
        logs: &[ExecutionLogEntry],
    ) -> Result<(), ServerError> {
        let id = id.to_string();
        let logs = serde_json::to_string(logs).unwrap_or_else(|_| "[]".to_string());
        let now = Utc::now().timestamp_millis();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE executions SET status = ?2, issue_id = COALESCE(?3, issue_id), \
                     error_message = ?4, logs = ?5, completed_at = ?6 WHERE id = ?1",
                    rusqlite::params![id, status.as_str(), issue_id, error, logs, now],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<ExecutionRecord>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM executions WHERE id = ?1", EXECUTION_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_execution(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list_by_schedule(&self, schedule_id: &str) -> Result<Vec<ExecutionRecord>, ServerError> {
        let sid = schedule_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM executions WHERE schedule_id = ?1 ORDER BY started_at DESC",
                    EXECUTION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![sid], |row| Ok(row_to_execution(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// An `in_progress` or `completed` execution already answering this
    /// fire instant. Failed executions do not block a retry.
    pub async fn find_active_for_fire(
        &self,
        schedule_id: &str,
        fire_at: DateTime<Utc>,
    ) -> Result<Option<ExecutionRecord>, ServerError> {
        let sid = schedule_id.to_string();
        let fire_ms = fire_at.timestamp_millis();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!(
                        "SELECT {} FROM executions WHERE schedule_id = ?1 AND fire_at = ?2 \
                         AND status IN ('in_progress', 'completed') LIMIT 1",
                        EXECUTION_COLUMNS
                    ),
                    rusqlite::params![sid, fire_ms],
                    |row| Ok(row_to_execution(row)),
                )
                .optional()
            })
            .await
    }
}

fn row_to_execution(row: &rusqlite::Row<'_>) -> ExecutionRecord {
    let logs_str: String = row.get(8).unwrap_or_default();
    ExecutionRecord {
        id: row.get(0).unwrap_or_default(),
        schedule_id: row.get(1).unwrap_or_default(),
        issue_id: row.get(2).unwrap_or(None),
        status: ExecutionStatus::from_str(&row.get::<_, String>(3).unwrap_or_default()),
        fire_at: to_dt(row.get(4).unwrap_or(None)),
        started_at: to_dt_or_now(row.get(5).ok()),
        completed_at: to_dt(row.get(6).unwrap_or(None)),
        error_message: row.get(7).unwrap_or(None),
        logs: serde_json::from_str(&logs_str).unwrap_or_default(),
    }
}
