use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::distribution::{Distribution, DistributionStatus, XPostStatus, XPostingScheduleEntry};
use crate::store::{to_dt, to_dt_or_now};

const DISTRIBUTION_COLUMNS: &str = "id, issue_id, channel, status, created_at, updated_at";
const X_POST_COLUMNS: &str = "id, distribution_id, issue_id, story_index, post_text, scheduled_time, \
     status, posted_at, post_url, error_message";

#[derive(Clone)]
pub struct DistributionStore {
    db: Database,
}

impl DistributionStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, issue_id: &str, channel: &str) -> Result<Distribution, ServerError> {
        let now = Utc::now();
        let d = Distribution {
            id: Uuid::new_v4().to_string(),
            issue_id: issue_id.to_string(),
            channel: channel.to_string(),
            status: DistributionStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        let dc = d.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO distributions (id, issue_id, channel, status, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                    rusqlite::params![
                        dc.id,
                        dc.issue_id,
                        dc.channel,
                        dc.status.as_str(),
                        dc.created_at.timestamp_millis(),
                        dc.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(d)
    }

    pub async fn list_by_issue(&self, issue_id: &str) -> Result<Vec<Distribution>, ServerError> {
        let iid = issue_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM distributions WHERE issue_id = ?1 ORDER BY created_at ASC",
                    DISTRIBUTION_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![iid], |row| Ok(row_to_distribution(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Remove every distribution of an issue; their posting entries go with them.
    pub async fn delete_by_issue(&self, issue_id: &str) -> Result<usize, ServerError> {
        let iid = issue_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute("DELETE FROM distributions WHERE issue_id = ?1", rusqlite::params![iid])
            })
            .await
    }

    /// Settle a distribution once none of its entries are still scheduled:
    /// `failed` if any entry failed, `completed` otherwise.
    pub async fn refresh_status(&self, distribution_id: &str) -> Result<DistributionStatus, ServerError> {
        let did = distribution_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let (scheduled, failed): (i64, i64) = conn.query_row(
                    "SELECT \
                       COALESCE(SUM(CASE WHEN status = 'scheduled' THEN 1 ELSE 0 END), 0), \
                       COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) \
                     FROM x_posting_schedule WHERE distribution_id = ?1",
                    rusqlite::params![did],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                let status = if scheduled > 0 {
                    DistributionStatus::Scheduled
                } else if failed > 0 {
                    DistributionStatus::Failed
                } else {
                    DistributionStatus::Completed
                };
                conn.execute(
                    "UPDATE distributions SET status = ?2, updated_at = ?3 WHERE id = ?1",
                    rusqlite::params![did, status.as_str(), Utc::now().timestamp_millis()],
                )?;
                Ok(status)
            })
            .await
    }
}

fn row_to_distribution(row: &rusqlite::Row<'_>) -> Distribution {
    Distribution {
        id: row.get(0).unwrap_or_default(),
        issue_id: row.get(1).unwrap_or_default(),
        channel: row.get(2).unwrap_or_default(),
        status: DistributionStatus::from_str(&row.get::<_, String>(3).unwrap_or_default()),
        created_at: to_dt_or_now(row.get(4).ok()),
        updated_at: to_dt_or_now(row.get(5).ok()),
    }
}

/// Queued X posts. Only the distribution poster changes their status.
#[derive(Clone)]
pub struct XPostStore {
    db: Database,
}

impl XPostStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, entry: &XPostingScheduleEntry) -> Result<(), ServerError> {
        let e = entry.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO x_posting_schedule (id, distribution_id, issue_id, story_index, post_text, \
                     scheduled_time, status, posted_at, post_url, error_message) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        e.id,
                        e.distribution_id,
                        e.issue_id,
                        e.story_index,
                        e.post_text,
                        e.scheduled_time.timestamp_millis(),
                        e.status.as_str(),
                        e.posted_at.map(|t| t.timestamp_millis()),
                        e.post_url,
                        e.error_message,
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<XPostingScheduleEntry>, ServerError> {
        use rusqlite::OptionalExtension;
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM x_posting_schedule WHERE id = ?1", X_POST_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_entry(row)),
                )
                .optional()
            })
            .await
    }

    /// Scheduled entries whose time has come, oldest first.
    pub async fn list_due(&self, now: DateTime<Utc>) -> Result<Vec<XPostingScheduleEntry>, ServerError> {
        let now_ms = now.timestamp_millis();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM x_posting_schedule WHERE status = 'scheduled' AND scheduled_time <= ?1 \
                     ORDER BY scheduled_time ASC",
                    X_POST_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![now_ms], |row| Ok(row_to_entry(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn list_by_distribution(&self, distribution_id: &str) -> Result<Vec<XPostingScheduleEntry>, ServerError> {
        let did = distribution_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM x_posting_schedule WHERE distribution_id = ?1 ORDER BY scheduled_time ASC",
                    X_POST_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![did], |row| Ok(row_to_entry(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn mark_posted(&self, id: &str, url: &str, at: DateTime<Utc>) -> Result<(), ServerError> {
        let id = id.to_string();
        let url = url.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE x_posting_schedule SET status = ?2, post_url = ?3, posted_at = ?4, \
                     error_message = NULL WHERE id = ?1",
                    rusqlite::params![id, XPostStatus::Posted.as_str(), url, at.timestamp_millis()],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn mark_failed(&self, id: &str, error: &str) -> Result<(), ServerError> {
        let id = id.to_string();
        let error = error.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE x_posting_schedule SET status = ?2, error_message = ?3 WHERE id = ?1",
                    rusqlite::params![id, XPostStatus::Failed.as_str(), error],
                )?;
                Ok(())
            })
            .await
    }
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> XPostingScheduleEntry {
    XPostingScheduleEntry {
        id: row.get(0).unwrap_or_default(),
        distribution_id: row.get(1).unwrap_or_default(),
        issue_id: row.get(2).unwrap_or_default(),
        story_index: row.get(3).unwrap_or(0),
        post_text: row.get(4).unwrap_or_default(),
        scheduled_time: to_dt_or_now(row.get(5).ok()),
        status: XPostStatus::from_str(&row.get::<_, String>(6).unwrap_or_default()),
        posted_at: to_dt(row.get(7).unwrap_or(None)),
        post_url: row.get(8).unwrap_or(None),
        error_message: row.get(9).unwrap_or(None),
    }
}
