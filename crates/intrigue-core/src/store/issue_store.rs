use chrono::Utc;
use rusqlite::OptionalExtension;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::issue::{ApprovalStatus, Intro, Issue, IssueStatus, UpdateIssueInput};
use crate::store::{to_dt, to_dt_or_now};

const ISSUE_COLUMNS: &str = "id, issue_number, date, intro, stories, status, approval_status, \
     approved_at, approved_by, rejection_reason, scheduled_for, last_updated";

#[derive(Clone)]
pub struct IssueStore {
    db: Database,
}

impl IssueStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Insert or replace an issue. Stories are stored as one JSON column so
    /// their order survives the round trip.
    pub async fn save(&self, issue: &Issue) -> Result<(), ServerError> {
        let i = issue.clone();
        let intro = serde_json::to_string(&i.intro)
            .map_err(|e| ServerError::Internal(format!("Failed to encode intro: {}", e)))?;
        let stories = serde_json::to_string(&i.stories)
            .map_err(|e| ServerError::Internal(format!("Failed to encode stories: {}", e)))?;
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO issues (id, issue_number, date, intro, stories, status, approval_status,
                       approved_at, approved_by, rejection_reason, scheduled_for, last_updated)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                     ON CONFLICT(id) DO UPDATE SET
                       issue_number = excluded.issue_number,
                       date = excluded.date,
                       intro = excluded.intro,
                       stories = excluded.stories,
                       status = excluded.status,
                       approval_status = excluded.approval_status,
                       approved_at = excluded.approved_at,
                       approved_by = excluded.approved_by,
                       rejection_reason = excluded.rejection_reason,
                       scheduled_for = excluded.scheduled_for,
                       last_updated = excluded.last_updated",
                    rusqlite::params![
                        i.id,
                        i.issue_number,
                        i.date,
                        intro,
                        stories,
                        i.status.as_str(),
                        i.approval_status.as_str(),
                        i.approved_at.map(|t| t.timestamp_millis()),
                        i.approved_by,
                        i.rejection_reason,
                        i.scheduled_for.map(|t| t.timestamp_millis()),
                        i.last_updated.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Issue>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM issues WHERE id = ?1", ISSUE_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_issue(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Issue>, ServerError> {
        self.query_list(
            format!("SELECT {} FROM issues ORDER BY issue_number DESC", ISSUE_COLUMNS),
            None,
        )
        .await
    }

    pub async fn list_by_approval(&self, status: ApprovalStatus) -> Result<Vec<Issue>, ServerError> {
        self.query_list(
            format!(
                "SELECT {} FROM issues WHERE approval_status = ?1 ORDER BY issue_number DESC",
                ISSUE_COLUMNS
            ),
            Some(status.as_str().to_string()),
        )
        .await
    }

    pub async fn list_published(&self) -> Result<Vec<Issue>, ServerError> {
        self.query_list(
            format!("SELECT {} FROM issues WHERE status = ?1 ORDER BY issue_number DESC", ISSUE_COLUMNS),
            Some(IssueStatus::Published.as_str().to_string()),
        )
        .await
    }

    async fn query_list(&self, sql: String, param: Option<String>) -> Result<Vec<Issue>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = match param {
                    Some(p) => stmt
                        .query_map(rusqlite::params![p], |row| Ok(row_to_issue(row)))?
                        .collect::<Result<Vec<_>, _>>()?,
                    None => stmt
                        .query_map([], |row| Ok(row_to_issue(row)))?
                        .collect::<Result<Vec<_>, _>>()?,
                };
                Ok(rows)
            })
            .await
    }

    pub async fn next_issue_number(&self) -> Result<i64, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                conn.query_row("SELECT COALESCE(MAX(issue_number), 0) + 1 FROM issues", [], |row| row.get(0))
            })
            .await
    }

    /// Apply a human edit from the admin panel.
    pub async fn update(&self, id: &str, input: UpdateIssueInput) -> Result<Option<Issue>, ServerError> {
        let Some(mut i) = self.get(id).await? else { return Ok(None) };
        if let Some(v) = input.issue_number { i.issue_number = v; }
        if let Some(v) = input.date { i.date = v; }
        if let Some(v) = input.intro { i.intro = v; }
        if let Some(v) = input.stories { i.stories = v; }
        if let Some(v) = input.scheduled_for { i.scheduled_for = Some(v); }
        i.last_updated = Utc::now();
        self.save(&i).await?;
        Ok(Some(i))
    }

    /// Deleting an issue that still has distributions is a conflict; the
    /// caller removes them first.
    pub async fn delete(&self, id: &str) -> Result<bool, ServerError> {
        let id = id.to_string();
        let dependents: i64 = self
            .db
            .with_conn_async({
                let id = id.clone();
                move |conn| {
                    conn.query_row(
                        "SELECT COUNT(*) FROM distributions WHERE issue_id = ?1",
                        rusqlite::params![id],
                        |row| row.get(0),
                    )
                }
            })
            .await?;
        if dependents > 0 {
            return Err(ServerError::Conflict(format!(
                "Issue {} still has {} distribution(s)",
                id, dependents
            )));
        }
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM issues WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_issue(row: &rusqlite::Row<'_>) -> Issue {
    let intro_str: String = row.get(3).unwrap_or_default();
    let stories_str: String = row.get(4).unwrap_or_default();
    Issue {
        id: row.get(0).unwrap_or_default(),
        issue_number: row.get(1).unwrap_or(0),
        date: row.get(2).unwrap_or_default(),
        intro: serde_json::from_str::<Intro>(&intro_str).unwrap_or_default(),
        stories: serde_json::from_str(&stories_str).unwrap_or_default(),
        status: IssueStatus::from_str(&row.get::<_, String>(5).unwrap_or_default()),
        approval_status: ApprovalStatus::from_str(&row.get::<_, String>(6).unwrap_or_default()),
        approved_at: to_dt(row.get(7).unwrap_or(None)),
        approved_by: row.get(8).unwrap_or(None),
        rejection_reason: row.get(9).unwrap_or(None),
        scheduled_for: to_dt(row.get(10).unwrap_or(None)),
        last_updated: to_dt_or_now(row.get(11).ok()),
    }
}
