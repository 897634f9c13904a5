use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::schedule::{CreateScheduleInput, Schedule, UpdateScheduleInput};
use crate::scheduler::cron::{validate_cron, validate_timezone};
use crate::store::{to_dt, to_dt_or_now};

const SCHEDULE_COLUMNS: &str = "id, workflow_id, name, description, cron_expression, timezone, \
     is_active, last_run_at, created_at, updated_at";

#[derive(Clone)]
pub struct ScheduleStore {
    db: Database,
}

impl ScheduleStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Invalid cron expressions and unknown timezones are rejected here,
    /// never when the schedule fires.
    pub async fn create(&self, input: CreateScheduleInput) -> Result<Schedule, ServerError> {
        let cron_expression = validate_cron(&input.cron_expression)?;
        validate_timezone(&input.timezone)?;

        let now = Utc::now();
        let s = Schedule {
            id: Uuid::new_v4().to_string(),
            workflow_id: input.workflow_id,
            name: input.name,
            description: input.description,
            cron_expression,
            timezone: input.timezone,
            is_active: input.is_active,
            last_run_at: None,
            created_at: now,
            updated_at: now,
        };
        let sc = s.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO schedules (id, workflow_id, name, description, cron_expression, timezone, \
                     is_active, last_run_at, created_at, updated_at) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                    rusqlite::params![
                        sc.id,
                        sc.workflow_id,
                        sc.name,
                        sc.description,
                        sc.cron_expression,
                        sc.timezone,
                        sc.is_active as i64,
                        sc.last_run_at.map(|t| t.timestamp_millis()),
                        sc.created_at.timestamp_millis(),
                        sc.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(s)
    }

    pub async fn get(&self, id: &str) -> Result<Option<Schedule>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM schedules WHERE id = ?1", SCHEDULE_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_schedule(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Schedule>, ServerError> {
        self.query_list(format!("SELECT {} FROM schedules ORDER BY created_at DESC", SCHEDULE_COLUMNS))
            .await
    }

    pub async fn list_active(&self) -> Result<Vec<Schedule>, ServerError> {
        self.query_list(format!(
            "SELECT {} FROM schedules WHERE is_active = 1 ORDER BY created_at ASC",
            SCHEDULE_COLUMNS
        ))
        .await
    }

    async fn query_list(&self, sql: String) -> Result<Vec<Schedule>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_schedule(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn update(&self, id: &str, input: UpdateScheduleInput) -> Result<Option<Schedule>, ServerError> {
        // Fetch first, then apply patches, then save
        let Some(mut s) = self.get(id).await? else { return Ok(None) };
        if let Some(v) = input.cron_expression { s.cron_expression = validate_cron(&v)?; }
        if let Some(v) = input.timezone {
            validate_timezone(&v)?;
            s.timezone = v;
        }
        if let Some(v) = input.workflow_id { s.workflow_id = v; }
        if let Some(v) = input.name { s.name = v; }
        if let Some(v) = input.description { s.description = v; }
        if let Some(v) = input.is_active { s.is_active = v; }
        if let Some(v) = input.last_run_at { s.last_run_at = Some(v); }
        s.updated_at = Utc::now();
        let sc = s.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE schedules SET workflow_id=?2, name=?3, description=?4, cron_expression=?5, \
                     timezone=?6, is_active=?7, last_run_at=?8, updated_at=?9 WHERE id=?1",
                    rusqlite::params![
                        sc.id,
                        sc.workflow_id,
                        sc.name,
                        sc.description,
                        sc.cron_expression,
                        sc.timezone,
                        sc.is_active as i64,
                        sc.last_run_at.map(|t| t.timestamp_millis()),
                        sc.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(Some(s))
    }

    pub async fn mark_run(&self, id: &str, at: DateTime<Utc>) -> Result<(), ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "UPDATE schedules SET last_run_at = ?2 WHERE id = ?1",
                    rusqlite::params![id, at.timestamp_millis()],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM schedules WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_schedule(row: &rusqlite::Row<'_>) -> Schedule {
    Schedule {
        id: row.get(0).unwrap_or_default(),
        workflow_id: row.get(1).unwrap_or_default(),
        name: row.get(2).unwrap_or_default(),
        description: row.get(3).unwrap_or_default(),
        cron_expression: row.get(4).unwrap_or_default(),
        timezone: row.get(5).unwrap_or_else(|_| "UTC".to_string()),
        is_active: row.get::<_, i64>(6).unwrap_or(0) != 0,
        last_run_at: to_dt(row.get(7).unwrap_or(None)),
        created_at: to_dt_or_now(row.get(8).ok()),
        updated_at: to_dt_or_now(row.get(9).ok()),
    }
}
