use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::workflow::{CreateWorkflowInput, UpdateWorkflowInput, WorkflowDefinition};
use crate::store::to_dt_or_now;

const WORKFLOW_COLUMNS: &str =
    "id, name, description, steps, is_active, requires_approval, approval_message, created_at, updated_at";

#[derive(Clone)]
pub struct WorkflowStore {
    db: Database,
}

impl WorkflowStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateWorkflowInput) -> Result<WorkflowDefinition, ServerError> {
        let now = Utc::now();
        let w = WorkflowDefinition {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: input.name,
            description: input.description,
            steps: input.steps,
            is_active: input.is_active,
            requires_approval: input.requires_approval,
            approval_message: input.approval_message,
            created_at: now,
            updated_at: now,
        };
        self.save(&w).await?;
        Ok(w)
    }

    pub async fn save(&self, workflow: &WorkflowDefinition) -> Result<(), ServerError> {
        let w = workflow.clone();
        let steps = serde_json::to_string(&w.steps).unwrap_or_else(|_| "[]".to_string());
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO workflows (id, name, description, steps, is_active, requires_approval,
                       approval_message, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       description = excluded.description,
                       steps = excluded.steps,
                       is_active = excluded.is_active,
                       requires_approval = excluded.requires_approval,
                       approval_message = excluded.approval_message,
                       updated_at = excluded.updated_at",
                    rusqlite::params![
                        w.id,
                        w.name,
                        w.description,
                        steps,
                        w.is_active as i64,
                        w.requires_approval.map(|v| v as i64),
                        w.approval_message,
                        w.created_at.timestamp_millis(),
                        w.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<WorkflowDefinition>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM workflows WHERE id = ?1", WORKFLOW_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_workflow(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<WorkflowDefinition>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM workflows ORDER BY created_at DESC",
                    WORKFLOW_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_workflow(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn update(&self, id: &str, input: UpdateWorkflowInput) -> Result<Option<WorkflowDefinition>, ServerError> {
        let Some(mut w) = self.get(id).await? else { return Ok(None) };
        if let Some(v) = input.name { w.name = v; }
        if let Some(v) = input.description { w.description = v; }
        if let Some(v) = input.steps { w.steps = v; }
        if let Some(v) = input.is_active { w.is_active = v; }
        if let Some(v) = input.requires_approval { w.requires_approval = Some(v); }
        if let Some(v) = input.approval_message { w.approval_message = Some(v); }
        w.updated_at = Utc::now();
        self.save(&w).await?;
        Ok(Some(w))
    }

    /// Schedules pointing at a deleted workflow are left in place; they fail
    /// with "workflow not found" when they fire.
    pub async fn delete(&self, id: &str) -> Result<bool, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM workflows WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_workflow(row: &rusqlite::Row<'_>) -> WorkflowDefinition {
    let steps_str: String = row.get(3).unwrap_or_default();
    WorkflowDefinition {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        description: row.get(2).unwrap_or_default(),
        steps: serde_json::from_str(&steps_str).unwrap_or_default(),
        is_active: row.get::<_, i64>(4).unwrap_or(0) != 0,
        requires_approval: row.get::<_, Option<i64>>(5).unwrap_or(None).map(|v| v != 0),
        approval_message: row.get(6).unwrap_or(None),
        created_at: to_dt_or_now(row.get(7).ok()),
        updated_at: to_dt_or_now(row.get(8).ok()),
    }
}
