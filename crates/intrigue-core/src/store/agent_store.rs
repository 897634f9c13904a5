use chrono::Utc;
use rusqlite::OptionalExtension;
use std::collections::HashMap;
use uuid::Uuid;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::agent::{AgentDefinition, AgentRole, CreateAgentInput, UpdateAgentInput};
use crate::store::to_dt_or_now;

const AGENT_COLUMNS: &str = "id, name, role, instructions, model, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct AgentStore {
    db: Database,
}

impl AgentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn create(&self, input: CreateAgentInput) -> Result<AgentDefinition, ServerError> {
        let now = Utc::now();
        let agent = AgentDefinition {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: input.name,
            role: input.role,
            instructions: input.instructions,
            model: input.model,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        self.save(&agent).await?;
        Ok(agent)
    }

    pub async fn save(&self, agent: &AgentDefinition) -> Result<(), ServerError> {
        let a = agent.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO agents (id, name, role, instructions, model, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       role = excluded.role,
                       instructions = excluded.instructions,
                       model = excluded.model,
                       is_active = excluded.is_active,
                       updated_at = excluded.updated_at",
                    rusqlite::params![
                        a.id,
                        a.name,
                        a.role.as_str(),
                        a.instructions,
                        a.model,
                        a.is_active as i64,
                        a.created_at.timestamp_millis(),
                        a.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, agent_id: &str) -> Result<Option<AgentDefinition>, ServerError> {
        let id = agent_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM agents WHERE id = ?1", AGENT_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_agent(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<AgentDefinition>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("SELECT {} FROM agents ORDER BY created_at ASC", AGENT_COLUMNS))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_agent(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Build an id → agent lookup for the given step ids. Ids that do not
    /// resolve are simply absent from the map.
    pub async fn lookup(&self, ids: &[String]) -> Result<HashMap<String, AgentDefinition>, ServerError> {
        let mut map = HashMap::new();
        for id in ids {
            if map.contains_key(id) {
                continue;
            }
            if let Some(agent) = self.get(id).await? {
                map.insert(id.clone(), agent);
            }
        }
        Ok(map)
    }

    pub async fn update(&self, id: &str, input: UpdateAgentInput) -> Result<Option<AgentDefinition>, ServerError> {
        let Some(mut a) = self.get(id).await? else { return Ok(None) };
        if let Some(v) = input.name { a.name = v; }
        if let Some(v) = input.role { a.role = v; }
        if let Some(v) = input.instructions { a.instructions = v; }
        if let Some(v) = input.model { a.model = v; }
        if let Some(v) = input.is_active { a.is_active = v; }
        a.updated_at = Utc::now();
        self.save(&a).await?;
        Ok(Some(a))
    }

    pub async fn delete(&self, agent_id: &str) -> Result<bool, ServerError> {
        let id = agent_id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM agents WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_agent(row: &rusqlite::Row<'_>) -> AgentDefinition {
    AgentDefinition {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        role: AgentRole::from_str(&row.get::<_, String>(2).unwrap_or_default())
            .unwrap_or(AgentRole::Writer),
        instructions: row.get(3).unwrap_or_default(),
        model: row.get(4).unwrap_or_default(),
        is_active: row.get::<_, i64>(5).unwrap_or(0) != 0,
        created_at: to_dt_or_now(row.get(6).ok()),
        updated_at: to_dt_or_now(row.get(7).ok()),
    }
}
