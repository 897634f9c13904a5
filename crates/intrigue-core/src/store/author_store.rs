use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::author::{AuthorAgent, CreateAuthorInput};
use crate::store::to_dt_or_now;

const AUTHOR_COLUMNS: &str = "id, name, x_username, x_api_key, x_api_secret, x_access_token, \
     x_access_secret, is_active, created_at, updated_at";

#[derive(Clone)]
pub struct AuthorStore {
    db: Database,
}

impl AuthorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn upsert(&self, input: CreateAuthorInput) -> Result<AuthorAgent, ServerError> {
        let now = Utc::now();
        let a = AuthorAgent {
            id: input.id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name: input.name,
            x_username: input.x_username,
            x_api_key: input.x_api_key,
            x_api_secret: input.x_api_secret,
            x_access_token: input.x_access_token,
            x_access_secret: input.x_access_secret,
            is_active: input.is_active,
            created_at: now,
            updated_at: now,
        };
        let ac = a.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO author_agents (id, name, x_username, x_api_key, x_api_secret, x_access_token,
                       x_access_secret, is_active, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       x_username = excluded.x_username,
                       x_api_key = excluded.x_api_key,
                       x_api_secret = excluded.x_api_secret,
                       x_access_token = excluded.x_access_token,
                       x_access_secret = excluded.x_access_secret,
                       is_active = excluded.is_active,
                       updated_at = excluded.updated_at",
                    rusqlite::params![
                        ac.id,
                        ac.name,
                        ac.x_username,
                        ac.x_api_key,
                        ac.x_api_secret,
                        ac.x_access_token,
                        ac.x_access_secret,
                        ac.is_active as i64,
                        ac.created_at.timestamp_millis(),
                        ac.updated_at.timestamp_millis(),
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(a)
    }

    pub async fn get(&self, id: &str) -> Result<Option<AuthorAgent>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM author_agents WHERE id = ?1", AUTHOR_COLUMNS),
                    rusqlite::params![id],
                    |row| Ok(row_to_author(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<AuthorAgent>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM author_agents ORDER BY created_at ASC",
                    AUTHOR_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_author(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// The author used for posting: the configured id when given, otherwise
    /// the first active author with a complete credential set.
    pub async fn resolve_poster(&self, configured_id: Option<&str>) -> Result<Option<AuthorAgent>, ServerError> {
        if let Some(id) = configured_id {
            return Ok(self
                .get(id)
                .await?
                .filter(|a| a.is_active && a.has_credentials()));
        }
        Ok(self
            .list()
            .await?
            .into_iter()
            .find(|a| a.is_active && a.has_credentials()))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM author_agents WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn row_to_author(row: &rusqlite::Row<'_>) -> AuthorAgent {
    AuthorAgent {
        id: row.get(0).unwrap_or_default(),
        name: row.get(1).unwrap_or_default(),
        x_username: row.get(2).unwrap_or(None),
        x_api_key: row.get(3).unwrap_or(None),
        x_api_secret: row.get(4).unwrap_or(None),
        x_access_token: row.get(5).unwrap_or(None),
        x_access_secret: row.get(6).unwrap_or(None),
        is_active: row.get::<_, i64>(7).unwrap_or(0) != 0,
        created_at: to_dt_or_now(row.get(8).ok()),
        updated_at: to_dt_or_now(row.get(9).ok()),
    }
}
