//! SQLite database layer for the Intrigue backend.
//!
//! Uses rusqlite with WAL mode for concurrent read performance.
//! All database operations are executed via `tokio::task::spawn_blocking`
//! to avoid blocking the async runtime.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::ServerError;

/// Thread-safe handle to the SQLite database.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) a SQLite database at the given path.
    pub fn open(db_path: &str) -> Result<Self, ServerError> {
        let path = Path::new(db_path);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let conn = Connection::open(db_path)
            .map_err(|e| ServerError::Database(format!("Failed to open database: {}", e)))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| ServerError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;

        tracing::info!("SQLite database opened at: {}", db_path);
        Ok(db)
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory() -> Result<Self, ServerError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| ServerError::Database(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| ServerError::Database(format!("Failed to set pragmas: {}", e)))?;

        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };

        db.initialize_tables()?;
        Ok(db)
    }

    /// Execute a closure with access to the database connection.
    /// Automatically handles locking and error conversion.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ServerError::Database(format!("Lock poisoned: {}", e)))?;
        f(&conn).map_err(|e| ServerError::Database(e.to_string()))
    }

    /// Execute a closure with access to the database connection (async-friendly).
    pub async fn with_conn_async<F, T>(&self, f: F) -> Result<T, ServerError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| ServerError::Database(format!("Task join error: {}", e)))?
    }

    /// Create all tables if they don't exist.
    fn initialize_tables(&self) -> Result<(), ServerError> {
        self.with_conn(|conn| {
            conn.execute_batch(
                "
                CREATE TABLE IF NOT EXISTS agents (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL,
                    role            TEXT NOT NULL,
                    instructions    TEXT NOT NULL DEFAULT '',
                    model           TEXT NOT NULL DEFAULT '',
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS workflows (
                    id                  TEXT PRIMARY KEY,
                    name                TEXT NOT NULL,
                    description         TEXT NOT NULL DEFAULT '',
                    steps               TEXT NOT NULL DEFAULT '[]',
                    is_active           INTEGER NOT NULL DEFAULT 1,
                    requires_approval   INTEGER,
                    approval_message    TEXT,
                    created_at          INTEGER NOT NULL,
                    updated_at          INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS schedules (
                    id              TEXT PRIMARY KEY,
                    workflow_id     TEXT NOT NULL,
                    name            TEXT NOT NULL,
                    description     TEXT NOT NULL DEFAULT '',
                    cron_expression TEXT NOT NULL,
                    timezone        TEXT NOT NULL DEFAULT 'UTC',
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    last_run_at     INTEGER,
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_schedules_active ON schedules(is_active);

                CREATE TABLE IF NOT EXISTS executions (
                    id              TEXT PRIMARY KEY,
                    schedule_id     TEXT NOT NULL REFERENCES schedules(id) ON DELETE CASCADE,
                    issue_id        TEXT,
                    status          TEXT NOT NULL DEFAULT 'pending',
                    fire_at         INTEGER,
                    started_at      INTEGER NOT NULL,
                    completed_at    INTEGER,
                    error_message   TEXT,
                    logs            TEXT NOT NULL DEFAULT '[]'
                );
                CREATE INDEX IF NOT EXISTS idx_executions_schedule ON executions(schedule_id, fire_at);

                CREATE TABLE IF NOT EXISTS issues (
                    id                  TEXT PRIMARY KEY,
                    issue_number        INTEGER NOT NULL,
                    date                TEXT NOT NULL,
                    intro               TEXT NOT NULL DEFAULT '{}',
                    stories             TEXT NOT NULL DEFAULT '[]',
                    status              TEXT NOT NULL DEFAULT 'review',
                    approval_status     TEXT NOT NULL DEFAULT 'pending_review',
                    approved_at         INTEGER,
                    approved_by         TEXT,
                    rejection_reason    TEXT,
                    scheduled_for       INTEGER,
                    last_updated        INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_issues_number ON issues(issue_number);

                CREATE TABLE IF NOT EXISTS subscribers (
                    id              TEXT PRIMARY KEY,
                    email           TEXT NOT NULL UNIQUE,
                    name            TEXT,
                    status          TEXT NOT NULL DEFAULT 'active',
                    source          TEXT,
                    subscribed_at   INTEGER NOT NULL,
                    unsubscribed_at INTEGER
                );

                CREATE TABLE IF NOT EXISTS distributions (
                    id              TEXT PRIMARY KEY,
                    issue_id        TEXT NOT NULL REFERENCES issues(id),
                    channel         TEXT NOT NULL,
                    status          TEXT NOT NULL DEFAULT 'scheduled',
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_distributions_issue ON distributions(issue_id);

                CREATE TABLE IF NOT EXISTS x_posting_schedule (
                    id              TEXT PRIMARY KEY,
                    distribution_id TEXT NOT NULL REFERENCES distributions(id) ON DELETE CASCADE,
                    issue_id        TEXT NOT NULL,
                    story_index     INTEGER NOT NULL,
                    post_text       TEXT NOT NULL,
                    scheduled_time  INTEGER NOT NULL,
                    status          TEXT NOT NULL DEFAULT 'scheduled',
                    posted_at       INTEGER,
                    post_url        TEXT,
                    error_message   TEXT
                );
                CREATE INDEX IF NOT EXISTS idx_x_posting_due ON x_posting_schedule(status, scheduled_time);

                CREATE TABLE IF NOT EXISTS author_agents (
                    id              TEXT PRIMARY KEY,
                    name            TEXT NOT NULL,
                    x_username      TEXT,
                    x_api_key       TEXT,
                    x_api_secret    TEXT,
                    x_access_token  TEXT,
                    x_access_secret TEXT,
                    is_active       INTEGER NOT NULL DEFAULT 1,
                    created_at      INTEGER NOT NULL,
                    updated_at      INTEGER NOT NULL
                );
                ",
            )
        })
    }
}
