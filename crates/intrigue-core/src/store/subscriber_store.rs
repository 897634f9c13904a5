use chrono::Utc;
use rusqlite::OptionalExtension;
use uuid::Uuid;

use crate::db::Database;
use crate::error::ServerError;
use crate::models::subscriber::{CreateSubscriberInput, Subscriber, SubscriberStatus};
use crate::store::{to_dt, to_dt_or_now};

const SUBSCRIBER_COLUMNS: &str = "id, email, name, status, source, subscribed_at, unsubscribed_at";

#[derive(Clone)]
pub struct SubscriberStore {
    db: Database,
}

impl SubscriberStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Subscribe an address. Re-subscribing an unsubscribed address
    /// reactivates the existing row; an active duplicate is a conflict.
    pub async fn create(&self, input: CreateSubscriberInput) -> Result<Subscriber, ServerError> {
        let email = normalize_email(&input.email)?;
        if let Some(mut existing) = self.get_by_email(&email).await? {
            if existing.status == SubscriberStatus::Active {
                return Err(ServerError::Conflict(format!("{} is already subscribed", email)));
            }
            existing.status = SubscriberStatus::Active;
            existing.unsubscribed_at = None;
            existing.subscribed_at = Utc::now();
            if input.name.is_some() {
                existing.name = input.name;
            }
            self.save(&existing).await?;
            return Ok(existing);
        }

        let s = Subscriber {
            id: Uuid::new_v4().to_string(),
            email,
            name: input.name,
            status: SubscriberStatus::Active,
            source: input.source,
            subscribed_at: Utc::now(),
            unsubscribed_at: None,
        };
        self.save(&s).await?;
        Ok(s)
    }

    async fn save(&self, subscriber: &Subscriber) -> Result<(), ServerError> {
        let s = subscriber.clone();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT INTO subscribers (id, email, name, status, source, subscribed_at, unsubscribed_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                     ON CONFLICT(id) DO UPDATE SET
                       name = excluded.name,
                       status = excluded.status,
                       subscribed_at = excluded.subscribed_at,
                       unsubscribed_at = excluded.unsubscribed_at",
                    rusqlite::params![
                        s.id,
                        s.email,
                        s.name,
                        s.status.as_str(),
                        s.source,
                        s.subscribed_at.timestamp_millis(),
                        s.unsubscribed_at.map(|t| t.timestamp_millis()),
                    ],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Subscriber>, ServerError> {
        let email = email.trim().to_lowercase();
        self.db
            .with_conn_async(move |conn| {
                conn.query_row(
                    &format!("SELECT {} FROM subscribers WHERE email = ?1", SUBSCRIBER_COLUMNS),
                    rusqlite::params![email],
                    |row| Ok(row_to_subscriber(row)),
                )
                .optional()
            })
            .await
    }

    pub async fn list(&self) -> Result<Vec<Subscriber>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM subscribers ORDER BY subscribed_at DESC",
                    SUBSCRIBER_COLUMNS
                ))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_subscriber(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<Option<Subscriber>, ServerError> {
        let Some(mut s) = self.get_by_email(email).await? else { return Ok(None) };
        if s.status != SubscriberStatus::Unsubscribed {
            s.status = SubscriberStatus::Unsubscribed;
            s.unsubscribed_at = Some(Utc::now());
            self.save(&s).await?;
        }
        Ok(Some(s))
    }

    pub async fn delete(&self, id: &str) -> Result<bool, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| {
                let n = conn.execute("DELETE FROM subscribers WHERE id = ?1", rusqlite::params![id])?;
                Ok(n > 0)
            })
            .await
    }
}

fn normalize_email(raw: &str) -> Result<String, ServerError> {
    let email = raw.trim().to_lowercase();
    let re = regex::Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$")
        .map_err(|e| ServerError::Internal(e.to_string()))?;
    if !re.is_match(&email) {
        return Err(ServerError::BadRequest(format!("Invalid email address: '{}'", raw.trim())));
    }
    Ok(email)
}

fn row_to_subscriber(row: &rusqlite::Row<'_>) -> Subscriber {
    Subscriber {
        id: row.get(0).unwrap_or_default(),
        email: row.get(1).unwrap_or_default(),
        name: row.get(2).unwrap_or(None),
        status: SubscriberStatus::from_str(&row.get::<_, String>(3).unwrap_or_default()),
        source: row.get(4).unwrap_or(None),
        subscribed_at: to_dt_or_now(row.get(5).ok()),
        unsubscribed_at: to_dt(row.get(6).unwrap_or(None)),
    }
}
