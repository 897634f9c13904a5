use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::agent::default_true;

/// A public author identity and its X credentials.
///
/// Credential fields are accepted on input but never serialized back out.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorAgent {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_username: Option<String>,
    #[serde(default, skip_serializing)]
    pub x_api_key: Option<String>,
    #[serde(default, skip_serializing)]
    pub x_api_secret: Option<String>,
    #[serde(default, skip_serializing)]
    pub x_access_token: Option<String>,
    #[serde(default, skip_serializing)]
    pub x_access_secret: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// OAuth 1.0a user-context credentials for the X API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XCredentials {
    pub username: String,
    pub api_key: String,
    pub api_secret: String,
    pub access_token: String,
    pub access_secret: String,
}

impl AuthorAgent {
    /// All five values must be present and non-empty.
    pub fn x_credentials(&self) -> Option<XCredentials> {
        let field = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();
        Some(XCredentials {
            username: field(&self.x_username)?,
            api_key: field(&self.x_api_key)?,
            api_secret: field(&self.x_api_secret)?,
            access_token: field(&self.x_access_token)?,
            access_secret: field(&self.x_access_secret)?,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.x_credentials().is_some()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAuthorInput {
    pub id: Option<String>,
    pub name: String,
    pub x_username: Option<String>,
    pub x_api_key: Option<String>,
    pub x_api_secret: Option<String>,
    pub x_access_token: Option<String>,
    pub x_access_secret: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}
