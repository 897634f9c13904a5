//! Environment-driven configuration.
//!
//! Every external collaborator (text generation, image generation, X API)
//! and every cron-related knob is read once at startup and passed down
//! explicitly; nothing below this module reads the environment.

use std::time::Duration;

use crate::error::ServerError;

pub const DEFAULT_DB_PATH: &str = "intrigue.db";
pub const DEFAULT_TEXT_ADAPTER: &str = "gemini";
pub const DEFAULT_TEXT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_IMAGE_BASE_URL: &str = "https://api.bfl.ai";
pub const DEFAULT_IMAGE_MODEL: &str = "flux-pro-1.1";
pub const DEFAULT_X_API_BASE_URL: &str = "https://api.twitter.com";
pub const DEFAULT_MAX_POLL_ATTEMPTS: u32 = 60;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
pub const DEFAULT_DUE_TOLERANCE_MINUTES: i64 = 5;

/// Text-generation backend settings.
#[derive(Debug, Clone)]
pub struct TextGenConfig {
    /// `gemini` or `openai`
    pub adapter: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Used when an agent has no model configured.
    pub default_model: String,
}

/// Image-generation backend settings.
#[derive(Debug, Clone)]
pub struct ImageGenConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_poll_attempts: u32,
    pub poll_interval: Duration,
}

/// X (Twitter) API settings.
#[derive(Debug, Clone)]
pub struct XConfig {
    pub base_url: String,
    /// Author whose credentials are used for posting. When unset the first
    /// active author with complete credentials is used.
    pub author_agent_id: Option<String>,
}

/// Cron endpoint settings.
#[derive(Debug, Clone)]
pub struct CronConfig {
    pub secret: Option<String>,
    /// When true, cron endpoints reject requests without the shared secret.
    pub production: bool,
    pub due_tolerance: chrono::Duration,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: String,
    pub text_gen: TextGenConfig,
    pub image_gen: ImageGenConfig,
    pub x: XConfig,
    pub cron: CronConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            text_gen: TextGenConfig {
                adapter: DEFAULT_TEXT_ADAPTER.to_string(),
                base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
                api_key: None,
                default_model: DEFAULT_TEXT_MODEL.to_string(),
            },
            image_gen: ImageGenConfig {
                base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
                api_key: None,
                model: DEFAULT_IMAGE_MODEL.to_string(),
                max_poll_attempts: DEFAULT_MAX_POLL_ATTEMPTS,
                poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            },
            x: XConfig {
                base_url: DEFAULT_X_API_BASE_URL.to_string(),
                author_agent_id: None,
            },
            cron: CronConfig {
                secret: None,
                production: false,
                due_tolerance: chrono::Duration::minutes(DEFAULT_DUE_TOLERANCE_MINUTES),
            },
        }
    }
}

impl AppConfig {
    /// Build the configuration from process environment variables.
    pub fn from_env() -> Result<Self, ServerError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ServerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Self::default();

        let adapter = get("TEXT_GEN_ADAPTER").unwrap_or(defaults.text_gen.adapter);
        let text_base_url = get("TEXT_GEN_BASE_URL").unwrap_or_else(|| match adapter.as_str() {
            "openai" => DEFAULT_OPENAI_BASE_URL.to_string(),
            _ => DEFAULT_GEMINI_BASE_URL.to_string(),
        });

        let max_poll_attempts = parse_or(
            get("IMAGE_GEN_MAX_POLL_ATTEMPTS"),
            "IMAGE_GEN_MAX_POLL_ATTEMPTS",
            DEFAULT_MAX_POLL_ATTEMPTS,
        )?;
        let poll_interval_ms = parse_or(
            get("IMAGE_GEN_POLL_INTERVAL_MS"),
            "IMAGE_GEN_POLL_INTERVAL_MS",
            DEFAULT_POLL_INTERVAL_MS,
        )?;
        let tolerance_minutes = parse_or(
            get("SCHEDULE_DUE_TOLERANCE_MINUTES"),
            "SCHEDULE_DUE_TOLERANCE_MINUTES",
            DEFAULT_DUE_TOLERANCE_MINUTES,
        )?;
        if tolerance_minutes < 0 {
            return Err(ServerError::Config(
                "SCHEDULE_DUE_TOLERANCE_MINUTES must not be negative".to_string(),
            ));
        }

        Ok(Self {
            db_path: get("INTRIGUE_DB_PATH").unwrap_or(defaults.db_path),
            text_gen: TextGenConfig {
                adapter,
                base_url: text_base_url,
                api_key: get("TEXT_GEN_API_KEY").or_else(|| get("GEMINI_API_KEY")),
                default_model: get("TEXT_GEN_DEFAULT_MODEL").unwrap_or(defaults.text_gen.default_model),
            },
            image_gen: ImageGenConfig {
                base_url: get("IMAGE_GEN_BASE_URL").unwrap_or(defaults.image_gen.base_url),
                api_key: get("IMAGE_GEN_API_KEY"),
                model: get("IMAGE_GEN_MODEL").unwrap_or(defaults.image_gen.model),
                max_poll_attempts,
                poll_interval: Duration::from_millis(poll_interval_ms),
            },
            x: XConfig {
                base_url: get("X_API_BASE_URL").unwrap_or(defaults.x.base_url),
                author_agent_id: get("X_AUTHOR_AGENT_ID"),
            },
            cron: CronConfig {
                secret: get("CRON_SECRET"),
                production: get("INTRIGUE_ENV").as_deref() == Some("production"),
                due_tolerance: chrono::Duration::minutes(tolerance_minutes),
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(value: Option<String>, key: &str, default: T) -> Result<T, ServerError> {
    match value {
        Some(v) => v
            .parse()
            .map_err(|_| ServerError::Config(format!("{} has an invalid value: '{}'", key, v))),
        None => Ok(default),
    }
}
