//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses the
//! intrigue-core services through `AppState`.

pub mod cron;
pub mod issue;
pub mod schedule;
pub mod server;
pub mod workflow;

use std::sync::Arc;

use intrigue_core::config::AppConfig;
use intrigue_core::{AppState, AppStateInner, Database};

/// Initialize a shared `AppState` from the given SQLite database path, with
/// the remaining settings read from the environment.
pub async fn init_state(db_path: &str) -> AppState {
    let mut config = AppConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });
    config.db_path = db_path.to_string();

    let db = Database::open(db_path).unwrap_or_else(|e| {
        eprintln!("Failed to open database '{}': {}", db_path, e);
        std::process::exit(1);
    });

    tracing::debug!(
        "[CLI] Text adapter '{}', X author {}",
        config.text_gen.adapter,
        config.x.author_agent_id.as_deref().unwrap_or("(first with credentials)")
    );
    Arc::new(AppStateInner::new(db, config))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

/// Load `.env.local` then `.env` from the working directory. Variables
/// already set in the environment win over both files.
pub fn load_dotenv() {
    for filename in &[".env.local", ".env"] {
        let Ok(content) = std::fs::read_to_string(filename) else {
            continue;
        };
        for (key, value) in parse_dotenv(&content) {
            if std::env::var(&key).is_err() {
                std::env::set_var(key, value);
            }
        }
    }
}

/// `KEY=VALUE` lines; blank lines and `#` comments are skipped and one
/// pair of surrounding quotes is stripped.
fn parse_dotenv(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim().trim_start_matches("export ").trim();
            if key.is_empty() {
                return None;
            }
            let value = value.trim();
            let unquoted = ['"', '\'']
                .iter()
                .find_map(|q| value.strip_prefix(*q).and_then(|v| v.strip_suffix(*q)))
                .unwrap_or(value);
            Some((key.to_string(), unquoted.to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::parse_dotenv;

    #[test]
    fn parses_pairs_comments_and_quotes() {
        let parsed = parse_dotenv(
            "# keys\nGEMINI_API_KEY=abc\n\nCRON_SECRET=\"s3 cret\"\nexport X_AUTHOR_AGENT_ID='desk'\nbroken line\n=orphan\n",
        );
        assert_eq!(
            parsed,
            vec![
                ("GEMINI_API_KEY".to_string(), "abc".to_string()),
                ("CRON_SECRET".to_string(), "s3 cret".to_string()),
                ("X_AUTHOR_AGENT_ID".to_string(), "desk".to_string()),
            ]
        );
    }

    #[test]
    fn value_may_contain_equals_signs() {
        let parsed = parse_dotenv("TEXT_GEN_BASE_URL=https://host/v1?a=b");
        assert_eq!(parsed[0].1, "https://host/v1?a=b");
    }
}
