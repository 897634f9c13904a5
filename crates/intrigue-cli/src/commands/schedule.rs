//! `intrigue schedule` - Schedule inspection.

use chrono::Utc;

use intrigue_core::scheduler::{upcoming, validate_cron, validate_timezone};
use intrigue_core::AppState;

use super::print_json;

pub async fn list(state: &AppState) -> Result<(), String> {
    let schedules = state.schedule_store.list().await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "schedules": schedules }));
    Ok(())
}

pub fn validate(expression: &str, timezone: &str, count: usize) -> Result<(), String> {
    let normalized = validate_cron(expression).map_err(|e| e.to_string())?;
    validate_timezone(timezone).map_err(|e| e.to_string())?;
    let next = upcoming(&normalized, timezone, Utc::now(), count).map_err(|e| e.to_string())?;

    println!("✅ '{}' is valid ({})", normalized, timezone);
    for at in next {
        println!("   {}", at.to_rfc3339());
    }
    Ok(())
}
