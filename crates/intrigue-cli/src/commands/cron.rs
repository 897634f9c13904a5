//! `intrigue cron` - Fire a cron trigger once from the command line.

use chrono::Utc;

use intrigue_core::AppState;

use super::print_json;

pub async fn run_schedule(state: &AppState) -> Result<(), String> {
    let summary = state.scheduler.run_due(Utc::now()).await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!(summary));
    if summary.failed > 0 {
        return Err(format!("{} schedule(s) failed", summary.failed));
    }
    Ok(())
}

pub async fn post_to_x(state: &AppState) -> Result<(), String> {
    let summary = state.poster.run(Utc::now()).await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!(summary));
    if summary.failed > 0 {
        return Err(format!("{} post(s) failed", summary.failed));
    }
    Ok(())
}
