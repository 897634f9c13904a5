//! `intrigue issue` - Approval actions.

use intrigue_core::models::issue::ApprovalStatus;
use intrigue_core::AppState;

use super::print_json;

pub async fn list(state: &AppState, approval_status: Option<&str>) -> Result<(), String> {
    let issues = match approval_status {
        Some(s) => state.issue_store.list_by_approval(ApprovalStatus::from_str(s)).await,
        None => state.issue_store.list().await,
    }
    .map_err(|e| e.to_string())?;

    for issue in &issues {
        println!(
            "#{:<4} {}  {:<14} {:<10} {}",
            issue.issue_number,
            issue.id,
            issue.approval_status.as_str(),
            issue.status.as_str(),
            issue.intro.headline
        );
    }
    Ok(())
}

pub async fn approve(state: &AppState, id: &str, approver: &str) -> Result<(), String> {
    let issue = state.approvals.approve(id, approver).await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "issue": issue }));
    Ok(())
}

pub async fn reject(state: &AppState, id: &str, reason: &str) -> Result<(), String> {
    let issue = state.approvals.reject(id, reason).await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "issue": issue }));
    Ok(())
}

pub async fn publish(state: &AppState, id: &str) -> Result<(), String> {
    let issue = state.approvals.publish(id).await.map_err(|e| e.to_string())?;
    print_json(&serde_json::json!({ "issue": issue }));
    Ok(())
}
