//! Issues: listing, human edits, the approval transitions and the X
//! distributions hanging off each issue.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use intrigue_core::distribution::schedule_posts;
use intrigue_core::models::distribution::CreateDistributionInput;
use intrigue_core::models::issue::{ApprovalStatus, UpdateIssueInput};
use intrigue_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_issues))
        .route("/{id}", get(get_issue).patch(update_issue).delete(delete_issue))
        .route("/{id}/approve", post(approve_issue))
        .route("/{id}/reject", post(reject_issue))
        .route("/{id}/publish", post(publish_issue))
        .route("/{id}/distributions", get(list_distributions).post(create_distribution))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListQuery {
    approval_status: Option<String>,
    /// Only published issues, newest first.
    #[serde(default)]
    published: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApproveRequest {
    approved_by: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RejectRequest {
    #[serde(default)]
    reason: String,
}

async fn list_issues(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let issues = if q.published {
        state.issue_store.list_published().await?
    } else if let Some(status) = q.approval_status.as_deref() {
        let status = ApprovalStatus::from_str(status);
        state.issue_store.list_by_approval(status).await?
    } else {
        state.issue_store.list().await?
    };
    Ok(Json(serde_json::json!({ "issues": issues })))
}

async fn get_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.issue_store.get(&id).await? {
        Some(i) => Ok(Json(serde_json::json!({ "issue": i }))),
        None => Err(ServerError::NotFound(format!("Issue {} not found", id))),
    }
}

async fn update_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateIssueInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.issue_store.update(&id, body).await? {
        Some(i) => Ok(Json(serde_json::json!({ "issue": i }))),
        None => Err(ServerError::NotFound(format!("Issue {} not found", id))),
    }
}

/// DELETE /api/issues/{id} - Removes the issue's distributions first
async fn delete_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let distributions = state.distribution_store.delete_by_issue(&id).await?;
    let deleted = state.issue_store.delete(&id).await?;
    Ok(Json(serde_json::json!({
        "deleted": deleted,
        "distributionsDeleted": distributions,
    })))
}

async fn approve_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<serde_json::Value>, ServerError> {
    // The body is optional; an empty POST approves as "admin".
    let body: ApproveRequest = if body.is_empty() {
        ApproveRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| ServerError::BadRequest(format!("Invalid body: {}", e)))?
    };
    let approver = body
        .approved_by
        .filter(|a| !a.trim().is_empty())
        .unwrap_or_else(|| "admin".to_string());
    let issue = state.approvals.approve(&id, &approver).await?;
    Ok(Json(serde_json::json!({ "issue": issue })))
}

async fn reject_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<RejectRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let issue = state.approvals.reject(&id, &body.reason).await?;
    Ok(Json(serde_json::json!({ "issue": issue })))
}

async fn publish_issue(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let issue = state.approvals.publish(&id).await?;
    Ok(Json(serde_json::json!({ "issue": issue })))
}

/// GET /api/issues/{id}/distributions - Distributions with their posting entries
async fn list_distributions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let mut out = Vec::new();
    for d in state.distribution_store.list_by_issue(&id).await? {
        let posts = state.x_post_store.list_by_distribution(&d.id).await?;
        out.push(serde_json::json!({ "distribution": d, "posts": posts }));
    }
    Ok(Json(serde_json::json!({ "distributions": out })))
}

/// POST /api/issues/{id}/distributions - Queue posts for an issue by hand
async fn create_distribution(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<CreateDistributionInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if body.channel != "x" {
        return Err(ServerError::BadRequest(format!("Unsupported channel: {}", body.channel)));
    }
    let issue = state
        .issue_store
        .get(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Issue {} not found", id)))?;

    match schedule_posts(
        &state.distribution_store,
        &state.x_post_store,
        &issue,
        &body.posts,
        Utc::now(),
    )
    .await?
    {
        Some((distribution, posts)) => Ok(Json(serde_json::json!({
            "distribution": distribution,
            "posts": posts,
        }))),
        None => Err(ServerError::BadRequest("No valid posts to schedule".to_string())),
    }
}
