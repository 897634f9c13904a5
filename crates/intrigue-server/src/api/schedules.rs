use axum::{
    extract::{Path, Query, State},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;

use intrigue_core::models::schedule::{CreateScheduleInput, UpdateScheduleInput};
use intrigue_core::scheduler::{upcoming, ScheduleOutcome};
use intrigue_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_schedules).post(create_schedule))
        .route("/{id}", get(get_schedule).patch(update_schedule).delete(delete_schedule))
        .route("/{id}/executions", get(list_executions))
        .route("/{id}/run", post(run_schedule_now))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GetQuery {
    /// How many upcoming fire times to include.
    upcoming: Option<usize>,
}

async fn list_schedules(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    let schedules = state.schedule_store.list().await?;
    Ok(Json(serde_json::json!({ "schedules": schedules })))
}

async fn create_schedule(
    State(state): State<AppState>,
    Json(body): Json<CreateScheduleInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let schedule = state.schedule_store.create(body).await?;
    Ok(Json(serde_json::json!({ "schedule": schedule })))
}

async fn get_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<GetQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let s = state
        .schedule_store
        .get(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Schedule {} not found", id)))?;
    let next = upcoming(&s.cron_expression, &s.timezone, Utc::now(), q.upcoming.unwrap_or(5).min(50))?;
    Ok(Json(serde_json::json!({ "schedule": s, "upcoming": next })))
}

async fn update_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateScheduleInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.schedule_store.update(&id, body).await? {
        Some(s) => Ok(Json(serde_json::json!({ "schedule": s }))),
        None => Err(ServerError::NotFound(format!("Schedule {} not found", id))),
    }
}

async fn delete_schedule(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let deleted = state.schedule_store.delete(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

/// GET /api/schedules/{id}/executions - Run history, newest first
async fn list_executions(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let executions = state.execution_store.list_by_schedule(&id).await?;
    Ok(Json(serde_json::json!({ "executions": executions })))
}

/// POST /api/schedules/{id}/run - Trigger a schedule to run immediately
async fn run_schedule_now(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let schedule = state
        .schedule_store
        .get(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("Schedule {} not found", id)))?;

    let body = match state.scheduler.run_schedule(&schedule, None).await? {
        ScheduleOutcome::Completed(execution) => serde_json::json!({
            "triggered": true,
            "success": true,
            "execution": execution,
        }),
        ScheduleOutcome::Failed(execution) => serde_json::json!({
            "triggered": true,
            "success": false,
            "execution": execution,
        }),
        ScheduleOutcome::Skipped(reason) => serde_json::json!({
            "triggered": false,
            "success": false,
            "reason": reason,
        }),
    };
    Ok(Json(body))
}
