//! Cron triggers. An external scheduler hits these on a fixed period; both
//! answer 200 with a summary even when individual items failed, and 500 only
//! when the batch itself could not run.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;

use intrigue_core::config::CronConfig;
use intrigue_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/run-schedule", get(run_schedule).post(run_schedule))
        .route("/post-to-x", get(post_to_x).post(post_to_x))
}

/// GET|POST /api/cron/run-schedule - run every schedule due now
async fn run_schedule(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state.config.cron, &headers) {
        return e.into_response();
    }
    tracing::info!("[Cron] run-schedule triggered");
    summarize(state.scheduler.run_due(Utc::now()).await)
}

/// GET|POST /api/cron/post-to-x - publish queued X posts that are due
async fn post_to_x(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(e) = authorize(&state.config.cron, &headers) {
        return e.into_response();
    }
    tracing::info!("[Cron] post-to-x triggered");
    summarize(state.poster.run(Utc::now()).await)
}

/// Outside production every caller is accepted. In production the request
/// must carry the configured secret, either as `Authorization: Bearer <secret>`
/// or in `x-cron-secret`; with no secret configured nothing gets through.
fn authorize(config: &CronConfig, headers: &HeaderMap) -> Result<(), ServerError> {
    if !config.production {
        return Ok(());
    }

    let presented = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .or_else(|| headers.get("x-cron-secret").and_then(|v| v.to_str().ok()))
        .map(str::trim);

    match (config.secret.as_deref(), presented) {
        (Some(expected), Some(given)) if expected == given => Ok(()),
        _ => {
            tracing::warn!("[Cron] Rejected request with missing or invalid secret");
            Err(ServerError::Unauthorized("Invalid cron secret".to_string()))
        }
    }
}

fn summarize<T: Serialize>(outcome: Result<T, ServerError>) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    match outcome.and_then(|summary| {
        serde_json::to_value(summary).map_err(|e| ServerError::Internal(e.to_string()))
    }) {
        Ok(mut body) => {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("timestamp".to_string(), serde_json::json!(timestamp));
            }
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(e) => {
            tracing::error!("[Cron] Batch failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({
                    "success": false,
                    "error": e.to_string(),
                    "timestamp": timestamp,
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn production(secret: Option<&str>) -> CronConfig {
        CronConfig {
            secret: secret.map(String::from),
            production: true,
            due_tolerance: chrono::Duration::minutes(5),
        }
    }

    #[test]
    fn development_mode_accepts_anything() {
        let config = CronConfig { production: false, ..production(Some("s")) };
        assert!(authorize(&config, &HeaderMap::new()).is_ok());
    }

    #[test]
    fn bearer_and_custom_header_are_both_accepted() {
        let config = production(Some("s3cret"));

        let mut bearer = HeaderMap::new();
        bearer.insert("authorization", HeaderValue::from_static("Bearer s3cret"));
        assert!(authorize(&config, &bearer).is_ok());

        let mut custom = HeaderMap::new();
        custom.insert("x-cron-secret", HeaderValue::from_static("s3cret"));
        assert!(authorize(&config, &custom).is_ok());
    }

    #[test]
    fn production_rejects_wrong_or_unconfigured_secret() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer nope"));
        assert!(matches!(
            authorize(&production(Some("s3cret")), &headers),
            Err(ServerError::Unauthorized(_))
        ));
        assert!(authorize(&production(None), &headers).is_err());
    }
}
