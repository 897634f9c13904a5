use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::Deserialize;

use intrigue_core::workflow::{build_image_prompt, ImageError};
use intrigue_core::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/", post(generate_image).fallback(method_not_allowed))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateImageRequest {
    #[serde(default)]
    headline: String,
    #[serde(default)]
    category: String,
    /// Overrides the prompt derived from category and headline.
    prompt: Option<String>,
}

/// POST /api/generate-image - illustrate one story
async fn generate_image(State(state): State<AppState>, Json(body): Json<GenerateImageRequest>) -> Response {
    let prompt = match body.prompt.as_deref().map(str::trim).filter(|p| !p.is_empty()) {
        Some(p) => p.to_string(),
        None if body.headline.trim().is_empty() => {
            return error(StatusCode::BAD_REQUEST, "headline or prompt is required".to_string());
        }
        None => build_image_prompt(&body.category, &body.headline),
    };

    match state.image_generator.generate(&prompt).await {
        Ok(url) => Json(serde_json::json!({
            "success": true,
            "imageUrl": url,
            "category": body.category,
            "headline": body.headline,
        }))
        .into_response(),
        Err(e) => {
            tracing::warn!("[ImageGen] Request for '{}' failed: {}", body.headline, e);
            let status = match e {
                ImageError::MissingConfig(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ImageError::Generation(_) => StatusCode::BAD_REQUEST,
                ImageError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            };
            error(status, e.to_string())
        }
    }
}

async fn method_not_allowed() -> Response {
    error(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
}

fn error(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "success": false, "error": message }))).into_response()
}
