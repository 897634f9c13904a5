use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

use intrigue_core::models::subscriber::CreateSubscriberInput;
use intrigue_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_subscribers).post(subscribe))
        .route("/unsubscribe", post(unsubscribe))
        .route("/{id}", delete(delete_subscriber))
}

#[derive(Debug, Deserialize)]
struct UnsubscribeRequest {
    email: String,
}

async fn list_subscribers(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    let subscribers = state.subscriber_store.list().await?;
    Ok(Json(serde_json::json!({ "subscribers": subscribers })))
}

async fn subscribe(
    State(state): State<AppState>,
    Json(body): Json<CreateSubscriberInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let subscriber = state.subscriber_store.create(body).await?;
    Ok(Json(serde_json::json!({ "subscriber": subscriber })))
}

async fn unsubscribe(
    State(state): State<AppState>,
    Json(body): Json<UnsubscribeRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.subscriber_store.unsubscribe(&body.email).await? {
        Some(s) => Ok(Json(serde_json::json!({ "subscriber": s }))),
        None => Err(ServerError::NotFound(format!("{} is not subscribed", body.email))),
    }
}

async fn delete_subscriber(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let deleted = state.subscriber_store.delete(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
