use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use intrigue_core::models::agent::{CreateAgentInput, UpdateAgentInput};
use intrigue_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_agents).post(create_agent))
        .route("/{id}", get(get_agent).patch(update_agent).delete(delete_agent))
}

async fn list_agents(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    let agents = state.agent_store.list().await?;
    Ok(Json(serde_json::json!({ "agents": agents })))
}

async fn create_agent(
    State(state): State<AppState>,
    Json(body): Json<CreateAgentInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if body.name.trim().is_empty() {
        return Err(ServerError::BadRequest("name is required".to_string()));
    }
    let agent = state.agent_store.create(body).await?;
    Ok(Json(serde_json::json!({ "agent": agent })))
}

async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.agent_store.get(&id).await? {
        Some(a) => Ok(Json(serde_json::json!({ "agent": a }))),
        None => Err(ServerError::NotFound(format!("Agent {} not found", id))),
    }
}

async fn update_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(body): Json<UpdateAgentInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.agent_store.update(&id, body).await? {
        Some(a) => Ok(Json(serde_json::json!({ "agent": a }))),
        None => Err(ServerError::NotFound(format!("Agent {} not found", id))),
    }
}

async fn delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let deleted = state.agent_store.delete(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
