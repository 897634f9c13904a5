//! Author identities and their X credentials. Secrets go in, never out.

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use intrigue_core::models::author::{AuthorAgent, CreateAuthorInput};
use intrigue_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_authors).post(upsert_author))
        .route("/{id}", get(get_author).delete(delete_author))
}

fn view(author: &AuthorAgent) -> serde_json::Value {
    let mut value = serde_json::json!(author);
    if let Some(obj) = value.as_object_mut() {
        obj.insert("hasCredentials".to_string(), serde_json::json!(author.has_credentials()));
    }
    value
}

async fn list_authors(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ServerError> {
    let authors: Vec<serde_json::Value> = state.author_store.list().await?.iter().map(view).collect();
    Ok(Json(serde_json::json!({ "authors": authors })))
}

async fn upsert_author(
    State(state): State<AppState>,
    Json(body): Json<CreateAuthorInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    if body.name.trim().is_empty() {
        return Err(ServerError::BadRequest("name is required".to_string()));
    }
    let author = state.author_store.upsert(body).await?;
    Ok(Json(serde_json::json!({ "author": view(&author) })))
}

async fn get_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    match state.author_store.get(&id).await? {
        Some(a) => Ok(Json(serde_json::json!({ "author": view(&a) }))),
        None => Err(ServerError::NotFound(format!("Author {} not found", id))),
    }
}

async fn delete_author(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let deleted = state.author_store.delete(&id).await?;
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}
