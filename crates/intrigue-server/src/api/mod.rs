pub mod agents;
pub mod authors;
pub mod cron;
pub mod images;
pub mod issues;
pub mod schedules;
pub mod subscribers;
pub mod workflows;

use axum::Router;

use intrigue_core::AppState;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/cron", cron::router())
        .nest("/api/generate-image", images::router())
        .nest("/api/agents", agents::router())
        .nest("/api/workflows", workflows::router())
        .nest("/api/schedules", schedules::router())
        .nest("/api/issues", issues::router())
        .nest("/api/subscribers", subscribers::router())
        .nest("/api/authors", authors::router())
}
