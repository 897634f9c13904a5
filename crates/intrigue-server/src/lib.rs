//! Intrigue Server - HTTP backend for the Bitcoin Intrigue content pipeline
//!
//! Exposes the cron triggers (schedule runner, X poster), the image
//! generation endpoint and the admin API (agents, workflows, schedules,
//! issues and their approval, subscribers, authors) over axum.
//!
//! All domain logic lives in `intrigue-core`; handlers only translate
//! between HTTP and the core services held in `AppState`.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use intrigue_core::config::AppConfig;
use intrigue_core::{AppState, AppStateInner, Database};

/// Configuration for the Intrigue backend server.
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3210,
            db_path: intrigue_core::config::DEFAULT_DB_PATH.to_string(),
        }
    }
}

/// Create a shared `AppState` from a database path, with every other
/// setting taken from the environment.
pub async fn create_app_state(db_path: &str) -> Result<AppState, String> {
    let mut config = AppConfig::from_env().map_err(|e| e.to_string())?;
    config.db_path = db_path.to_string();

    let db = Database::open(db_path).map_err(|e| format!("Failed to open database: {}", e))?;

    Ok(Arc::new(AppStateInner::new(db, config)))
}

/// The full application router: API routes, health check, CORS and
/// request tracing.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the backend server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // `try_init` so an embedding CLI that already installed a subscriber keeps it.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "intrigue_server=info,intrigue_core=info,tower_http=info".into()),
        )
        .try_init();

    tracing::info!("Starting Intrigue backend server on {}:{}", config.host, config.port);

    let state = create_app_state(&config.db_path).await?;

    start_server_with_state(config, state).await
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(config: ServerConfig, state: AppState) -> Result<SocketAddr, String> {
    let app = build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Intrigue backend server listening on {}", local_addr);

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "intrigue-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
