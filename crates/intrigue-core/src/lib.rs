//! Intrigue Core - content pipeline for the Bitcoin Intrigue newsletter.
//!
//! This crate holds the domain models, the SQLite persistence gateway, the
//! agent workflow engine, the approval gate, the cron-driven scheduler and
//! the X distribution poster. It has **no HTTP framework dependency** by
//! default, so the same logic backs:
//!
//! - the HTTP server (via `intrigue-server`)
//! - the `intrigue` CLI
//!
//! ```text
//! ScheduleRunner ──► WorkflowOrchestrator ──► AgentStepExecutor (×N)
//!       │                    │
//!       │              approval::apply_gate
//!       ▼
//!   IssueStore / ExecutionStore            DistributionPoster ──► X API
//! ```
//!
//! # Feature Flags
//!
//! - `axum` - Enables `IntoResponse` impl on `ServerError` for use in axum handlers.

pub mod approval;
pub mod config;
pub mod db;
pub mod distribution;
pub mod error;
pub mod import;
pub mod models;
pub mod scheduler;
pub mod state;
pub mod store;
pub mod workflow;

// Convenience re-exports
pub use config::AppConfig;
pub use db::Database;
pub use error::ServerError;
pub use state::{AppState, AppStateInner};
