//! HTTP server setup with Axum

use std::path::Path;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::rest::tasks;
use super::state::AppState;

/// Create the Axum router with all endpoints
///
/// Anything not matched by an API route is served from `assets`.
pub fn create_router(state: Arc<AppState>, assets: &Path) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/tasks.json", get(tasks::get_tasks))
        .route("/health", get(health_check))
        .fallback_service(ServeDir::new(assets))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}
