//! Route table for the job gateway HTTP API.

use crate::api::handlers;
use crate::api::middleware::cors_layer;
use crate::api::state::SharedState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Build the full axum router: `/api/generate`, `/api/jobs/:id`,
/// `/media/*`, `/health`, `/api/status`.
pub fn create_router(state: SharedState) -> Router {
    let media_dir = state.media_dir.clone();

    Router::new()
        .route("/api/generate", post(handlers::generate))
        .route("/api/jobs/:id", get(handlers::get_job))
        .route("/health", get(handlers::health))
        .route("/api/status", get(handlers::status))
        .nest_service("/media", ServeDir::new(media_dir))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}
