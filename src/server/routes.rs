//! Route table.

use axum::routing::{get, post};
use axum::Router;

use super::handlers;
use super::state::AppState;

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/keepalive", get(handlers::keepalive))
        .route("/keep-alive", get(handlers::keepalive))
        .route("/resolve", post(handlers::resolve))
        .route("/get_audio_info", post(handlers::resolve))
        .route("/process", post(handlers::process))
        .route("/process_audio", post(handlers::process))
        .with_state(state)
}
