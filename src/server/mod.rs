//! HTTP server.
//!
//! Exposes resolution and processing over axum, with JSON error bodies and
//! chunked `audio/wav` responses.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;
pub mod types;

use tokio::net::TcpListener;

use crate::error::{DaemonError, ErrorCode, Result};

pub use error::ApiError;
pub use handlers::PITCH_SHIFT_HEADER;
pub use routes::build_router;
pub use state::AppState;

/// Binds the configured address and serves until Ctrl-C.
pub async fn run_server(state: AppState) -> Result<()> {
    let bind_addr = state.config.bind_address();
    let listener = TcpListener::bind(&bind_addr).await.map_err(|e| {
        DaemonError::with_source(
            ErrorCode::Internal,
            format!("failed to bind {}: {}", bind_addr, e),
            e,
        )
    })?;

    serve(listener, state).await
}

/// Serves on an already bound listener until Ctrl-C.
pub async fn serve(listener: TcpListener, state: AppState) -> Result<()> {
    let local_addr = listener
        .local_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    tracing::info!(
        address = %local_addr,
        max_transcodes = state.config.max_concurrent_transcodes,
        max_pending = state.config.max_pending_transcodes,
        cache_capacity = state.config.cache_capacity,
        shift_fallback = %state.config.shift_fallback,
        "lambro-daemon listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| DaemonError::with_source(ErrorCode::Internal, "server error", e))?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
