//! Router assembly and server loop.

use super::AppState;
use super::handlers;
use crate::{Error, Result};
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header;
use axum::routing::{get, post, put};
use std::net::SocketAddr;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

/// Room for multipart boundaries and headers on top of the upload cap.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// Builds the application router.
///
/// Request bodies are capped slightly above the configured upload limit so
/// that an oversized file still reaches upload validation when it is close
/// to the limit.
pub fn router(state: AppState) -> Router {
    let upload_cap = usize::try_from(state.imports().options().max_upload_kb)
        .unwrap_or(usize::MAX)
        .saturating_mul(1024);
    let body_limit = upload_cap.saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route("/health", get(handlers::health))
        .route("/register", post(handlers::register))
        .route("/users", get(handlers::list_users))
        .route("/users/import", post(handlers::import_users))
        .route("/users/export", get(handlers::export_users))
        .route("/users/exports", get(handlers::list_exports))
        .route("/users/{id}/edit", get(handlers::show_user))
        .route("/users/{id}/delete", get(handlers::show_user))
        .route(
            "/users/{id}",
            put(handlers::update_user).delete(handlers::delete_user),
        )
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            header::HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            header::HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            header::HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Binds `addr` and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the address cannot be bound or the server fails.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::operation("bind", format!("{addr}: {e}")))?;
    let local_addr = listener
        .local_addr()
        .map_err(|e| Error::operation("bind", e))?;
    tracing::info!(addr = %local_addr, "Starting userdesk HTTP server");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| Error::operation("serve", e))?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
