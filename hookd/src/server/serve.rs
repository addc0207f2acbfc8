//! HTTP server setup

use std::future::Future;
use std::sync::Arc;

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::app::options::ServerOptions;
use crate::errors::HookError;
use crate::server::handlers::{
    fallback_handler, index_handler, logs_handler, preflight_handler, trigger_handler,
};
use crate::server::state::ServerState;

/// Build the hook router. Both the `/deploy-hook` and `/deploy` prefixes
/// serve the same handlers.
pub fn router(state: Arc<ServerState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Per-route fallbacks keep unmatched methods on the spec'd surface: POST
    // to a logs path is an unknown endpoint (404 + directory), not a bare 405.
    Router::new()
        .route(
            "/deploy-hook",
            get(index_handler)
                .post(trigger_handler)
                .options(preflight_handler)
                .fallback(fallback_handler),
        )
        .route(
            "/deploy-hook/logs",
            get(logs_handler)
                .options(preflight_handler)
                .fallback(fallback_handler),
        )
        .route(
            "/deploy",
            get(index_handler)
                .post(trigger_handler)
                .options(preflight_handler)
                .fallback(fallback_handler),
        )
        .route(
            "/deploy/logs",
            get(logs_handler)
                .options(preflight_handler)
                .fallback(fallback_handler),
        )
        .fallback(fallback_handler)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Start the HTTP server
pub async fn serve(
    options: &ServerOptions,
    state: Arc<ServerState>,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<JoinHandle<Result<(), HookError>>, HookError> {
    let app = router(state);

    let addr = format!("{}:{}", options.host, options.port);
    info!("Starting HTTP server on {}", addr);

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| HookError::ServerError(e.to_string()))?;

    let handle = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| HookError::ServerError(e.to_string()))
    });

    Ok(handle)
}
