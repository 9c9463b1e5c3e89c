//! Local HTTP server.
//!
//! Serves the same dispatcher over axum for development, outside Lambda.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{HeaderMap, Method, Uri},
    Router,
};
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::api::{Request, Response};
use crate::error::ApiError;
use crate::function::Function;

/// Creates a router that forwards every request to `function`.
pub fn create_router(function: Arc<Function>) -> Router {
    Router::new()
        .fallback(proxy_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(function)
}

async fn proxy_handler(
    State(function): State<Arc<Function>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
) -> Response {
    let query = match Query::<BTreeMap<String, String>>::try_from_uri(&uri) {
        Ok(Query(query)) => query,
        Err(rejection) => {
            return ApiError::BadRequest(rejection.body_text()).into_response(function.cors());
        }
    };

    let request = Request {
        method,
        path: uri.path().to_string(),
        query,
        headers,
    };
    function.dispatch(request).await
}

/// Binds `port` on all interfaces and serves until Ctrl+C or SIGTERM.
pub async fn serve(function: Arc<Function>, port: u16) -> anyhow::Result<()> {
    let app = create_router(function);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
