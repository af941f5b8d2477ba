//! HTTP server wiring the admission middleware in front of the origin.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};
use serde_json::json;
use tracing::{error, info};

use super::middleware::{rate_limit_middleware, Gate};
use crate::error::{FloodgateError, Result};

/// HTTP server that gates every request through the rate limiter.
pub struct HttpServer {
    /// Address to bind to
    addr: SocketAddr,
    /// Shared middleware state
    gate: Arc<Gate>,
}

impl HttpServer {
    pub fn new(addr: SocketAddr, gate: Arc<Gate>) -> Self {
        Self { addr, gate }
    }

    /// Start the HTTP server.
    ///
    /// This method will block until the server is shut down.
    pub async fn serve(self) -> Result<()> {
        info!(
            addr = %self.addr,
            "Starting HTTP server"
        );

        let listener = bind(self.addr).await?;
        axum::serve(listener, router(self.gate)).await.map_err(|e| {
            error!(error = %e, "HTTP server failed");
            FloodgateError::Io(e)
        })
    }

    /// Start the HTTP server with graceful shutdown.
    ///
    /// The server will shut down when the provided signal resolves.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        info!(
            addr = %self.addr,
            "Starting HTTP server with graceful shutdown"
        );

        let listener = bind(self.addr).await?;
        axum::serve(listener, router(self.gate))
            .with_graceful_shutdown(signal)
            .await
            .map_err(|e| {
                error!(error = %e, "HTTP server failed");
                FloodgateError::Io(e)
            })
    }
}

async fn bind(addr: SocketAddr) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind(addr).await.map_err(|e| {
        error!(addr = %addr, error = %e, "Failed to bind listen address");
        FloodgateError::Io(e)
    })
}

/// Build the application router.
///
/// The rate limit layer wraps everything except `/health`, which stays
/// reachable for probes even when a client has exhausted its budget.
pub fn router(gate: Arc<Gate>) -> Router {
    Router::new()
        .fallback(origin_placeholder)
        .layer(middleware::from_fn_with_state(gate, rate_limit_middleware))
        .route("/health", get(health))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Stand-in for the protected origin. Deployments embed the middleware
/// in their own router instead of serving this handler.
async fn origin_placeholder() -> &'static str {
    "ok"
}
