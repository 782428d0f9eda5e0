//! Health check HTTP server.
//!
//! The worker has no request/response API; this server exists only so
//! orchestrators can probe liveness.

pub mod handlers;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

pub use handlers::{health, HEALTH_MESSAGE};

/// Path of the liveness route.
pub const HEALTH_ROUTE: &str = "/notification-health";

/// Build the router.
pub fn router() -> Router {
    Router::new()
        .route(HEALTH_ROUTE, get(health))
        .layer(TraceLayer::new_for_http())
}

/// Bind `port` on all interfaces and serve until the task is dropped.
pub async fn serve(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!(address = %addr, route = HEALTH_ROUTE, "health_server_listening");

    axum::serve(listener, router())
        .await
        .context("Health server error")
}
