//! HTTP handlers.

use axum::http::StatusCode;

/// Body returned by the liveness route.
pub const HEALTH_MESSAGE: &str = "Notification service is healthy and OK.";

/// Liveness endpoint. Static: it does not look at the broker or the relay.
pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_MESSAGE)
}
