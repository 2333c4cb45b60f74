//! Liveness probe.

use axum::http::StatusCode;

/// GET /health - Process is up and serving. Touches no dependencies.
pub async fn health_handler() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}
