//! Health check endpoint.
//!
//! Reads the flags maintained by [`HealthMonitor`]; it never pings the
//! backing services itself.

use crate::monitor::HealthMonitor;
use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `"up"` or `"down"`
    pub status: &'static str,
}

/// Report whether the store and cache passed their last checks.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Status Codes
///
/// - 200 OK with `{"status":"up"}` when every component is healthy
/// - 500 Internal Server Error with `{"status":"down"}` otherwise
#[allow(clippy::unused_async)]
pub async fn health_check(State(monitor): State<HealthMonitor>) -> (StatusCode, Json<HealthResponse>) {
    if monitor.is_healthy() {
        (StatusCode::OK, Json(HealthResponse { status: "up" }))
    } else {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(HealthResponse { status: "down" }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_components_is_up() {
        let (status, Json(body)) = health_check(State(HealthMonitor::new())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.status, "up");
    }
}
