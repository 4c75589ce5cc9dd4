//! Health check endpoint.

use axum::response::Response;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::envelope;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service version.
    pub version: &'static str,
    /// Current server time.
    pub time: DateTime<Utc>,
}

/// Health check handler.
///
/// # Example
///
/// ```text
/// GET /health
///
/// Response: 200 OK
/// {
///   "status": "ok",
///   "time": "2026-01-01T00:00:00Z",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health() -> Response {
    envelope::ok(&HealthResponse {
        version: env!("CARGO_PKG_VERSION"),
        time: Utc::now(),
    })
}
