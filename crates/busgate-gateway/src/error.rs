//! API error types and responses.
//!
//! Every error renders as an error-envelope. Resolution errors keep the
//! status of their kind; everything else defaults to 403.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use busgate_explorer::ExploreError;

use crate::envelope;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A bus path could not be resolved.
    #[error(transparent)]
    Explore(#[from] ExploreError),

    /// The request does not address any route or asset.
    #[error("not found: {0}")]
    NotFound(String),

    /// Any other failure.
    #[error("{0}")]
    Failed(String),
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Explore(err) => {
                StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::FORBIDDEN)
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Failed(_) => StatusCode::FORBIDDEN,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status == StatusCode::FORBIDDEN {
            tracing::warn!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = %status, "Request not resolved");
        }
        envelope::error(status, &self.to_string())
    }
}
