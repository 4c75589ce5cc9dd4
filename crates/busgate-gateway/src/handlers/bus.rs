//! Bus resource endpoints.
//!
//! Everything under `/bus` is resolved by the explorer. `GET` walks the
//! resource tree; `POST` invokes a method with a JSON array of arguments.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{StatusCode, Uri};
use axum::response::Response;
use serde::Serialize;
use serde_json::Value;

use busgate_core::split_path;
use busgate_explorer::{BusExplorer, CallOutcome};

use crate::envelope;
use crate::error::ApiError;
use crate::state::GatewayState;

// =============================================================================
// Response Types
// =============================================================================

/// Response for a successful method invocation.
#[derive(Debug, Serialize)]
pub struct CallResponse {
    /// `null`, the single return value, or an array of return values.
    pub result: Value,
}

// =============================================================================
// Handlers
// =============================================================================

/// Resolve a bus resource.
///
/// # Example
///
/// ```text
/// GET /bus/system/org.freedesktop.DBus/org/freedesktop/DBus/org.freedesktop.DBus
///
/// Response: 200 OK
/// {
///   "interface": "org.freedesktop.DBus",
///   "methods": [...],
///   "properties": {...},
///   "signals": [...],
///   "status": "ok"
/// }
/// ```
///
/// # Errors
///
/// Returns the error for the first level of the path that does not resolve.
pub async fn get_resource<E>(
    State(state): State<Arc<GatewayState<E>>>,
    uri: Uri,
) -> Result<Response, ApiError>
where
    E: BusExplorer + 'static,
{
    let segments = bus_segments(uri.path());
    let resource = state.explorer.resolve(&segments).await?;
    Ok(envelope::ok(&resource))
}

/// Invoke a method.
///
/// The body is a JSON array of positional arguments; an empty body means no
/// arguments. A failed invocation is an error-envelope with status 200.
///
/// # Errors
///
/// Returns an error if the path does not address a method on an existing
/// interface, or if the body is not a JSON array.
pub async fn call_method<E>(
    State(state): State<Arc<GatewayState<E>>>,
    uri: Uri,
    body: Bytes,
) -> Result<Response, ApiError>
where
    E: BusExplorer + 'static,
{
    let segments = bus_segments(uri.path());
    match state.explorer.invoke(&segments, &body).await? {
        CallOutcome::Returned(result) => Ok(envelope::ok(&CallResponse { result })),
        CallOutcome::Failed(err) => {
            tracing::info!(path = %uri.path(), error = %err, "Method invocation failed");
            Ok(envelope::error(StatusCode::OK, &err.to_string()))
        }
    }
}

/// The path segments below `/bus`.
fn bus_segments(path: &str) -> Vec<&str> {
    split_path(path.strip_prefix("/bus").unwrap_or(path))
}
