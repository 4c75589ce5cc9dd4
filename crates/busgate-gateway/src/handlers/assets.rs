//! Static assets for the browser UI.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::Response;

use busgate_explorer::BusExplorer;

use crate::envelope;
use crate::error::ApiError;
use crate::state::GatewayState;

/// Asset served for `GET /`.
pub const DEFAULT_ASSET: &str = "index.html";

/// Serve the default asset.
///
/// # Errors
///
/// Returns `ApiError::NotFound` if `index.html` is missing.
pub async fn index<E>(State(state): State<Arc<GatewayState<E>>>) -> Result<Response, ApiError>
where
    E: BusExplorer + 'static,
{
    serve(&state, DEFAULT_ASSET).await
}

/// Serve a named asset from the assets directory.
///
/// # Errors
///
/// Returns `ApiError::NotFound` if the name is not a plain file name or no
/// such asset exists.
pub async fn asset<E>(
    State(state): State<Arc<GatewayState<E>>>,
    Path(name): Path<String>,
) -> Result<Response, ApiError>
where
    E: BusExplorer + 'static,
{
    serve(&state, &name).await
}

async fn serve<E>(state: &GatewayState<E>, name: &str) -> Result<Response, ApiError>
where
    E: BusExplorer,
{
    if !is_plain_name(name) {
        return Err(ApiError::NotFound(format!("/res/{name}")));
    }

    let path = state.config.assets_dir.join(name);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(envelope::asset(name, bytes)),
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "Asset not readable");
            Err(ApiError::NotFound(format!("/res/{name}")))
        }
    }
}

/// Only plain, non-hidden file names address assets.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('.') && !name.contains(['/', '\\', '\0'])
}
