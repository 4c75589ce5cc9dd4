//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, StatusCode, Uri};
use axum::middleware;
use axum::response::Response;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use busgate_explorer::BusExplorer;

use crate::envelope;
use crate::error::ApiError;
use crate::handlers::{assets, bus, health};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## UI
/// - `GET /` - Default asset (`index.html`)
/// - `GET /res/:name` - Named asset
///
/// ## Bus
/// - `GET /bus` - Bus keys
/// - `GET /bus/*path` - Services, objects, interfaces, catalogs, properties
/// - `POST /bus/*path` - Method invocation
///
/// ## Public
/// - `GET /health` - Health check
///
/// Any other path or method is a 404 error-envelope. Other client errors
/// raised by the middleware (such as 413 for oversized bodies) are rendered
/// as error-envelopes too.
pub fn create_router<E>(state: GatewayState<E>) -> Router
where
    E: BusExplorer + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;

    let state = Arc::new(state);

    Router::new()
        // UI
        .route("/", get(assets::index::<E>).fallback(not_found))
        .route("/res/:name", get(assets::asset::<E>).fallback(not_found))
        // Health
        .route("/health", get(health::health).fallback(not_found))
        // Bus tree
        .route(
            "/bus",
            get(bus::get_resource::<E>)
                .post(bus::call_method::<E>)
                .fallback(not_found),
        )
        .route(
            "/bus/*path",
            get(bus::get_resource::<E>)
                .post(bus::call_method::<E>)
                .fallback(not_found),
        )
        .fallback(not_found)
        // Middleware
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::map_response(envelope_client_errors))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: Uri) -> ApiError {
    ApiError::NotFound(uri.path().to_string())
}

/// Re-render client errors that are not already JSON as error-envelopes.
async fn envelope_client_errors(response: Response) -> Response {
    let status = response.status();
    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .is_some_and(|ct| ct.as_bytes().starts_with(b"application/json"));
    if !status.is_client_error() || is_json {
        return response;
    }
    let message = status.canonical_reason().unwrap_or("request rejected");
    envelope::error(status, &message.to_ascii_lowercase())
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
