//! Response rendering.
//!
//! Every JSON response is an envelope with a `status` field of `"ok"` or
//! `"error"`. Keys are sorted at every level and the body is pretty-printed.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Map, Value};

/// Content type of every JSON response.
pub const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Render an ok-envelope from a serializable set of fields.
///
/// `fields` must serialize to a JSON object; anything else is rendered
/// under a `result` key.
pub fn ok<T: Serialize>(fields: &T) -> Response {
    let mut envelope = match serde_json::to_value(fields) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            let mut map = Map::new();
            map.insert("result".to_string(), other);
            map
        }
        Err(err) => {
            tracing::error!(error = %err, "Failed to serialize response");
            return error(StatusCode::INTERNAL_SERVER_ERROR, "failed to serialize response");
        }
    };
    envelope.insert("status".to_string(), Value::from("ok"));
    render(StatusCode::OK, Value::Object(envelope))
}

/// Render an error-envelope.
pub fn error(status: StatusCode, message: &str) -> Response {
    let mut envelope = Map::new();
    envelope.insert("status".to_string(), Value::from("error"));
    envelope.insert("error".to_string(), Value::from(message));
    render(status, Value::Object(envelope))
}

/// Serialize `body` with sorted keys.
fn render(status: StatusCode, body: Value) -> Response {
    let text = match serde_json::to_string_pretty(&sort_keys(body)) {
        Ok(text) => text,
        Err(err) => {
            tracing::error!(error = %err, "Failed to encode response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    (status, [(header::CONTENT_TYPE, JSON_CONTENT_TYPE)], text).into_response()
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sort_keys(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// Content type for an asset file name, by extension.
#[must_use]
pub fn content_type_for(name: &str) -> &'static str {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("js") => "application/javascript",
        Some("css") => "text/css",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

/// Render raw asset bytes.
pub fn asset(name: &str, bytes: Vec<u8>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, content_type_for(name))],
        bytes,
    )
        .into_response()
}
