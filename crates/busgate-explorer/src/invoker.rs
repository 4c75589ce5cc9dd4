//! Method invocation.
//!
//! The method is looked up in the interface's introspection data before
//! anything is sent, and the JSON arguments are marshalled against its
//! declared input types. Every failure past this point is captured in the
//! returned [`CallOutcome`].

use busgate_bus::{BusConnection, MethodCall};
use serde_json::Value as Json;

use crate::catalog::InterfaceSpec;
use crate::error::{ExploreError, InvokeError};
use crate::resolver::ObjectRef;
use crate::types::CallOutcome;

/// Decode a request body into positional arguments.
///
/// An empty body means no arguments.
///
/// # Errors
///
/// Returns `ExploreError::MalformedBody` if the body is not a JSON array.
pub fn decode_arguments(body: &[u8]) -> Result<Vec<Json>, ExploreError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    match serde_json::from_slice::<Json>(body) {
        Ok(Json::Array(args)) => Ok(args),
        Ok(other) => Err(ExploreError::MalformedBody(format!(
            "expected a JSON array of arguments, got {other}"
        ))),
        Err(err) => Err(ExploreError::MalformedBody(err.to_string())),
    }
}

/// Invoke `method` on an object.
pub async fn invoke(
    conn: &dyn BusConnection,
    object: &ObjectRef,
    interface: &InterfaceSpec,
    method: &str,
    args: Vec<Json>,
) -> CallOutcome {
    match call(conn, object, interface, method, args).await {
        Ok(value) => CallOutcome::Returned(value),
        Err(err) => {
            tracing::debug!(
                service = %object.service,
                path = %object.path,
                interface = %interface.name,
                method = %method,
                error = %err,
                "Method invocation failed"
            );
            CallOutcome::Failed(err)
        }
    }
}

async fn call(
    conn: &dyn BusConnection,
    object: &ObjectRef,
    interface: &InterfaceSpec,
    method: &str,
    args: Vec<Json>,
) -> Result<Json, InvokeError> {
    let spec = interface
        .method(method)
        .ok_or_else(|| InvokeError::MethodNotFound {
            interface: interface.name.clone(),
            method: method.to_string(),
        })?;

    let signature = spec.input_signature();
    if signature.len() != args.len() {
        return Err(InvokeError::Arity {
            method: method.to_string(),
            expected: signature.len(),
            got: args.len(),
        });
    }

    let call = MethodCall::new(
        object.service.clone(),
        object.path.clone(),
        interface.name.clone(),
        method,
    )
    .with_args(signature, args);

    Ok(conn.call_method(&call).await?)
}
