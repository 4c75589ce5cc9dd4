//! Error types for resource resolution and method invocation.
//!
//! Resolution failures carry an HTTP status. Invocation failures are a
//! separate type because they are reported inside a successful response.

use busgate_bus::BusError;
use thiserror::Error;

/// A result type using `ExploreError`.
pub type Result<T> = std::result::Result<T, ExploreError>;

/// Errors that can occur while resolving a request path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExploreError {
    /// No bus is registered under the requested key.
    #[error("bus not found: {0}")]
    BusNotFound(String),

    /// The service does not own an object at the requested path.
    #[error("object not found: {path} on {service}")]
    ObjectNotFound {
        /// The service that was asked.
        service: String,
        /// The object path that was requested.
        path: String,
    },

    /// The object does not implement the requested interface.
    #[error("interface not found: {0}")]
    InterfaceNotFound(String),

    /// The interface has no readable property by that name.
    #[error("property not found: {property} on {interface}")]
    PropertyNotFound {
        /// The interface that was asked.
        interface: String,
        /// The property that was requested.
        property: String,
    },

    /// The path does not address any resource.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request body could not be decoded.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// Any other failure talking to the bus.
    #[error("{0}")]
    Failed(String),
}

impl ExploreError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::BusNotFound(_)
            | Self::ObjectNotFound { .. }
            | Self::InterfaceNotFound(_)
            | Self::PropertyNotFound { .. }
            | Self::NotFound(_) => 404,
            Self::MalformedBody(_) | Self::Failed(_) => 403,
        }
    }

    /// Returns true for any not-found kind.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        self.http_status_code() == 404
    }
}

impl From<BusError> for ExploreError {
    fn from(err: BusError) -> Self {
        Self::Failed(err.to_string())
    }
}

/// Errors captured while invoking a method.
///
/// These never change the HTTP status of the response.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvokeError {
    /// The interface does not declare the method.
    #[error("method not found: {method} on {interface}")]
    MethodNotFound {
        /// The interface that was searched.
        interface: String,
        /// The requested method.
        method: String,
    },

    /// The number of arguments does not match the declaration.
    #[error("{method} expects {expected} arguments, got {got}")]
    Arity {
        /// The method being called.
        method: String,
        /// Declared input argument count.
        expected: usize,
        /// Supplied argument count.
        got: usize,
    },

    /// An argument does not fit its declared type.
    #[error("cannot marshal arguments: {0}")]
    Marshal(String),

    /// The call reached the bus and failed there.
    #[error("call failed: {0}")]
    Call(BusError),
}

impl From<BusError> for InvokeError {
    fn from(err: BusError) -> Self {
        match err {
            BusError::InvalidArgument(msg) => Self::Marshal(msg),
            other => Self::Call(other),
        }
    }
}
