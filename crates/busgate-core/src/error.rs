//! Error types for name parsing.

use thiserror::Error;

/// A result type using `NameError`.
pub type Result<T> = std::result::Result<T, NameError>;

/// Errors that can occur when building or parsing object paths.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameError {
    /// The path does not start with '/'.
    #[error("object path must be absolute: {0:?}")]
    NotAbsolute(String),

    /// The path contains an empty segment (e.g. `//` or a trailing '/').
    #[error("object path contains an empty segment: {0:?}")]
    EmptySegment(String),

    /// A segment contains a '.', which marks an interface name instead.
    #[error("object path segment looks like an interface name: {0:?}")]
    DottedSegment(String),

    /// A single segment contains a '/'.
    #[error("object path segment contains '/': {0:?}")]
    NestedSegment(String),
}
