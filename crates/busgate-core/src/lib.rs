//! Core types for busgate.
//!
//! This crate provides the naming primitives shared by the rest of the workspace:
//!
//! - **Object paths**: a validated, '/'-separated D-Bus object path
//! - **Segment classification**: the single structural rule that separates
//!   object-path segments from interface names in a request path
//!
//! # Example
//!
//! ```
//! use busgate_core::{is_interface_segment, split_path, ObjectPath};
//!
//! let segments = split_path("/org/freedesktop/DBus/org.freedesktop.DBus");
//! assert!(is_interface_segment(segments[3]));
//!
//! let path = ObjectPath::from_segments(&segments[..3]).unwrap();
//! assert_eq!(path.as_str(), "/org/freedesktop/DBus");
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod names;

pub use error::{NameError, Result};
pub use names::{is_interface_segment, split_path, ObjectPath};
