//! Resource resolution for busgate.
//!
//! This crate turns a request path into a typed location in the bus
//! hierarchy and resolves it with live introspection.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway (HTTP)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ExplorerService                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Resolver   │ │  Catalog    │ │      Invoker        │    │
//! │  │ (segments)  │ │ (introspect)│ │  (method calls)     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                  ┌──────────────────────┐
//!                  │  BusRegistry (zbus)  │
//!                  └──────────────────────┘
//! ```
//!
//! # Path grammar
//!
//! Segments below `/bus` are consumed left to right:
//!
//! - bus key, then service name
//! - object path segments, greedily, until the first segment containing `.`
//! - interface name
//! - property name (GET) or method name (POST)
//!
//! A path segment that legitimately contains a `.` cannot be addressed; it is
//! always taken as the interface name.
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use busgate_bus::BusRegistry;
//! use busgate_core::split_path;
//! use busgate_explorer::{BusExplorer, ExplorerService};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let explorer = ExplorerService::with_defaults(Arc::new(BusRegistry::standard()));
//!
//! let path = "system/org.freedesktop.DBus/org/freedesktop/DBus/org.freedesktop.DBus";
//! let catalog = explorer.resolve(&split_path(path)).await?;
//! println!("{}", serde_json::to_string_pretty(&catalog)?);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod catalog;
pub mod error;
pub mod invoker;
pub mod resolver;
pub mod service;
pub mod types;

pub use catalog::{Introspection, InterfaceSpec, MemberSpec};
pub use error::{ExploreError, InvokeError, Result};
pub use resolver::{parse_location, Location, ObjectRef};
pub use service::{BusExplorer, ExplorerService};
pub use types::{
    ArgDescriptor, CallOutcome, ExplorerConfig, InterfaceCatalog, MethodDescriptor, Resource,
    SignalDescriptor,
};
