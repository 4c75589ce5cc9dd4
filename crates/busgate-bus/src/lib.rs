//! Bus transport layer for busgate.
//!
//! This crate hides D-Bus behind two small traits so the explorer can be
//! exercised without a running bus daemon:
//!
//! - [`BusConnector`] opens a connection to one bus
//! - [`BusConnection`] lists names, introspects objects, reads properties
//!   and calls methods
//!
//! [`BusRegistry`] maps symbolic bus keys to connectors. The production
//! implementation in [`dbus`] uses zbus; [`codec`] converts between JSON and
//! D-Bus values.
//!
//! # Testing
//!
//! Enable the `test-utils` feature to get `MockBus`, an in-memory bus:
//!
//! ```ignore
//! use busgate_bus::{BusConnector, MockBus};
//!
//! let bus = MockBus::new().with_object("org.example", "/org/example", "");
//! let conn = bus.connect().await?;
//! let xml = conn.introspect("org.example", &"/org/example".parse()?).await?;
//! assert_eq!(bus.connection_count(), 1);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod codec;
pub mod connection;
pub mod dbus;
pub mod error;
pub mod registry;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use connection::{BusConnection, BusConnector, MethodCall};
pub use dbus::{BusTarget, ZbusConnector};
pub use error::{BusError, Result};
pub use registry::{BusRegistry, SESSION_BUS, SYSTEM_BUS};

#[cfg(any(test, feature = "test-utils"))]
pub use mock::MockBus;
