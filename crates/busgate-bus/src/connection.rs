//! The bus transport seam.
//!
//! `BusConnector` opens connections and `BusConnection` performs the handful
//! of remote operations the explorer needs. The zbus implementation lives in
//! [`crate::dbus`]; tests use [`crate::mock::MockBus`].

use std::collections::BTreeMap;

use async_trait::async_trait;
use busgate_core::ObjectPath;
use serde_json::Value as Json;

use crate::error::Result;

/// Opens connections to one bus.
///
/// A connector is cheap to hold and is shared across requests. Every call to
/// [`BusConnector::connect`] yields a fresh connection owned by the caller.
#[async_trait]
pub trait BusConnector: Send + Sync {
    /// Open a new connection.
    ///
    /// # Errors
    ///
    /// Returns `BusError::Connection` if the bus cannot be reached.
    async fn connect(&self) -> Result<Box<dyn BusConnection>>;

    /// Human-readable description of the bus address, for logging.
    fn describe(&self) -> String;
}

/// A live connection to a bus.
///
/// The connection is released when the value is dropped.
#[async_trait]
pub trait BusConnection: Send + Sync {
    /// List every name currently owned on the bus.
    ///
    /// # Errors
    ///
    /// Returns an error if the bus daemon rejects the request.
    async fn list_names(&self) -> Result<Vec<String>>;

    /// Fetch the raw introspection XML of an object.
    ///
    /// # Errors
    ///
    /// Returns `BusError::NotFound` if the service or object does not exist.
    async fn introspect(&self, service: &str, path: &ObjectPath) -> Result<String>;

    /// Read a single property.
    ///
    /// # Errors
    ///
    /// Returns an error if the property cannot be read.
    async fn get_property(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
        property: &str,
    ) -> Result<Json>;

    /// Read every property of an interface.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote side rejects the request.
    async fn get_all_properties(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
    ) -> Result<BTreeMap<String, Json>>;

    /// Invoke a method and return its decoded reply.
    ///
    /// # Errors
    ///
    /// Returns `BusError::InvalidArgument` if an argument does not fit its
    /// declared type, or the remote error if the call fails.
    async fn call_method(&self, call: &MethodCall) -> Result<Json>;
}

/// A fully addressed method call.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    /// Destination service name.
    pub service: String,
    /// Object path on the service.
    pub path: ObjectPath,
    /// Interface that declares the method.
    pub interface: String,
    /// Method name.
    pub method: String,
    /// Declared type signature of each input argument, in order.
    pub signature: Vec<String>,
    /// Argument values, positionally matching `signature`.
    pub args: Vec<Json>,
}

impl MethodCall {
    /// Create a call with no arguments.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        path: ObjectPath,
        interface: impl Into<String>,
        method: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            path,
            interface: interface.into(),
            method: method.into(),
            signature: Vec::new(),
            args: Vec::new(),
        }
    }

    /// Attach typed arguments.
    #[must_use]
    pub fn with_args(mut self, signature: Vec<String>, args: Vec<Json>) -> Self {
        self.signature = signature;
        self.args = args;
        self
    }
}
