//! An in-memory bus for tests.
//!
//! `MockBus` is both a connector and the state behind every connection it
//! opens. Clones share state, so a test can keep a handle for inspection
//! after moving another into a registry.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use busgate_core::ObjectPath;
use parking_lot::Mutex;
use serde_json::Value as Json;

use crate::codec::encode_arguments;
use crate::connection::{BusConnection, BusConnector, MethodCall};
use crate::error::{BusError, Result};

type Handler = Arc<dyn Fn(&[Json]) -> Result<Json> + Send + Sync>;

type PropertyKey = (String, ObjectPath, String);
type MethodKey = (String, ObjectPath, String, String);

#[derive(Default)]
struct State {
    names: BTreeSet<String>,
    objects: BTreeMap<(String, ObjectPath), String>,
    properties: BTreeMap<PropertyKey, BTreeMap<String, Json>>,
    replies: BTreeMap<MethodKey, Handler>,
    failing_get_all: BTreeSet<PropertyKey>,
    refuse_connections: bool,
    connections: usize,
    open: usize,
    calls: Vec<MethodCall>,
}

/// A mock bus that serves objects from memory.
#[derive(Clone, Default)]
pub struct MockBus {
    state: Arc<Mutex<State>>,
}

impl MockBus {
    /// Create an empty mock bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name with no objects.
    #[must_use]
    pub fn with_name(self, service: &str) -> Self {
        self.state.lock().names.insert(service.to_string());
        self
    }

    /// Register an object. `interfaces_xml` is the `<interface>` elements the
    /// object's introspection data should contain; child nodes are added
    /// automatically.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid object path.
    #[must_use]
    pub fn with_object(self, service: &str, path: &str, interfaces_xml: &str) -> Self {
        let path = parse_path(path);
        {
            let mut state = self.state.lock();
            state.names.insert(service.to_string());
            state
                .objects
                .insert((service.to_string(), path), interfaces_xml.to_string());
        }
        self
    }

    /// Set a property value.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid object path.
    #[must_use]
    pub fn with_property(
        self,
        service: &str,
        path: &str,
        interface: &str,
        name: &str,
        value: Json,
    ) -> Self {
        let key = (service.to_string(), parse_path(path), interface.to_string());
        self.state
            .lock()
            .properties
            .entry(key)
            .or_default()
            .insert(name.to_string(), value);
        self
    }

    /// Install a method handler.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid object path.
    #[must_use]
    pub fn with_reply<F>(self, service: &str, path: &str, interface: &str, method: &str, f: F) -> Self
    where
        F: Fn(&[Json]) -> Result<Json> + Send + Sync + 'static,
    {
        let key = (
            service.to_string(),
            parse_path(path),
            interface.to_string(),
            method.to_string(),
        );
        self.state.lock().replies.insert(key, Arc::new(f));
        self
    }

    /// Make reading all properties of `interface` fail with a remote error.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid object path.
    #[must_use]
    pub fn failing_get_all(self, service: &str, path: &str, interface: &str) -> Self {
        let key = (service.to_string(), parse_path(path), interface.to_string());
        self.state.lock().failing_get_all.insert(key);
        self
    }

    /// Make every subsequent `connect` fail.
    #[must_use]
    pub fn refusing_connections(self) -> Self {
        self.state.lock().refuse_connections = true;
        self
    }

    /// Total number of connections opened.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.state.lock().connections
    }

    /// Number of connections not yet dropped.
    #[must_use]
    pub fn open_connections(&self) -> usize {
        self.state.lock().open
    }

    /// Every method call received, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<MethodCall> {
        self.state.lock().calls.clone()
    }
}

impl fmt::Debug for MockBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MockBus")
            .field("names", &state.names)
            .field("objects", &state.objects.len())
            .field("connections", &state.connections)
            .finish_non_exhaustive()
    }
}

fn parse_path(path: &str) -> ObjectPath {
    path.parse().expect("mock object path must be valid")
}

#[async_trait]
impl BusConnector for MockBus {
    async fn connect(&self) -> Result<Box<dyn BusConnection>> {
        let mut state = self.state.lock();
        if state.refuse_connections {
            return Err(BusError::Connection("mock bus refused connection".to_string()));
        }
        state.connections += 1;
        state.open += 1;
        Ok(Box::new(MockConnection {
            state: Arc::clone(&self.state),
        }))
    }

    fn describe(&self) -> String {
        "mock bus".to_string()
    }
}

struct MockConnection {
    state: Arc<Mutex<State>>,
}

impl Drop for MockConnection {
    fn drop(&mut self) {
        self.state.lock().open -= 1;
    }
}

fn not_found(name: &str, message: String) -> BusError {
    BusError::NotFound {
        name: format!("org.freedesktop.DBus.Error.{name}"),
        message,
    }
}

impl State {
    fn check_service(&self, service: &str) -> Result<()> {
        if self.names.contains(service) {
            Ok(())
        } else {
            Err(not_found(
                "ServiceUnknown",
                format!("The name {service} was not provided by any .service files"),
            ))
        }
    }

    /// Names of the direct children of `path` that lead to a registered object.
    fn children(&self, service: &str, path: &ObjectPath) -> BTreeSet<String> {
        let depth = path.depth();
        self.objects
            .keys()
            .filter(|(svc, p)| svc == service && p.depth() > depth)
            .filter(|(_, p)| p.segments().take(depth).eq(path.segments()))
            .filter_map(|(_, p)| p.segments().nth(depth).map(str::to_string))
            .collect()
    }

    fn check_object(&self, service: &str, path: &ObjectPath) -> Result<()> {
        self.check_service(service)?;
        let key = (service.to_string(), path.clone());
        if path.is_root() || self.objects.contains_key(&key) || !self.children(service, path).is_empty() {
            Ok(())
        } else {
            Err(not_found("UnknownObject", format!("No such object path '{path}'")))
        }
    }
}

#[async_trait]
impl BusConnection for MockConnection {
    async fn list_names(&self) -> Result<Vec<String>> {
        let state = self.state.lock();
        let mut names = vec!["org.freedesktop.DBus".to_string()];
        names.extend(state.names.iter().cloned());
        Ok(names)
    }

    async fn introspect(&self, service: &str, path: &ObjectPath) -> Result<String> {
        let state = self.state.lock();
        state.check_object(service, path)?;

        let mut xml = String::from("<node>\n");
        if let Some(interfaces) = state.objects.get(&(service.to_string(), path.clone())) {
            xml.push_str(interfaces);
            xml.push('\n');
        }
        for child in state.children(service, path) {
            xml.push_str(&format!("  <node name=\"{child}\"/>\n"));
        }
        xml.push_str("</node>\n");
        Ok(xml)
    }

    async fn get_property(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
        property: &str,
    ) -> Result<Json> {
        let state = self.state.lock();
        state.check_object(service, path)?;
        state
            .properties
            .get(&(service.to_string(), path.clone(), interface.to_string()))
            .and_then(|props| props.get(property))
            .cloned()
            .ok_or_else(|| {
                not_found(
                    "UnknownProperty",
                    format!("No such property '{property}' on {interface}"),
                )
            })
    }

    async fn get_all_properties(
        &self,
        service: &str,
        path: &ObjectPath,
        interface: &str,
    ) -> Result<BTreeMap<String, Json>> {
        let state = self.state.lock();
        state.check_object(service, path)?;
        let key = (service.to_string(), path.clone(), interface.to_string());
        if state.failing_get_all.contains(&key) {
            return Err(BusError::Remote {
                name: "org.freedesktop.DBus.Error.AccessDenied".to_string(),
                message: format!("GetAll on {interface} denied"),
            });
        }
        Ok(state.properties.get(&key).cloned().unwrap_or_default())
    }

    async fn call_method(&self, call: &MethodCall) -> Result<Json> {
        let handler = {
            let mut state = self.state.lock();
            state.calls.push(call.clone());
            state.check_object(&call.service, &call.path)?;
            let key = (
                call.service.clone(),
                call.path.clone(),
                call.interface.clone(),
                call.method.clone(),
            );
            state.replies.get(&key).cloned().ok_or_else(|| {
                not_found(
                    "UnknownMethod",
                    format!("No such method '{}' on {}", call.method, call.interface),
                )
            })?
        };

        // Reject the same argument shapes the real marshaller would.
        encode_arguments(&call.signature, &call.args)?;
        handler(&call.args)
    }
}
