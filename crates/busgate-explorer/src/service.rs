//! Explorer service implementation.
//!
//! This module provides the `BusExplorer` trait, the seam the HTTP layer
//! talks to, and `ExplorerService`, which resolves paths against a
//! [`BusRegistry`].

use std::sync::Arc;

use async_trait::async_trait;
use busgate_bus::BusRegistry;

use crate::catalog::introspect_object;
use crate::error::{ExploreError, Result};
use crate::invoker::{decode_arguments, invoke};
use crate::resolver::{connect, parse_location, resolve, Location};
use crate::types::{CallOutcome, ExplorerConfig, Resource};

/// Operations on the bus resource tree.
///
/// Paths are given as the non-empty segments following `/bus`.
#[async_trait]
pub trait BusExplorer: Send + Sync {
    /// Resolve a path to a resource.
    ///
    /// # Errors
    ///
    /// Returns the `ExploreError` for the level that could not be resolved.
    async fn resolve(&self, segments: &[&str]) -> Result<Resource>;

    /// Invoke the method addressed by a path.
    ///
    /// Only path resolution and body decoding failures are errors; a failed
    /// invocation is reported as `CallOutcome::Failed`.
    ///
    /// # Errors
    ///
    /// Returns `ExploreError::NotFound` if the path does not address a
    /// method, the usual not-found kinds for unresolvable levels, and
    /// `ExploreError::MalformedBody` if `body` is not a JSON array.
    async fn invoke(&self, segments: &[&str], body: &[u8]) -> Result<CallOutcome>;

    /// Registered bus keys, sorted.
    fn bus_keys(&self) -> Vec<String>;
}

/// The explorer backed by a bus registry.
#[derive(Debug, Clone)]
pub struct ExplorerService {
    registry: Arc<BusRegistry>,
    config: ExplorerConfig,
}

impl ExplorerService {
    /// Create a new explorer.
    #[must_use]
    pub fn new(registry: Arc<BusRegistry>, config: ExplorerConfig) -> Self {
        Self { registry, config }
    }

    /// Create with default configuration.
    #[must_use]
    pub fn with_defaults(registry: Arc<BusRegistry>) -> Self {
        Self::new(registry, ExplorerConfig::default())
    }

    /// Parse segments, rejecting unknown bus keys before anything else.
    fn locate(&self, segments: &[&str]) -> Result<Location> {
        if let Some(bus) = segments.first() {
            if !self.registry.contains(bus) {
                return Err(ExploreError::BusNotFound((*bus).to_string()));
            }
        }
        parse_location(segments)
    }
}

#[async_trait]
impl BusExplorer for ExplorerService {
    async fn resolve(&self, segments: &[&str]) -> Result<Resource> {
        let location = self.locate(segments)?;
        tracing::debug!(location = ?location, "Resolving");
        resolve(&self.registry, &self.config, &location).await
    }

    async fn invoke(&self, segments: &[&str], body: &[u8]) -> Result<CallOutcome> {
        let Location::Member {
            object,
            interface,
            member,
        } = self.locate(segments)?
        else {
            return Err(ExploreError::NotFound(format!(
                "/bus/{} does not address a method",
                segments.join("/")
            )));
        };
        let args = decode_arguments(body)?;

        let conn = connect(&self.registry, &object.bus).await?;
        let introspection = introspect_object(conn.as_ref(), &object.service, &object.path).await?;
        let spec = introspection
            .interface(&interface)
            .ok_or_else(|| ExploreError::InterfaceNotFound(interface.clone()))?;

        tracing::debug!(
            bus = %object.bus,
            service = %object.service,
            path = %object.path,
            interface = %interface,
            method = %member,
            "Invoking method"
        );
        Ok(invoke(conn.as_ref(), &object, spec, &member, args).await)
    }

    fn bus_keys(&self) -> Vec<String> {
        self.registry.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use busgate_bus::{BusError, MockBus};
    use busgate_core::split_path;
    use futures::future::join_all;
    use serde_json::json;

    use crate::error::InvokeError;

    const DEVICE: &str = r#"<interface name="org.example.Device">
    <method name="Rename">
      <arg name="name" type="s" direction="in"/>
      <arg name="old" type="s" direction="out"/>
    </method>
    <method name="Reboot"/>
    <signal name="Renamed"><arg name="name" type="s"/></signal>
    <property name="Name" type="s" access="read"/>
  </interface>
  <interface name="org.example.Bare">
    <method name="Noop"/>
  </interface>"#;

    fn mock() -> MockBus {
        let mut bus = MockBus::new().with_name("org.example.Idle");
        for i in 0..8 {
            let path = format!("/org/example/dev{i}");
            bus = bus
                .with_object("org.example", &path, DEVICE)
                .with_property("org.example", &path, "org.example.Device", "Name", json!(format!("dev{i}")))
                .with_reply("org.example", &path, "org.example.Device", "Rename", |args| {
                    Ok(args.first().cloned().unwrap_or_default())
                })
                .with_reply("org.example", &path, "org.example.Device", "Reboot", |_| {
                    Err(BusError::from_reply("org.example.Error.Busy", "device busy"))
                });
        }
        bus
    }

    fn explorer(bus: &MockBus) -> ExplorerService {
        let registry = BusRegistry::new()
            .with_bus("session", Arc::new(bus.clone()))
            .with_bus("other", Arc::new(MockBus::new()));
        ExplorerService::with_defaults(Arc::new(registry))
    }

    async fn get(explorer: &ExplorerService, path: &str) -> Result<Resource> {
        explorer.resolve(&split_path(path)).await
    }

    async fn post(explorer: &ExplorerService, path: &str, body: &str) -> Result<CallOutcome> {
        explorer.invoke(&split_path(path), body.as_bytes()).await
    }

    #[tokio::test]
    async fn bus_listing_is_idempotent() {
        let bus = mock();
        let explorer = explorer(&bus);
        let first = get(&explorer, "").await.unwrap();
        let second = get(&explorer, "/").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(
            first,
            Resource::Buses {
                buses: vec!["other".into(), "session".into()]
            }
        );
        assert_eq!(bus.connection_count(), 0);
    }

    #[tokio::test]
    async fn unknown_bus() {
        let explorer = explorer(&mock());
        assert_eq!(
            get(&explorer, "nope").await.unwrap_err(),
            ExploreError::BusNotFound("nope".into())
        );
        assert_eq!(
            get(&explorer, "nope/org.example/x/a.b/c/d/e").await.unwrap_err(),
            ExploreError::BusNotFound("nope".into())
        );
    }

    #[tokio::test]
    async fn services_are_sorted() {
        let explorer = explorer(&mock());
        let Resource::Services { services } = get(&explorer, "session").await.unwrap() else {
            panic!("expected services");
        };
        assert_eq!(
            services,
            vec!["org.example", "org.example.Idle", "org.freedesktop.DBus"]
        );
    }

    #[tokio::test]
    async fn objects_are_sorted() {
        let explorer = explorer(&mock());
        let Resource::Objects { objects } = get(&explorer, "session/org.example").await.unwrap() else {
            panic!("expected objects");
        };
        assert_eq!(objects.len(), 10);
        assert_eq!(objects[0], "/org");
        assert_eq!(objects[1], "/org/example");
        assert_eq!(objects[9], "/org/example/dev7");
        let mut sorted = objects.clone();
        sorted.sort();
        assert_eq!(objects, sorted);
    }

    #[tokio::test]
    async fn object_interfaces_in_order() {
        let explorer = explorer(&mock());
        assert_eq!(
            get(&explorer, "session/org.example/org/example/dev0").await.unwrap(),
            Resource::Interfaces {
                interfaces: vec!["org.example.Device".into(), "org.example.Bare".into()]
            }
        );
    }

    #[tokio::test]
    async fn missing_object() {
        let explorer = explorer(&mock());
        let err = get(&explorer, "session/org.example/org/missing").await.unwrap_err();
        assert!(matches!(err, ExploreError::ObjectNotFound { .. }));
        assert_eq!(err.http_status_code(), 404);
    }

    #[tokio::test]
    async fn interface_catalog() {
        let explorer = explorer(&mock());
        let Resource::Interface(catalog) =
            get(&explorer, "session/org.example/org/example/dev3/org.example.Device")
                .await
                .unwrap()
        else {
            panic!("expected catalog");
        };
        assert_eq!(catalog.methods.len(), 2);
        assert_eq!(
            catalog.methods[0].uri,
            "/bus/session/org.example/org/example/dev3/org.example.Device/Rename"
        );
        assert_eq!(catalog.signals[0].name, "Renamed");
        assert_eq!(catalog.properties.get("Name"), Some(&json!("dev3")));

        let err = get(&explorer, "session/org.example/org/example/dev3/org.example.Missing")
            .await
            .unwrap_err();
        assert_eq!(err, ExploreError::InterfaceNotFound("org.example.Missing".into()));
    }

    #[tokio::test]
    async fn property_values() {
        let explorer = explorer(&mock());
        assert_eq!(
            get(&explorer, "session/org.example/org/example/dev1/org.example.Device/Name")
                .await
                .unwrap(),
            Resource::Property {
                property: "Name".into(),
                value: json!("dev1")
            }
        );

        let err = get(&explorer, "session/org.example/org/example/dev1/org.example.Bare/Anything")
            .await
            .unwrap_err();
        assert!(matches!(err, ExploreError::PropertyNotFound { .. }));
        assert_eq!(err.http_status_code(), 404);
    }

    #[tokio::test]
    async fn catalog_uri_round_trips_through_invoke() {
        let explorer = explorer(&mock());
        let Resource::Interface(catalog) =
            get(&explorer, "session/org.example/org/example/dev2/org.example.Device")
                .await
                .unwrap()
        else {
            panic!("expected catalog");
        };
        let uri = &catalog.methods[0].uri;
        let path = uri.strip_prefix("/bus").unwrap();

        assert_eq!(
            post(&explorer, path, r#"["new"]"#).await.unwrap(),
            CallOutcome::Returned(json!("new"))
        );
    }

    #[tokio::test]
    async fn invocation_failures_are_outcomes() {
        let explorer = explorer(&mock());
        let base = "session/org.example/org/example/dev0/org.example.Device";

        let outcome = post(&explorer, &format!("{base}/Missing"), "[]").await.unwrap();
        assert!(matches!(
            outcome,
            CallOutcome::Failed(InvokeError::MethodNotFound { .. })
        ));

        let outcome = post(&explorer, &format!("{base}/Rename"), "[]").await.unwrap();
        assert!(matches!(outcome, CallOutcome::Failed(InvokeError::Arity { .. })));

        let outcome = post(&explorer, &format!("{base}/Reboot"), "").await.unwrap();
        assert!(matches!(outcome, CallOutcome::Failed(InvokeError::Call(_))));
    }

    #[tokio::test]
    async fn invoke_resolution_errors() {
        let explorer = explorer(&mock());

        let err = post(&explorer, "session/org.example/org/example/dev0", "[]").await.unwrap_err();
        assert!(matches!(err, ExploreError::NotFound(_)));

        let err = post(&explorer, "session/org.example/org/example/dev0/org.example.Nope/X", "[]")
            .await
            .unwrap_err();
        assert_eq!(err, ExploreError::InterfaceNotFound("org.example.Nope".into()));

        let err = post(&explorer, "session/org.example/org/example/dev0/org.example.Device/Rename", "{")
            .await
            .unwrap_err();
        assert!(matches!(err, ExploreError::MalformedBody(_)));
        assert_eq!(err.http_status_code(), 403);
    }

    #[tokio::test]
    async fn connection_failure_is_failed() {
        let registry = BusRegistry::new().with_bus("down", Arc::new(MockBus::new().refusing_connections()));
        let explorer = ExplorerService::with_defaults(Arc::new(registry));
        let err = get(&explorer, "down").await.unwrap_err();
        assert!(matches!(err, ExploreError::Failed(_)));
        assert_eq!(err.http_status_code(), 403);
    }

    #[tokio::test]
    async fn connections_are_released() {
        let bus = mock();
        let explorer = explorer(&bus);
        get(&explorer, "session/org.example/org/example/dev0").await.unwrap();
        get(&explorer, "session/org.example/org/missing").await.unwrap_err();
        post(&explorer, "session/org.example/org/example/dev0/org.example.Device/Reboot", "")
            .await
            .unwrap();
        assert_eq!(bus.connection_count(), 3);
        assert_eq!(bus.open_connections(), 0);
    }

    #[tokio::test]
    async fn parallel_requests_do_not_interfere() {
        let bus = mock();
        let explorer = Arc::new(explorer(&bus));

        let requests = (0..8).map(|i| {
            let explorer = Arc::clone(&explorer);
            tokio::spawn(async move {
                let path = format!("session/org.example/org/example/dev{i}/org.example.Device/Name");
                (i, explorer.resolve(&split_path(&path)).await)
            })
        });

        for joined in join_all(requests).await {
            let (i, result) = joined.unwrap();
            assert_eq!(
                result.unwrap(),
                Resource::Property {
                    property: "Name".into(),
                    value: json!(format!("dev{i}"))
                }
            );
        }
        assert_eq!(bus.open_connections(), 0);
    }
}
