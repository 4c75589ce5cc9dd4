//! Introspection catalog builder.
//!
//! Turns raw introspection XML into owned interface descriptors, builds the
//! per-interface catalog with invocation URIs, and walks a service's object
//! tree.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use busgate_bus::{BusConnection, BusError};
use busgate_core::ObjectPath;
use zbus_xml::{Arg, ArgDirection, Node};

use crate::error::{ExploreError, Result};
use crate::types::{ArgDescriptor, InterfaceCatalog, MethodDescriptor, SignalDescriptor};

/// Parsed introspection data of one object.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Introspection {
    /// Interfaces in document order.
    pub interfaces: Vec<InterfaceSpec>,
    /// Names of direct child nodes in document order.
    pub children: Vec<String>,
}

/// One interface of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceSpec {
    /// Interface name.
    pub name: String,
    /// Methods in declaration order.
    pub methods: Vec<MemberSpec>,
    /// Signals in declaration order.
    pub signals: Vec<MemberSpec>,
    /// Property names in declaration order.
    pub properties: Vec<String>,
}

/// A method or signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSpec {
    /// Member name.
    pub name: String,
    /// Arguments as declared.
    pub args: Vec<ArgDescriptor>,
}

impl Introspection {
    /// Parse introspection XML.
    ///
    /// # Errors
    ///
    /// Returns `ExploreError::Failed` if the document is malformed.
    pub fn parse(xml: &str) -> Result<Self> {
        let node = Node::try_from(xml)
            .map_err(|e| ExploreError::Failed(format!("malformed introspection data: {e}")))?;

        let interfaces = node
            .interfaces()
            .iter()
            .map(|iface| InterfaceSpec {
                name: iface.name().to_string(),
                methods: iface
                    .methods()
                    .iter()
                    .map(|m| MemberSpec {
                        name: m.name().to_string(),
                        args: describe_args(m.args()),
                    })
                    .collect(),
                signals: iface
                    .signals()
                    .iter()
                    .map(|s| MemberSpec {
                        name: s.name().to_string(),
                        args: describe_args(s.args()),
                    })
                    .collect(),
                properties: iface.properties().iter().map(|p| p.name().to_string()).collect(),
            })
            .collect();

        let children = node
            .nodes()
            .iter()
            .filter_map(|child| child.name())
            .map(str::to_string)
            .collect();

        Ok(Self {
            interfaces,
            children,
        })
    }

    /// Find an interface by exact name.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&InterfaceSpec> {
        self.interfaces.iter().find(|iface| iface.name == name)
    }

    /// Interface names in document order.
    #[must_use]
    pub fn interface_names(&self) -> Vec<String> {
        self.interfaces.iter().map(|iface| iface.name.clone()).collect()
    }

    /// Returns true if the node declares neither interfaces nor children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty() && self.children.is_empty()
    }
}

impl InterfaceSpec {
    /// Find a method by exact name.
    #[must_use]
    pub fn method(&self, name: &str) -> Option<&MemberSpec> {
        self.methods.iter().find(|m| m.name == name)
    }
}

impl MemberSpec {
    /// Type signatures of the input arguments, in order.
    #[must_use]
    pub fn input_signature(&self) -> Vec<String> {
        self.args
            .iter()
            .filter(|arg| arg.is_input())
            .map(|arg| arg.ty.clone())
            .collect()
    }
}

fn describe_args(args: &[Arg<'_>]) -> Vec<ArgDescriptor> {
    args.iter()
        .map(|arg| ArgDescriptor {
            name: arg.name().map(str::to_string),
            direction: arg.direction().map(|d| {
                match d {
                    ArgDirection::In => "in",
                    ArgDirection::Out => "out",
                }
                .to_string()
            }),
            ty: arg.ty().to_string(),
        })
        .collect()
}

/// Introspect one object.
///
/// A remote not-found reply and an empty node both mean the service owns no
/// such object.
///
/// # Errors
///
/// Returns `ExploreError::ObjectNotFound` if the object does not exist and
/// `ExploreError::Failed` for any other failure.
pub async fn introspect_object(
    conn: &dyn BusConnection,
    service: &str,
    path: &ObjectPath,
) -> Result<Introspection> {
    let object_not_found = || ExploreError::ObjectNotFound {
        service: service.to_string(),
        path: path.to_string(),
    };

    let xml = conn.introspect(service, path).await.map_err(|err| {
        if err.is_not_found() {
            object_not_found()
        } else {
            ExploreError::from(err)
        }
    })?;
    let introspection = Introspection::parse(&xml)?;

    if introspection.is_empty() && !path.is_root() {
        return Err(object_not_found());
    }
    Ok(introspection)
}

/// Build the catalog of `interface`.
///
/// Properties are fetched with a single get-all call; if that fails the
/// catalog is returned with no properties.
///
/// # Errors
///
/// Returns `ExploreError::InterfaceNotFound` if the object does not
/// implement the interface.
pub async fn build_catalog(
    conn: &dyn BusConnection,
    bus_key: &str,
    service: &str,
    path: &ObjectPath,
    introspection: &Introspection,
    interface: &str,
) -> Result<InterfaceCatalog> {
    let spec = introspection
        .interface(interface)
        .ok_or_else(|| ExploreError::InterfaceNotFound(interface.to_string()))?;

    let methods = spec
        .methods
        .iter()
        .map(|m| MethodDescriptor {
            name: m.name.clone(),
            args: m.args.clone(),
            uri: method_uri(bus_key, service, path, interface, &m.name),
        })
        .collect();

    let signals = spec
        .signals
        .iter()
        .map(|s| SignalDescriptor {
            name: s.name.clone(),
            args: s.args.clone(),
        })
        .collect();

    let properties = match conn.get_all_properties(service, path, interface).await {
        Ok(properties) => properties,
        Err(err) => {
            tracing::debug!(
                service = %service,
                path = %path,
                interface = %interface,
                error = %err,
                "Reading all properties failed, returning none"
            );
            BTreeMap::new()
        }
    };

    Ok(InterfaceCatalog {
        interface: interface.to_string(),
        methods,
        signals,
        properties,
    })
}

/// The path that invokes a method.
#[must_use]
pub fn method_uri(
    bus_key: &str,
    service: &str,
    path: &ObjectPath,
    interface: &str,
    method: &str,
) -> String {
    format!("/bus/{bus_key}/{service}{path}/{interface}/{method}")
}

/// Walk a service's object tree from `/` and return every path found below
/// the root, sorted.
///
/// Children deeper than `max_depth` are not visited. Children that fail to
/// introspect are skipped.
///
/// # Errors
///
/// Returns `ExploreError::ObjectNotFound` if the service does not exist and
/// `ExploreError::Failed` if the root cannot be introspected.
pub async fn discover_objects(
    conn: &dyn BusConnection,
    service: &str,
    max_depth: usize,
) -> Result<Vec<String>> {
    let root = ObjectPath::root();
    let root_node = introspect_object(conn, service, &root).await?;

    let mut found = BTreeSet::new();
    let mut queue = VecDeque::from([(root, root_node)]);

    while let Some((path, node)) = queue.pop_front() {
        if path.depth() >= max_depth {
            continue;
        }
        for name in &node.children {
            let child = match path.child(name) {
                Ok(child) => child,
                Err(err) => {
                    tracing::debug!(service = %service, path = %path, child = %name, error = %err, "Skipping unaddressable child");
                    continue;
                }
            };
            if !found.insert(child.to_string()) {
                continue;
            }
            match introspect_child(conn, service, &child).await {
                Ok(child_node) => queue.push_back((child, child_node)),
                Err(err) => {
                    tracing::debug!(service = %service, path = %child, error = %err, "Skipping child that failed to introspect");
                }
            }
        }
    }

    Ok(found.into_iter().collect())
}

async fn introspect_child(
    conn: &dyn BusConnection,
    service: &str,
    path: &ObjectPath,
) -> std::result::Result<Introspection, String> {
    let xml = conn
        .introspect(service, path)
        .await
        .map_err(|err: BusError| err.to_string())?;
    Introspection::parse(&xml).map_err(|err| err.to_string())
}
