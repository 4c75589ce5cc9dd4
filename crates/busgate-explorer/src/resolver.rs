//! Path resolution.
//!
//! A request path below `/bus` is first parsed into a [`Location`] without
//! touching the bus, then resolved level by level against a live connection.
//!
//! Object path segments are consumed greedily until the first segment that
//! contains a `.`; that segment names the interface. The next segment, if
//! any, names a property (GET) or method (POST). Anything after that does
//! not address a resource.

use busgate_bus::{BusConnection, BusRegistry};
use busgate_core::{is_interface_segment, ObjectPath};

use crate::catalog::{build_catalog, discover_objects, introspect_object};
use crate::error::{ExploreError, Result};
use crate::types::{ExplorerConfig, Resource};

/// An object addressed by bus, service and path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef {
    /// Bus key.
    pub bus: String,
    /// Service name.
    pub service: String,
    /// Object path; never the root.
    pub path: ObjectPath,
}

/// A parsed request location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    /// `/bus`
    Root,
    /// `/bus/{bus}`
    Bus(String),
    /// `/bus/{bus}/{service}`
    Service {
        /// Bus key.
        bus: String,
        /// Service name.
        service: String,
    },
    /// `/bus/{bus}/{service}{path}`
    Object(ObjectRef),
    /// `/bus/{bus}/{service}{path}/{interface}`
    Interface {
        /// The object.
        object: ObjectRef,
        /// Interface name.
        interface: String,
    },
    /// `/bus/{bus}/{service}{path}/{interface}/{member}`
    Member {
        /// The object.
        object: ObjectRef,
        /// Interface name.
        interface: String,
        /// Property or method name.
        member: String,
    },
}

impl Location {
    /// The bus key, unless this is the root.
    #[must_use]
    pub fn bus(&self) -> Option<&str> {
        match self {
            Self::Root => None,
            Self::Bus(bus) | Self::Service { bus, .. } => Some(bus),
            Self::Object(object)
            | Self::Interface { object, .. }
            | Self::Member { object, .. } => Some(&object.bus),
        }
    }
}

struct Cursor<'s, 'a> {
    rest: &'s [&'a str],
}

impl<'a> Cursor<'_, 'a> {
    fn pop(&mut self) -> Option<&'a str> {
        let (first, rest) = self.rest.split_first()?;
        self.rest = rest;
        Some(*first)
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    /// Consume segments up to, not including, the first dotted one.
    fn take_object_path(&mut self) -> Result<ObjectPath> {
        let mut path = ObjectPath::root();
        while let Some(segment) = self.rest.first() {
            if is_interface_segment(segment) {
                break;
            }
            path.push(segment)
                .map_err(|err| ExploreError::NotFound(err.to_string()))?;
            self.rest = &self.rest[1..];
        }
        Ok(path)
    }
}

/// Parse non-empty path segments into a location.
///
/// # Errors
///
/// Returns `ExploreError::NotFound` if no object path precedes the interface
/// name or if segments remain after the member name.
pub fn parse_location(segments: &[&str]) -> Result<Location> {
    let mut cursor = Cursor { rest: segments };

    let Some(bus) = cursor.pop() else {
        return Ok(Location::Root);
    };
    let Some(service) = cursor.pop() else {
        return Ok(Location::Bus(bus.to_string()));
    };
    if cursor.is_empty() {
        return Ok(Location::Service {
            bus: bus.to_string(),
            service: service.to_string(),
        });
    }

    let path = cursor.take_object_path()?;
    if path.is_root() {
        return Err(ExploreError::NotFound(format!(
            "no object path before interface in /bus/{}",
            segments.join("/")
        )));
    }
    let object = ObjectRef {
        bus: bus.to_string(),
        service: service.to_string(),
        path,
    };

    let Some(interface) = cursor.pop() else {
        return Ok(Location::Object(object));
    };
    let Some(member) = cursor.pop() else {
        return Ok(Location::Interface {
            object,
            interface: interface.to_string(),
        });
    };
    if !cursor.is_empty() {
        return Err(ExploreError::NotFound(format!(
            "nothing below member {member} in /bus/{}",
            segments.join("/")
        )));
    }
    Ok(Location::Member {
        object,
        interface: interface.to_string(),
        member: member.to_string(),
    })
}

/// Open a connection to the bus named by `location`.
///
/// # Errors
///
/// Returns `ExploreError::BusNotFound` for an unregistered key and
/// `ExploreError::Failed` if the connection cannot be opened.
pub async fn connect(registry: &BusRegistry, bus: &str) -> Result<Box<dyn BusConnection>> {
    let connector = registry
        .get(bus)
        .ok_or_else(|| ExploreError::BusNotFound(bus.to_string()))?;
    connector.connect().await.map_err(ExploreError::from)
}

/// Resolve a location to a resource with GET semantics.
///
/// # Errors
///
/// Returns the not-found kind matching the level that could not be
/// resolved, or `ExploreError::Failed` for bus failures.
pub async fn resolve(
    registry: &BusRegistry,
    config: &ExplorerConfig,
    location: &Location,
) -> Result<Resource> {
    match location {
        Location::Root => Ok(Resource::Buses {
            buses: registry.keys(),
        }),
        Location::Bus(bus) => {
            let conn = connect(registry, bus).await?;
            let mut services = conn.list_names().await?;
            services.sort();
            services.dedup();
            Ok(Resource::Services { services })
        }
        Location::Service { bus, service } => {
            let conn = connect(registry, bus).await?;
            let objects = discover_objects(conn.as_ref(), service, config.max_walk_depth).await?;
            Ok(Resource::Objects { objects })
        }
        Location::Object(object) => {
            let conn = connect(registry, &object.bus).await?;
            let introspection = introspect_object(conn.as_ref(), &object.service, &object.path).await?;
            Ok(Resource::Interfaces {
                interfaces: introspection.interface_names(),
            })
        }
        Location::Interface { object, interface } => {
            let conn = connect(registry, &object.bus).await?;
            let introspection = introspect_object(conn.as_ref(), &object.service, &object.path).await?;
            let catalog = build_catalog(
                conn.as_ref(),
                &object.bus,
                &object.service,
                &object.path,
                &introspection,
                interface,
            )
            .await?;
            Ok(Resource::Interface(catalog))
        }
        Location::Member {
            object,
            interface,
            member,
        } => {
            let conn = connect(registry, &object.bus).await?;
            let introspection = introspect_object(conn.as_ref(), &object.service, &object.path).await?;
            if introspection.interface(interface).is_none() {
                return Err(ExploreError::InterfaceNotFound(interface.clone()));
            }
            let value = conn
                .get_property(&object.service, &object.path, interface, member)
                .await
                .map_err(|err| {
                    if err.is_remote() {
                        ExploreError::PropertyNotFound {
                            interface: interface.clone(),
                            property: member.clone(),
                        }
                    } else {
                        ExploreError::from(err)
                    }
                })?;
            Ok(Resource::Property {
                property: member.clone(),
                value,
            })
        }
    }
}
