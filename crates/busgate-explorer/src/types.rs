//! Resource and catalog types returned by the explorer.
//!
//! Each `Resource` variant serializes to exactly the fields of its response
//! envelope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

use crate::error::InvokeError;

/// A resolved resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Resource {
    /// Registered bus keys.
    Buses {
        /// Sorted bus keys.
        buses: Vec<String>,
    },
    /// Names owned on a bus.
    Services {
        /// Sorted service names.
        services: Vec<String>,
    },
    /// Object paths of a service.
    Objects {
        /// Sorted object paths.
        objects: Vec<String>,
    },
    /// Interfaces implemented by an object.
    Interfaces {
        /// Interface names in introspection order.
        interfaces: Vec<String>,
    },
    /// Members of one interface.
    Interface(InterfaceCatalog),
    /// A single property value.
    Property {
        /// The property name.
        property: String,
        /// The current value.
        value: Json,
    },
}

/// The method, signal and property catalog of an interface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterfaceCatalog {
    /// The interface name.
    pub interface: String,
    /// Methods in declaration order.
    pub methods: Vec<MethodDescriptor>,
    /// Signals in declaration order.
    pub signals: Vec<SignalDescriptor>,
    /// Current property values; empty if they could not be read.
    pub properties: BTreeMap<String, Json>,
}

/// A method with the URI that invokes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MethodDescriptor {
    /// Method name.
    pub name: String,
    /// Arguments as declared.
    pub args: Vec<ArgDescriptor>,
    /// Path to POST to.
    pub uri: String,
}

/// A signal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignalDescriptor {
    /// Signal name.
    pub name: String,
    /// Arguments as declared.
    pub args: Vec<ArgDescriptor>,
}

/// A method or signal argument as declared in introspection data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArgDescriptor {
    /// Argument name, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `in` or `out`, if declared.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction: Option<String>,
    /// D-Bus type signature.
    #[serde(rename = "type")]
    pub ty: String,
}

impl ArgDescriptor {
    /// Returns true unless the argument is declared as an output.
    ///
    /// Method arguments without a direction are inputs.
    #[must_use]
    pub fn is_input(&self) -> bool {
        self.direction.as_deref() != Some("out")
    }
}

/// The outcome of a method invocation that reached the invoker.
#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    /// The method returned; `null`, a single value or an array of values.
    Returned(Json),
    /// The invocation failed.
    Failed(InvokeError),
}

/// Explorer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorerConfig {
    /// Maximum object path depth visited when listing a service's objects.
    #[serde(default = "default_max_walk_depth")]
    pub max_walk_depth: usize,
}

const fn default_max_walk_depth() -> usize {
    16
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            max_walk_depth: default_max_walk_depth(),
        }
    }
}
