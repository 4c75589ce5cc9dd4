//! The bus registry.
//!
//! Maps symbolic bus keys (`system`, `session`, ...) to connectors. The
//! registry is assembled once at startup and never mutated afterwards; it is
//! shared between requests behind an `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::connection::BusConnector;
use crate::dbus::{BusTarget, ZbusConnector};

/// Key of the system bus.
pub const SYSTEM_BUS: &str = "system";

/// Key of the session bus.
pub const SESSION_BUS: &str = "session";

/// Immutable mapping from bus key to connector.
#[derive(Clone, Default)]
pub struct BusRegistry {
    buses: BTreeMap<String, Arc<dyn BusConnector>>,
}

impl BusRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the system and session buses.
    #[must_use]
    pub fn standard() -> Self {
        Self::new()
            .with_bus(SYSTEM_BUS, Arc::new(ZbusConnector::new(BusTarget::System)))
            .with_bus(SESSION_BUS, Arc::new(ZbusConnector::new(BusTarget::Session)))
    }

    /// Register a bus under `key`, replacing any previous entry.
    #[must_use]
    pub fn with_bus(mut self, key: impl Into<String>, connector: Arc<dyn BusConnector>) -> Self {
        self.buses.insert(key.into(), connector);
        self
    }

    /// Look up a bus by key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<dyn BusConnector>> {
        self.buses.get(key).cloned()
    }

    /// Returns true if `key` is registered.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.buses.contains_key(key)
    }

    /// Registered bus keys in sorted order.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        self.buses.keys().cloned().collect()
    }

    /// Number of registered buses.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buses.len()
    }

    /// Returns true if no bus is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buses.is_empty()
    }
}

impl fmt::Debug for BusRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (key, connector) in &self.buses {
            map.entry(key, &connector.describe());
        }
        map.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBus;

    #[test]
    fn standard_registry_has_system_and_session() {
        let registry = BusRegistry::standard();
        assert_eq!(registry.keys(), vec!["session", "system"]);
        assert!(registry.contains(SYSTEM_BUS));
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn keys_are_sorted() {
        let registry = BusRegistry::new()
            .with_bus("zeta", Arc::new(MockBus::new()))
            .with_bus("alpha", Arc::new(MockBus::new()))
            .with_bus("mid", Arc::new(MockBus::new()));
        assert_eq!(registry.keys(), vec!["alpha", "mid", "zeta"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn later_registration_replaces() {
        let registry = BusRegistry::new()
            .with_bus("a", Arc::new(MockBus::new()))
            .with_bus("a", Arc::new(MockBus::new()));
        assert_eq!(registry.len(), 1);
        assert!(!registry.is_empty());
    }

    #[test]
    fn debug_lists_descriptions() {
        let registry = BusRegistry::standard();
        let debug = format!("{registry:?}");
        assert!(debug.contains("system"));
        assert!(debug.contains("session"));
    }
}
