//! Gateway configuration types.
//!
//! Configuration is read from `BUSGATE_*` environment variables; every field
//! has a default.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use busgate_bus::{BusRegistry, BusTarget, ZbusConnector};
use busgate_explorer::ExplorerConfig;
use serde::Deserialize;
use thiserror::Error;

/// Errors in the gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A variable could not be parsed.
    #[error("invalid value for {name}: {message}")]
    Invalid {
        /// The variable name.
        name: &'static str,
        /// What was wrong with it.
        message: String,
    },

    /// An extra bus reuses a key that is already registered.
    #[error("duplicate bus key: {0}")]
    DuplicateBus(String),
}

/// An additional bus reachable by D-Bus address.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BusSpec {
    /// Key under which the bus is exposed.
    pub key: String,
    /// D-Bus address, e.g. `unix:path=/run/user/1000/bus`.
    pub address: String,
}

/// Configuration for the gateway service.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address used when no socket is handed over at startup.
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Directory holding the browser UI assets.
    #[serde(default = "GatewayConfig::default_assets_dir")]
    pub assets_dir: PathBuf,

    /// Allowed CORS origins.
    #[serde(default = "GatewayConfig::default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Buses registered in addition to `system` and `session`.
    #[serde(default)]
    pub extra_buses: Vec<BusSpec>,

    /// Explorer settings.
    #[serde(default)]
    pub explorer: ExplorerConfig,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "127.0.0.1:8080".to_string()
    }

    fn default_assets_dir() -> PathBuf {
        PathBuf::from("assets")
    }

    fn default_cors_origins() -> Vec<String> {
        vec!["*".to_string()]
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set to an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("BUSGATE_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(dir) = lookup("BUSGATE_ASSETS_DIR") {
            config.assets_dir = PathBuf::from(dir);
        }
        if let Some(origins) = lookup("BUSGATE_CORS_ORIGINS") {
            config.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(bytes) = lookup("BUSGATE_MAX_BODY_BYTES") {
            config.max_body_bytes = bytes.trim().parse().map_err(|e| ConfigError::Invalid {
                name: "BUSGATE_MAX_BODY_BYTES",
                message: format!("{e}"),
            })?;
        }
        if let Some(depth) = lookup("BUSGATE_MAX_WALK_DEPTH") {
            config.explorer.max_walk_depth =
                depth.trim().parse().map_err(|e| ConfigError::Invalid {
                    name: "BUSGATE_MAX_WALK_DEPTH",
                    message: format!("{e}"),
                })?;
        }
        if let Some(buses) = lookup("BUSGATE_BUSES") {
            config.extra_buses = parse_bus_specs(&buses)?;
        }

        Ok(config)
    }

    /// Build the bus registry: `system`, `session` and any extra buses.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateBus` if an extra bus reuses a key.
    pub fn build_registry(&self) -> Result<BusRegistry, ConfigError> {
        let mut registry = BusRegistry::standard();
        for spec in &self.extra_buses {
            if registry.contains(&spec.key) {
                return Err(ConfigError::DuplicateBus(spec.key.clone()));
            }
            registry = registry.with_bus(
                spec.key.clone(),
                Arc::new(ZbusConnector::new(BusTarget::Address(spec.address.clone()))),
            );
        }
        Ok(registry)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            assets_dir: Self::default_assets_dir(),
            cors_origins: Self::default_cors_origins(),
            max_body_bytes: Self::default_max_body(),
            extra_buses: Vec::new(),
            explorer: ExplorerConfig::default(),
        }
    }
}

/// Parse `key=address;key=address`.
fn parse_bus_specs(value: &str) -> Result<Vec<BusSpec>, ConfigError> {
    let invalid = |message: String| ConfigError::Invalid {
        name: "BUSGATE_BUSES",
        message,
    };

    let mut seen = HashSet::new();
    let mut specs = Vec::new();
    for entry in value.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let Some((key, address)) = entry.split_once('=') else {
            return Err(invalid(format!("expected key=address, got {entry:?}")));
        };
        let (key, address) = (key.trim(), address.trim());
        if key.is_empty() || key.contains('/') {
            return Err(invalid(format!("invalid bus key {key:?}")));
        }
        if address.is_empty() {
            return Err(invalid(format!("missing address for bus {key:?}")));
        }
        if !seen.insert(key.to_string()) {
            return Err(ConfigError::DuplicateBus(key.to_string()));
        }
        specs.push(BusSpec {
            key: key.to_string(),
            address: address.to_string(),
        });
    }
    Ok(specs)
}
