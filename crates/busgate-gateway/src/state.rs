//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use busgate_explorer::BusExplorer;

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// Built once at startup; read-only afterwards.
pub struct GatewayState<E>
where
    E: BusExplorer,
{
    /// The explorer resolving `/bus` paths.
    pub explorer: Arc<E>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<E> GatewayState<E>
where
    E: BusExplorer,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(explorer: Arc<E>, config: GatewayConfig) -> Self {
        Self { explorer, config }
    }
}

impl<E> Clone for GatewayState<E>
where
    E: BusExplorer,
{
    fn clone(&self) -> Self {
        Self {
            explorer: Arc::clone(&self.explorer),
            config: self.config.clone(),
        }
    }
}
