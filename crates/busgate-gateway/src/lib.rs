//! HTTP gateway exposing D-Bus as a navigable JSON resource tree.
//!
//! Clients walk from the list of buses down to services, object paths,
//! interfaces, properties and methods, and invoke methods with JSON
//! arguments. A small browser UI is served from the assets directory.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Clients (HTTP)                          │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     busgate-gateway                         │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │   Router    │ │  Envelope   │ │      Assets         │    │
//! │  │ + Handlers  │ │  Renderer   │ │                     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//!                  ┌──────────────────────┐
//!                  │   ExplorerService    │
//!                  └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use busgate_explorer::ExplorerService;
//! use busgate_gateway::{create_router, GatewayConfig, GatewayState};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = GatewayConfig::from_env()?;
//! let registry = Arc::new(config.build_registry()?);
//! let explorer = Arc::new(ExplorerService::new(registry, config.explorer.clone()));
//!
//! let listener = busgate_gateway::socket::get_listener(&config.listen_addr).await?;
//! let app = create_router(GatewayState::new(explorer, config));
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod envelope;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod socket;
pub mod state;

pub use config::{BusSpec, ConfigError, GatewayConfig};
pub use error::ApiError;
pub use routes::create_router;
pub use state::GatewayState;
