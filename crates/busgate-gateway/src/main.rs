//! busgate - D-Bus to HTTP gateway
//!
//! This is the main entry point for the gateway service. Configuration is
//! read from `BUSGATE_*` environment variables; the listener is adopted from
//! socket activation when available.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use busgate_explorer::ExplorerService;
use busgate_gateway::{create_router, socket, GatewayConfig, GatewayState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,busgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting busgate");

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        assets_dir = %config.assets_dir.display(),
        cors_origins = ?config.cors_origins,
        max_walk_depth = config.explorer.max_walk_depth,
        "Gateway configuration loaded"
    );

    let registry = Arc::new(config.build_registry()?);
    tracing::info!(buses = ?registry.keys(), "Bus registry initialized");

    let explorer = Arc::new(ExplorerService::new(registry, config.explorer.clone()));

    let listener = socket::get_listener(&config.listen_addr).await?;
    let app = create_router(GatewayState::new(explorer, config));

    tracing::info!("Starting HTTP server");
    axum::serve(listener, app).await?;

    Ok(())
}
