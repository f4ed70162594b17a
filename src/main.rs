//! API Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────┐
//!                        │                 API GATEWAY                │
//!                        │                                            │
//!   Client Request       │  ┌────────┐   ┌──────────┐   ┌─────────┐  │
//!   ─────────────────────┼─▶│  http  │──▶│ dispatch │──▶│ routing │  │
//!                        │  │ server │   │ pipeline │   │  table  │  │
//!                        │  └────────┘   └────┬─────┘   └─────────┘  │
//!                        │                    │                      │
//!                        │        ┌───────────┼───────────┐          │
//!                        │        ▼           ▼           ▼          │
//!                        │  ┌──────────┐ ┌──────────┐ ┌──────────┐   │
//!   Client Response      │  │   auth   │ │ balancer │ │ registry │◀──┼── Consul /
//!   ◀────────────────────┼─ │introspect│ │round-rob.│ │ snapshot │   │   static
//!                        │  └──────────┘ └──────────┘ └──────────┘   │
//!                        │                                            │
//!                        │  config reload · health checks · metrics  │
//!                        │  lifecycle (signals, graceful shutdown)   │
//!                        └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_gateway::config::{load_config, ConfigWatcher, GatewayConfig};
use api_gateway::http::GatewayServer;
use api_gateway::lifecycle::{signals, Shutdown};
use api_gateway::observability::metrics;

#[derive(Parser, Debug)]
#[command(name = "api-gateway", about = "Routing gateway for backend services")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("api_gateway={},tower_http=warn", config.observability.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "api-gateway starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        registry_mode = %config.registry.mode,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;

    // File watcher only when a config file was given; otherwise keep the
    // channel alive with defaults and never send.
    let (config_updates, _watcher) = match &args.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            let handle = watcher.run()?;
            (updates, Some(handle))
        }
        None => {
            let (_tx, rx) = tokio::sync::mpsc::unbounded_channel();
            (rx, None)
        }
    };

    let shutdown = Shutdown::new();
    let shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        signals::listen(&shutdown).await;
    });

    let server = GatewayServer::new(config).await?;
    server.run(listener, config_updates, shutdown_rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
