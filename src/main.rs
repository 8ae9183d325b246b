//! Quota Gateway
//!
//! # Architecture Overview
//!
//! ```text
//!                   ┌────────────────────────────────────────────────────┐
//!                   │                   QUOTA GATEWAY                     │
//!  Client Request   │  ┌─────────┐   ┌───────────┐   ┌───────────────┐   │
//!  ─────────────────┼─▶│  http   │──▶│ security  │──▶│   security    │   │
//!                   │  │ server  │   │   auth    │   │    quota      │   │
//!                   │  └────┬────┘   └─────┬─────┘   └───────┬───────┘   │
//!                   │       │              │                 │           │
//!                   │       ▼              ▼                 ▼           │
//!                   │  ┌──────────────────────────┐    ┌──────────┐      │
//!                   │  │ identity (store, regis-  │    │  items   │      │
//!                   │  │ tration, recharge)       │    │  CRUD    │      │
//!                   │  └──────────────────────────┘    └──────────┘      │
//!                   │                                                     │
//!                   │  config · observability · lifecycle · admin         │
//!                   └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use quota_gateway::config::loader::load_config;
use quota_gateway::config::watcher::ConfigWatcher;
use quota_gateway::config::GatewayConfig;
use quota_gateway::lifecycle::{wait_for_shutdown, Shutdown};
use quota_gateway::observability::{logging, metrics};
use quota_gateway::GatewayServer;

#[derive(Parser)]
#[command(name = "quota-gateway")]
#[command(about = "Token-issuing API gateway with per-token request quotas", long_about = None)]
struct Args {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Reload the quota policy when the config file changes.
    #[arg(long, requires = "config")]
    watch: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability);
    tracing::info!("quota-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        initial_requests = config.quota.initial_requests,
        default_recharge = config.quota.default_recharge,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let (_watcher, config_updates) = match (&args.config, args.watch) {
        (Some(path), true) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        _ => (None, mpsc::unbounded_channel().1),
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    let server = GatewayServer::new(config);

    tokio::spawn(async move {
        wait_for_shutdown().await;
        shutdown.trigger();
    });

    server.run(listener, config_updates, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
