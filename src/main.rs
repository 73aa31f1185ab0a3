//! Query Gateway
//!
//! Routes query traffic across a fleet of query-engine clusters.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌───────────────────────────────────────────────────────┐
//!                     │                    QUERY GATEWAY                       │
//!                     │                                                        │
//!   Admin / proxy     │  ┌─────────┐    ┌──────────┐    ┌──────────────────┐   │
//!   ──────────────────┼─▶│  admin  │───▶│ gateway  │───▶│ routing manager  │   │
//!                     │  │  (axum) │    │ facade   │    │ pick / affinity  │   │
//!                     │  └─────────┘    └────┬─────┘    │ / discovery      │   │
//!                     │                      │          └────────┬─────────┘   │
//!                     │                      ▼                   │ HEAD probes │
//!                     │               ┌─────────────┐            ▼             │
//!                     │               │ groups +    │     ┌────────────┐       │
//!                     │               │ directory   │     │  clusters  │◀──────┼── /v1/query
//!                     │               └──────┬──────┘     └────────────┘       │
//!                     │                      │ refresh          ▲              │
//!                     │                      ▼                  │ GET stats    │
//!                     │               ┌─────────────┐    ┌──────┴───────┐      │
//!                     │               │  snapshot   │    │ stats monitor│      │
//!                     │               └─────────────┘    │ → observers  │      │
//!                     │                                  └──────────────┘      │
//!                     └───────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use query_gateway::admin::setup_admin_router;
use query_gateway::config::{load_config, GatewayConfig};
use query_gateway::lifecycle::{self, shutdown_signal};
use query_gateway::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "query-gateway")]
#[command(about = "High-availability query gateway", long_about = None)]
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

    logging::init_logging(&config.observability);
    tracing::info!("query-gateway v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        routing_groups = config.routing_groups.len(),
        request_timeout_secs = config.listener.request_timeout_secs,
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

    let runtime = lifecycle::start(&config, args.config.as_deref()).await?;

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    let app = setup_admin_router(
        runtime.gateway.clone(),
        Duration::from_secs(config.listener.request_timeout_secs),
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    runtime.shutdown(Duration::from_secs(5)).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
