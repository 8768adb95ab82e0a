use anyhow::Result;
use mimalloc::MiMalloc;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

mod api;
mod config;
mod core;
mod models;
mod utils;

use crate::core::{EthService, MetricsCollector};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    init_logging()?;

    // Load configuration
    let config = config::Config::load()?;
    info!(
        event = "config_loaded",
        message = "Configuration loaded",
        port = config.port,
        eth_node_url = %config.eth_node_url
    );

    let metrics = MetricsCollector::new(config.metrics_port)?;
    if let Some(port) = metrics.port() {
        info!(
            event = "metrics_exporter_started",
            message = "Prometheus exporter listening",
            port = port
        );
    }
    let service = Arc::new(EthService::new(&config)?);
    let routes = api::routes(api::Context { service, metrics });

    let (addr, server) = warp::serve(routes).try_bind_with_graceful_shutdown(
        ([0, 0, 0, 0], config.port),
        shutdown_signal(),
    )?;

    info!(
        event = "server_started",
        message = "Server listening",
        address = %addr
    );
    server.await;

    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await
}

/// Resolves once `signal` fires. If the handler could not be installed the
/// server keeps running instead of stopping right after binding.
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!(event = "shutdown", message = "Shutdown signal received"),
        Err(e) => {
            error!(
                event = "signal_handler_error",
                message = "Failed to install Ctrl-C handler",
                error = %e
            );
            std::future::pending::<()>().await;
        }
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .init();
    Ok(())
}
