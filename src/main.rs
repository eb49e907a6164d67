//! SparkKV server entry point.
//!
//! Sets up logging, the store, the expiry sweeper and the TCP listener, then
//! serves clients until Ctrl+C.

use clap::Parser;
use sparkkv::config::Config;
use sparkkv::connection::ConnectionStats;
use sparkkv::server::accept_loop;
use sparkkv::storage::{ExpirySweeper, Store};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(version = sparkkv::VERSION, "Starting SparkKV");

    // Shared across all connections
    let store = Arc::new(Store::new());
    let sweeper = ExpirySweeper::start(Arc::clone(&store), config.expiry_config());
    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", listener.local_addr()?);

    let shutdown = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        info!("Shutdown signal received, stopping server...");
    };

    tokio::select! {
        _ = accept_loop(listener, Arc::clone(&store), stats) => {}
        _ = shutdown => {}
    }

    sweeper.stop();
    info!(keys = store.len(), "Server shutdown complete");
    Ok(())
}
