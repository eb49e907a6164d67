//! Server configuration, parsed from the command line with environment fallbacks.

use crate::storage::ExpiryConfig;
use crate::{DEFAULT_HOST, DEFAULT_PORT};
use clap::Parser;
use std::time::Duration;

/// Server configuration
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "sparkkv",
    version,
    about = "A minimal in-memory key-value server speaking RESP"
)]
pub struct Config {
    /// Host to bind to
    #[arg(long, env = "SPARKKV_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "SPARKKV_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Milliseconds between two sweeps of expired keys
    #[arg(
        long,
        env = "SPARKKV_SWEEP_INTERVAL_MS",
        default_value_t = 1000,
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub sweep_interval_ms: u64,

    /// Log filter used when RUST_LOG is not set (e.g. "info", "sparkkv=debug")
    #[arg(long, env = "SPARKKV_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            sweep_interval_ms: 1000,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn expiry_config(&self) -> ExpiryConfig {
        ExpiryConfig {
            interval: Duration::from_millis(self.sweep_interval_ms),
        }
    }
}
