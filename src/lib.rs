//! # SparkKV - A Minimal In-Memory Key-Value Server
//!
//! SparkKV is a single-node key-value server that speaks the RESP wire
//! protocol. Keys may carry an expiry deadline; expired keys disappear on
//! read and are reclaimed in the background.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                              SparkKV                                │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ Accept Loop │───>│ Connection  │───>│  Evaluator  │              │
//! │  │ (1 task per │    │  Handler    │    │ (Evaluate)  │              │
//! │  │  client)    │    └──────┬──────┘    └──────┬──────┘              │
//! │  └─────────────┘           │                  │                     │
//! │                            ▼                  ▼                     │
//! │                     ┌─────────────┐    ┌─────────────────────────┐  │
//! │                     │    RESP     │    │          Store          │  │
//! │                     │   Codec     │    │ RwLock<HashMap<..>>     │  │
//! │                     └─────────────┘    └────────────▲────────────┘  │
//! │                                                     │               │
//! │                                        ┌────────────┴────────────┐  │
//! │                                        │      ExpirySweeper      │  │
//! │                                        │ (Background Tokio Task) │  │
//! │                                        └─────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use sparkkv::server::accept_loop;
//! use sparkkv::storage::{start_expiry_sweeper, Store};
//! use sparkkv::connection::ConnectionStats;
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(Store::new());
//!     let sweeper = start_expiry_sweeper(Arc::clone(&store));
//!     let stats = Arc::new(ConnectionStats::new());
//!
//!     let listener = TcpListener::bind("127.0.0.1:6379").await.unwrap();
//!     accept_loop(listener, store, stats).await;
//!
//!     sweeper.stop();
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: RESP values, decoder, encoder and `Command`
//! - [`storage`]: Thread-safe store with expiry and the background sweeper
//! - [`commands`]: The `Evaluate` seam and the built-in evaluator
//! - [`connection`]: Per-client read/decode/evaluate/reply loop
//! - [`server`]: TCP accept loop
//! - [`config`]: Command-line and environment configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, Evaluate};
pub use config::Config;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{Command, ParseError, RespValue};
pub use storage::{start_expiry_sweeper, ExpiryConfig, ExpirySweeper, Store, StoredObject};

/// The default port SparkKV listens on (same as Redis)
pub const DEFAULT_PORT: u16 = 6379;

/// The default host SparkKV binds to
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Version of SparkKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
