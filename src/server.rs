//! TCP accept loop.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::storage::Store;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::error;

/// Accepts connections forever, handing each one to its own task.
///
/// Accept failures are logged and the loop keeps going.
pub async fn accept_loop(listener: TcpListener, store: Arc<Store>, stats: Arc<ConnectionStats>) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let evaluator = CommandHandler::new(Arc::clone(&store));
                tokio::spawn(handle_connection(stream, addr, evaluator, Arc::clone(&stats)));
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
