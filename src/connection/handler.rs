//! Connection Handler Module
//!
//! This module handles individual client connections.
//! Each client gets its own handler task that runs in a loop,
//! reading commands and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned on its own task
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │  Read bytes from socket      │
//!    │  Decode command              │◄──┐
//!    │  Evaluate command            │   │
//!    │  Send reply or -error        │───┘
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / I/O error: only this task ends
//! ```
//!
//! ## Buffer Management
//!
//! TCP is a stream protocol, so a read may deliver half a command. Bytes
//! accumulate in a `BytesMut` until the decoder stops reporting
//! [`ParseError::Truncated`](crate::protocol::ParseError::Truncated).
//! Any other decode failure is answered with an error reply and the buffered
//! bytes are dropped; the connection stays open.

use crate::commands::Evaluate;
use crate::protocol::parser::MAX_BULK_SIZE;
use crate::protocol::{decode_command, Command, RespValue};
use bytes::{Buf, BytesMut};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::{debug, info, trace, warn};

/// Default cap on buffered request bytes: the largest bulk string the
/// decoder accepts plus room for the surrounding headers and arguments.
pub const MAX_BUFFER_SIZE: usize = MAX_BULK_SIZE + 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a closed connection and returns the number still active.
    pub fn connection_closed(&self) -> u64 {
        self.active_connections
            .fetch_sub(1, Ordering::Relaxed)
            .saturating_sub(1)
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Generic over the byte stream so it runs the same on a `TcpStream` and on
/// an in-memory mock.
pub struct ConnectionHandler<S, E> {
    /// The client stream
    stream: BufWriter<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// Buffer the evaluator writes the reply into
    reply: BytesMut,

    /// Cap on buffered, not yet decoded bytes
    max_buffer: usize,

    /// The command evaluator
    evaluator: E,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,
}

impl<S, E> ConnectionHandler<S, E>
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: Evaluate,
{
    /// Creates a handler and counts the connection as active.
    pub fn new(stream: S, addr: SocketAddr, evaluator: E, stats: Arc<ConnectionStats>) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            reply: BytesMut::new(),
            max_buffer: MAX_BUFFER_SIZE,
            evaluator,
            stats,
        }
    }

    /// Overrides the cap on buffered request bytes.
    pub fn with_max_buffer_size(mut self, max_buffer: usize) -> Self {
        self.max_buffer = max_buffer;
        self
    }

    /// Runs the read-evaluate-reply loop until the client goes away.
    ///
    /// A clean disconnect returns `Ok(())`.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        let active = self.stats.active_connections.load(Ordering::Relaxed);
        info!(client = %self.addr, concurrent_clients = active, "Client connected");

        let result = match self.main_loop().await {
            Err(ConnectionError::ClientDisconnected) => Ok(()),
            other => other,
        };

        let active = self.stats.connection_closed();
        match &result {
            Ok(()) => {
                info!(client = %self.addr, concurrent_clients = active, "Client disconnected")
            }
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, concurrent_clients = active, "Connection reset by client")
            }
            Err(e) => {
                warn!(client = %self.addr, concurrent_clients = active, error = %e, "Connection error")
            }
        }

        result
    }

    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            while let Some(command) = self.next_command().await? {
                self.dispatch(&command).await?;
            }

            self.read_more_data().await?;
        }
    }

    /// Decodes the next complete command in the buffer.
    ///
    /// Returns `Ok(None)` when more bytes are needed. A malformed request is
    /// answered with an error reply right here and its bytes are discarded.
    async fn next_command(&mut self) -> Result<Option<Command>, ConnectionError> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        match decode_command(&self.buffer) {
            Ok((command, consumed)) => {
                self.buffer.advance(consumed);
                trace!(
                    client = %self.addr,
                    command = %command.name,
                    consumed = consumed,
                    remaining = self.buffer.len(),
                    "Parsed command"
                );
                Ok(Some(command))
            }
            Err(e) if e.is_incomplete() => {
                trace!(
                    client = %self.addr,
                    buffered = self.buffer.len(),
                    "Incomplete command, need more data"
                );
                Ok(None)
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Rejected request");
                self.buffer.clear();
                self.send(&RespValue::error(format!("ERR {}", e)).serialize())
                    .await?;
                Ok(None)
            }
        }
    }

    /// Evaluates one command and writes its reply, or its error.
    async fn dispatch(&mut self, command: &Command) -> Result<(), ConnectionError> {
        self.reply.clear();
        if let Err(e) = self.evaluator.evaluate(command, &mut self.reply) {
            debug!(client = %self.addr, command = %command.name, error = %e, "Command failed");
            self.reply.clear();
            RespValue::error(e.to_string()).serialize_into(&mut self.reply);
        }
        self.stats.command_processed();

        let reply = self.reply.split().freeze();
        self.send(&reply).await
    }

    /// Reads more data from the socket into the buffer.
    async fn read_more_data(&mut self) -> Result<(), ConnectionError> {
        if self.buffer.len() >= self.max_buffer {
            warn!(client = %self.addr, buffered = self.buffer.len(), "Request too large");
            let message = format!("ERR request exceeds {} bytes", self.max_buffer);
            self.send(&RespValue::error(message).serialize()).await?;
            return Err(ConnectionError::BufferFull);
        }

        if self.buffer.capacity() - self.buffer.len() < 1024 {
            self.buffer.reserve(INITIAL_BUFFER_SIZE);
        }

        let n = self.stream.get_mut().read_buf(&mut self.buffer).await?;

        if n == 0 {
            return if self.buffer.is_empty() {
                Err(ConnectionError::ClientDisconnected)
            } else {
                Err(ConnectionError::UnexpectedEof)
            };
        }

        self.stats.bytes_read(n);
        trace!(client = %self.addr, bytes = n, "Read data");

        Ok(())
    }

    async fn send(&mut self, bytes: &[u8]) -> Result<(), ConnectionError> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(client = %self.addr, bytes = bytes.len(), "Sent response");
        Ok(())
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Client disconnected normally
    #[error("Client disconnected")]
    ClientDisconnected,

    /// Unexpected end of stream (partial command)
    #[error("Unexpected end of stream")]
    UnexpectedEof,

    /// Buffer size limit exceeded
    #[error("Buffer size limit exceeded")]
    BufferFull,
}

/// Builds a handler for an accepted connection and returns the future that
/// drives it to completion.
///
/// The connection counts as active as soon as this is called, before the
/// future is first polled. Errors are logged inside [`ConnectionHandler::run`]
/// and never escape to other connections.
pub fn handle_connection<S, E>(
    stream: S,
    addr: SocketAddr,
    evaluator: E,
    stats: Arc<ConnectionStats>,
) -> impl Future<Output = ()>
where
    S: AsyncRead + AsyncWrite + Unpin,
    E: Evaluate,
{
    let handler = ConnectionHandler::new(stream, addr, evaluator, stats);
    async move {
        let _ = handler.run().await;
    }
}
