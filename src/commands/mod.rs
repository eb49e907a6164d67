//! Command Evaluation Module
//!
//! The connection handler hands every decoded [`Command`](crate::protocol::Command)
//! to an evaluator through the [`Evaluate`] trait. The evaluator reads or mutates
//! the store and writes the encoded reply into a response buffer.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  RESP Decoder   │  (protocol module)
//! └────────┬────────┘
//!          │ Command
//!          ▼
//! ┌─────────────────┐
//! │ impl Evaluate   │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! [`CommandHandler`] is the built-in evaluator:
//! `PING`, `ECHO`, `SET`, `GET`, `DEL`, `TTL`, `KEYS`.

pub mod handler;

pub use handler::{CommandError, CommandHandler, Evaluate};
