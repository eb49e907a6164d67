//! RESP Protocol Implementation
//!
//! This module converts between wire bytes and typed values.
//!
//! ## Modules
//!
//! - `types`: The `RespValue` enum and encoding
//! - `parser`: Bounds-checked decoder for incoming bytes
//! - `command`: Turns a decoded request array into a `Command`
//!
//! ## Example
//!
//! ```
//! use sparkkv::protocol::{decode_command, encode_string, RespValue};
//!
//! // Decoding a request
//! let data = b"*2\r\n$3\r\nGET\r\n$4\r\nname\r\n";
//! let (command, consumed) = decode_command(data).unwrap();
//! assert_eq!(command.name, "GET");
//! assert_eq!(consumed, data.len());
//!
//! // Encoding replies
//! assert_eq!(encode_string("Ariz", false), b"$4\r\nAriz\r\n");
//! assert_eq!(RespValue::ok().serialize(), b"+OK\r\n");
//! ```

pub mod command;
pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use command::{decode_command, Command};
pub use parser::{decode, decode_array_string, decode_one, ParseError, ParseResult};
pub use types::{encode_integer, encode_string, RespValue, NIL};
