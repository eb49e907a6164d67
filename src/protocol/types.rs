//! RESP Wire Values and Encoding
//!
//! This module defines the tagged value type exchanged with clients and the
//! encoding rules that turn values back into wire bytes.
//!
//! ## Protocol Format
//!
//! Each value starts with a type marker byte:
//! - `+` Simple String
//! - `-` Error
//! - `:` Integer
//! - `$` Bulk String
//! - `*` Array
//!
//! All lines are terminated with CRLF (`\r\n`).
//!
//! ## Examples
//!
//! Simple String: `+OK\r\n`
//! Error: `-ERR unknown command\r\n`
//! Integer: `:1000\r\n`
//! Bulk String: `$5\r\nhello\r\n`
//! Array: `*2\r\n$3\r\nGET\r\n$1\r\nx\r\n`
//! Nil: `$-1\r\n`

use bytes::{BufMut, Bytes};
use std::fmt;

/// The CRLF terminator used in RESP protocol
pub const CRLF: &[u8] = b"\r\n";

/// The fixed wire form of an absent value.
pub const NIL: &[u8] = b"$-1\r\n";

/// RESP protocol type markers
pub mod prefix {
    pub const SIMPLE_STRING: u8 = b'+';
    pub const ERROR: u8 = b'-';
    pub const INTEGER: u8 = b':';
    pub const BULK_STRING: u8 = b'$';
    pub const ARRAY: u8 = b'*';
}

/// One decoded protocol unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Short text with no embedded line terminator.
    /// Format: `+<string>\r\n`
    SimpleString(String),

    /// Same shape as a simple string, but signals a failure.
    /// Format: `-<error message>\r\n`
    Error(String),

    /// 64-bit signed integer.
    /// Format: `:<integer>\r\n`
    Integer(i64),

    /// Length-prefixed, binary-safe string. The wire length is the byte length.
    /// Format: `$<length>\r\n<data>\r\n`
    BulkString(Bytes),

    /// Explicit absence. Encodes as `$-1\r\n`.
    Null,

    /// Ordered, possibly nested sequence of values.
    /// Format: `*<count>\r\n<element1><element2>...`
    Array(Vec<RespValue>),
}

impl RespValue {
    pub fn simple_string(s: impl Into<String>) -> Self {
        RespValue::SimpleString(s.into())
    }

    /// Creates a new error response.
    ///
    /// # Example
    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// let err = RespValue::error("ERR unknown command 'FOO'");
    /// assert!(err.is_error());
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        RespValue::Error(s.into())
    }

    pub fn integer(n: i64) -> Self {
        RespValue::Integer(n)
    }

    /// Creates a new bulk string response.
    ///
    /// # Example
    /// ```
    /// use sparkkv::protocol::types::RespValue;
    /// use bytes::Bytes;
    /// let bulk = RespValue::bulk_string(Bytes::from("hello"));
    /// assert_eq!(bulk.serialize(), b"$5\r\nhello\r\n");
    /// ```
    pub fn bulk_string(data: impl Into<Bytes>) -> Self {
        RespValue::BulkString(data.into())
    }

    pub fn null() -> Self {
        RespValue::Null
    }

    pub fn array(values: Vec<RespValue>) -> Self {
        RespValue::Array(values)
    }

    /// Common response for successful operations
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    /// Serializes the value to its wire form.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the value into any growable byte sink (`Vec<u8>`, `BytesMut`).
    pub fn serialize_into<B: BufMut>(&self, buf: &mut B) {
        match self {
            RespValue::SimpleString(s) => write_text_line(buf, prefix::SIMPLE_STRING, s),
            RespValue::Error(s) => write_text_line(buf, prefix::ERROR, s),
            RespValue::Integer(n) => write_line(buf, prefix::INTEGER, n.to_string().as_bytes()),
            RespValue::BulkString(data) => write_bulk(buf, data),
            RespValue::Null => buf.put_slice(NIL),
            RespValue::Array(values) => {
                write_line(buf, prefix::ARRAY, values.len().to_string().as_bytes());
                for value in values {
                    value.serialize_into(buf);
                }
            }
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RespValue::Null)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, RespValue::Error(_))
    }

    /// Attempts to extract the inner string from SimpleString or BulkString.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            RespValue::SimpleString(s) => Some(s),
            RespValue::BulkString(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            RespValue::Integer(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[RespValue]> {
        match self {
            RespValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Short name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            RespValue::SimpleString(_) => "simple string",
            RespValue::Error(_) => "error",
            RespValue::Integer(_) => "integer",
            RespValue::BulkString(_) => "bulk string",
            RespValue::Null => "nil",
            RespValue::Array(_) => "array",
        }
    }
}

/// A missing payload falls back to the nil wire form.
impl From<Option<Bytes>> for RespValue {
    fn from(value: Option<Bytes>) -> Self {
        match value {
            Some(data) => RespValue::BulkString(data),
            None => RespValue::Null,
        }
    }
}

impl From<i64> for RespValue {
    fn from(n: i64) -> Self {
        RespValue::Integer(n)
    }
}

/// Encodes text either as a simple string (`simple == true`) or as a bulk
/// string whose length field is the UTF-8 byte length.
///
/// ```
/// use sparkkv::protocol::encode_string;
/// assert_eq!(encode_string("hello", false), b"$5\r\nhello\r\n");
/// assert_eq!(encode_string("OK", true), b"+OK\r\n");
/// ```
pub fn encode_string(s: &str, simple: bool) -> Vec<u8> {
    let mut buf = Vec::with_capacity(s.len() + 16);
    if simple {
        write_text_line(&mut buf, prefix::SIMPLE_STRING, s);
    } else {
        write_bulk(&mut buf, s.as_bytes());
    }
    buf
}

/// Encodes a signed 64-bit integer: `:<n>\r\n`.
pub fn encode_integer(n: i64) -> Vec<u8> {
    RespValue::Integer(n).serialize()
}

#[inline]
fn write_line<B: BufMut>(buf: &mut B, marker: u8, body: &[u8]) {
    buf.put_u8(marker);
    buf.put_slice(body);
    buf.put_slice(CRLF);
}

/// Writes a simple string or error line. Embedded `\r` and `\n` become
/// spaces so the value stays a single line on the wire.
fn write_text_line<B: BufMut>(buf: &mut B, marker: u8, text: &str) {
    buf.put_u8(marker);
    for &b in text.as_bytes() {
        buf.put_u8(if b == b'\r' || b == b'\n' { b' ' } else { b });
    }
    buf.put_slice(CRLF);
}

#[inline]
fn write_bulk<B: BufMut>(buf: &mut B, data: &[u8]) {
    write_line(buf, prefix::BULK_STRING, data.len().to_string().as_bytes());
    buf.put_slice(data);
    buf.put_slice(CRLF);
}

impl fmt::Display for RespValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RespValue::SimpleString(s) => write!(f, "\"{}\"", s),
            RespValue::Error(s) => write!(f, "(error) {}", s),
            RespValue::Integer(n) => write!(f, "(integer) {}", n),
            RespValue::BulkString(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            RespValue::Null => write!(f, "(nil)"),
            RespValue::Array(values) => {
                if values.is_empty() {
                    write!(f, "(empty array)")
                } else {
                    writeln!(f)?;
                    for (i, v) in values.iter().enumerate() {
                        writeln!(f, "{}) {}", i + 1, v)?;
                    }
                    Ok(())
                }
            }
        }
    }
}
