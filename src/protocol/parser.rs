//! Bounds-Checked RESP Decoder
//!
//! Stateless functions that turn a byte buffer beginning at a type marker into
//! a [`RespValue`] and the number of bytes it occupied.
//!
//! ## How Decoding Works
//!
//! Every decode returns either:
//! - `Ok((value, consumed))` - a complete value was read from the front of the buffer
//! - `Err(ParseError)` - the bytes could not be decoded
//!
//! Every index into the buffer is checked. Input that stops short of a
//! complete value fails with [`ParseError::Truncated`] instead of reading past
//! the end, so a caller that owns a growing buffer can tell "wait for more
//! bytes" apart from "this is garbage" with [`ParseError::is_incomplete`].

use crate::protocol::types::{prefix, RespValue};
use bytes::Bytes;
use thiserror::Error;

/// Errors that can occur while decoding.
///
/// Every variant except [`ParseError::TypeMismatch`] means the input was
/// malformed; see [`ParseError::is_malformed`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The input buffer is empty
    #[error("empty input")]
    EmptyInput,

    /// Unknown type marker byte
    #[error("unknown type prefix: {0:#04x}")]
    UnknownPrefix(u8),

    /// The buffer ended before the value was complete
    #[error("unexpected end of input while reading {0}")]
    Truncated(&'static str),

    /// Invalid or overflowing integer
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// Invalid UTF-8 in text that must be a string
    #[error("invalid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Bulk string length is negative (but not -1 for nil)
    #[error("invalid bulk string length: {0}")]
    InvalidBulkLength(i64),

    /// Array length is negative (but not -1 for nil)
    #[error("invalid array length: {0}")]
    InvalidArrayLength(i64),

    /// The declared bulk string exceeds the size limit
    #[error("message too large: {size} bytes (max: {max})")]
    MessageTooLarge { size: usize, max: usize },

    /// Protocol violation (bad terminator, nesting too deep)
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// The value decoded fine but has the wrong shape
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ParseError {
    /// True for every failure caused by bytes that do not form a valid value.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ParseError::TypeMismatch { .. })
    }

    /// True when the bytes so far are a valid prefix of a value.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, ParseError::Truncated(_))
    }
}

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Maximum size for a single bulk string (512 MB, same as Redis)
pub const MAX_BULK_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array nesting depth (prevent stack overflow)
pub const MAX_NESTING_DEPTH: usize = 32;

/// Upper bound on up-front allocation for a declared array count.
const MAX_PREALLOC: usize = 1024;

/// Decodes one value from the front of `buf`.
///
/// # Example
///
/// ```
/// use sparkkv::protocol::{decode_one, RespValue};
///
/// let (value, consumed) = decode_one(b":42\r\ntrailing").unwrap();
/// assert_eq!(value, RespValue::Integer(42));
/// assert_eq!(consumed, 5);
/// ```
pub fn decode_one(buf: &[u8]) -> ParseResult<(RespValue, usize)> {
    decode_at(buf, 0)
}

/// Decodes one value and discards the consumed length.
pub fn decode(buf: &[u8]) -> ParseResult<RespValue> {
    decode_one(buf).map(|(value, _)| value)
}

/// Decodes a request array and returns its elements as strings.
///
/// Fails with [`ParseError::TypeMismatch`] when the value is not an array or
/// an element is not a string.
pub fn decode_array_string(buf: &[u8]) -> ParseResult<Vec<String>> {
    decode(buf).and_then(into_strings)
}

/// Converts an already decoded array into its string elements.
pub fn into_strings(value: RespValue) -> ParseResult<Vec<String>> {
    let elements = match value {
        RespValue::Array(elements) => elements,
        other => {
            return Err(ParseError::TypeMismatch {
                expected: "array",
                found: other.kind(),
            })
        }
    };

    elements
        .into_iter()
        .map(|element| match element {
            RespValue::BulkString(data) => bytes_to_string(data),
            RespValue::SimpleString(s) => Ok(s),
            other => Err(ParseError::TypeMismatch {
                expected: "string",
                found: other.kind(),
            }),
        })
        .collect()
}

fn bytes_to_string(data: Bytes) -> ParseResult<String> {
    String::from_utf8(data.to_vec()).map_err(|e| ParseError::InvalidUtf8(e.to_string()))
}

fn decode_at(buf: &[u8], depth: usize) -> ParseResult<(RespValue, usize)> {
    let marker = *buf.first().ok_or(ParseError::EmptyInput)?;

    if depth > MAX_NESTING_DEPTH {
        return Err(ParseError::ProtocolError(format!(
            "maximum nesting depth exceeded: {}",
            MAX_NESTING_DEPTH
        )));
    }

    match marker {
        prefix::SIMPLE_STRING => {
            let (text, consumed) = read_text(buf)?;
            Ok((RespValue::SimpleString(text), consumed))
        }
        prefix::ERROR => {
            let (text, consumed) = read_text(buf)?;
            Ok((RespValue::Error(text), consumed))
        }
        prefix::INTEGER => {
            let (line, consumed) = read_line(buf)?;
            Ok((RespValue::Integer(parse_i64(line)?), consumed))
        }
        prefix::BULK_STRING => read_bulk_string(buf),
        prefix::ARRAY => read_array(buf, depth),
        other => Err(ParseError::UnknownPrefix(other)),
    }
}

/// Scans past the marker up to the first `\r`, which must be followed by `\n`.
///
/// Returns the line body and the total bytes consumed, marker and CRLF included.
fn read_line(buf: &[u8]) -> ParseResult<(&[u8], usize)> {
    let body = &buf[1..];
    let cr = body
        .iter()
        .position(|&b| b == b'\r')
        .ok_or(ParseError::Truncated("line"))?;

    match body.get(cr + 1) {
        Some(b'\n') => Ok((&body[..cr], 1 + cr + 2)),
        Some(_) => Err(ParseError::ProtocolError(
            "expected '\\n' after '\\r'".to_string(),
        )),
        None => Err(ParseError::Truncated("line")),
    }
}

fn read_text(buf: &[u8]) -> ParseResult<(String, usize)> {
    let (line, consumed) = read_line(buf)?;
    let text = std::str::from_utf8(line).map_err(|e| ParseError::InvalidUtf8(e.to_string()))?;
    Ok((text.to_string(), consumed))
}

/// Reads a `<marker><length>\r\n` header digit by digit.
///
/// Returns the signed length and the header size.
fn read_length(buf: &[u8]) -> ParseResult<(i64, usize)> {
    let mut pos = 1;
    if buf.get(pos) == Some(&b'-') {
        pos += 1;
    }
    let digits_start = pos;
    while buf.get(pos).is_some_and(u8::is_ascii_digit) {
        pos += 1;
    }

    match &buf[pos..] {
        [] | [b'\r'] => return Err(ParseError::Truncated("length")),
        [b'\r', b'\n', ..] => {}
        _ => {
            return Err(ParseError::ProtocolError(
                "length must be followed by CRLF".to_string(),
            ))
        }
    }
    if pos == digits_start {
        return Err(ParseError::InvalidInteger("missing length".to_string()));
    }

    Ok((parse_i64(&buf[1..pos])?, pos + 2))
}

fn read_bulk_string(buf: &[u8]) -> ParseResult<(RespValue, usize)> {
    let (length, header) = read_length(buf)?;

    if length == -1 {
        return Ok((RespValue::Null, header));
    }
    let length = usize::try_from(length).map_err(|_| ParseError::InvalidBulkLength(length))?;
    if length > MAX_BULK_SIZE {
        return Err(ParseError::MessageTooLarge {
            size: length,
            max: MAX_BULK_SIZE,
        });
    }

    let end = header + length;
    let data = buf
        .get(header..end)
        .ok_or(ParseError::Truncated("bulk string"))?;

    match &buf[end..] {
        [b'\r', b'\n', ..] => {}
        [] | [b'\r'] => return Err(ParseError::Truncated("bulk string")),
        _ => {
            return Err(ParseError::ProtocolError(
                "bulk string missing trailing CRLF".to_string(),
            ))
        }
    }

    Ok((
        RespValue::BulkString(Bytes::copy_from_slice(data)),
        end + 2,
    ))
}

fn read_array(buf: &[u8], depth: usize) -> ParseResult<(RespValue, usize)> {
    let (count, header) = read_length(buf)?;

    if count == -1 {
        return Ok((RespValue::Null, header));
    }
    let count = usize::try_from(count).map_err(|_| ParseError::InvalidArrayLength(count))?;

    let mut elements = Vec::with_capacity(count.min(MAX_PREALLOC));
    let mut consumed = header;

    for _ in 0..count {
        if consumed >= buf.len() {
            return Err(ParseError::Truncated("array"));
        }
        let (value, element_consumed) = decode_at(&buf[consumed..], depth + 1)?;
        elements.push(value);
        consumed += element_consumed;
    }

    Ok((RespValue::Array(elements), consumed))
}

/// Parses an optionally signed decimal integer with overflow checks.
fn parse_i64(digits: &[u8]) -> ParseResult<i64> {
    let invalid = || ParseError::InvalidInteger(String::from_utf8_lossy(digits).into_owned());

    let (negative, magnitude) = match digits.split_first() {
        Some((b'-', rest)) => (true, rest),
        Some((b'+', rest)) => (false, rest),
        _ => (false, digits),
    };
    if magnitude.is_empty() {
        return Err(invalid());
    }

    // Accumulate toward the sign so that i64::MIN does not overflow.
    let mut value: i64 = 0;
    for &b in magnitude {
        if !b.is_ascii_digit() {
            return Err(invalid());
        }
        let digit = i64::from(b - b'0');
        value = value
            .checked_mul(10)
            .and_then(|v| {
                if negative {
                    v.checked_sub(digit)
                } else {
                    v.checked_add(digit)
                }
            })
            .ok_or_else(invalid)?;
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::{encode_integer, encode_string};

    #[test]
    fn test_parse_simple_string() {
        let (value, consumed) = decode_one(b"+OK\r\n").unwrap();
        assert_eq!(value, RespValue::SimpleString("OK".to_string()));
        assert_eq!(consumed, 5);
    }

    #[test]
    fn test_parse_error() {
        let input = b"-ERR unknown command\r\n";
        let (value, consumed) = decode_one(input).unwrap();
        assert_eq!(value, RespValue::Error("ERR unknown command".to_string()));
        assert_eq!(consumed, 22);
    }

    #[test]
    fn test_parse_integer() {
        let (value, consumed) = decode_one(b":1000\r\n").unwrap();
        assert_eq!(value, RespValue::Integer(1000));
        assert_eq!(consumed, 7);

        assert_eq!(decode(b":-42\r\n").unwrap(), RespValue::Integer(-42));
        assert_eq!(decode(b":+7\r\n").unwrap(), RespValue::Integer(7));
    }

    #[test]
    fn test_integer_full_range_roundtrip() {
        for n in [0, 1, -1, 42, i64::MAX, i64::MIN, i64::MIN + 1] {
            assert_eq!(decode(&encode_integer(n)).unwrap(), RespValue::Integer(n));
        }
    }

    #[test]
    fn test_integer_overflow_is_rejected() {
        assert!(matches!(
            decode(b":9223372036854775808\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert!(matches!(
            decode(b":-9223372036854775809\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
    }

    #[test]
    fn test_parse_invalid_integer() {
        assert!(matches!(
            decode(b":not_a_number\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert!(matches!(decode(b":\r\n"), Err(ParseError::InvalidInteger(_))));
        assert!(matches!(decode(b":-\r\n"), Err(ParseError::InvalidInteger(_))));
    }

    #[test]
    fn test_parse_bulk_string() {
        let (value, consumed) = decode_one(b"$5\r\nhello\r\n").unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::from("hello")));
        assert_eq!(consumed, 11);
    }

    #[test]
    fn test_parse_empty_bulk_string() {
        let (value, consumed) = decode_one(b"$0\r\n\r\n").unwrap();
        assert_eq!(value, RespValue::BulkString(Bytes::new()));
        assert_eq!(consumed, 6);
    }

    #[test]
    fn test_parse_nil() {
        assert_eq!(decode_one(b"$-1\r\n").unwrap(), (RespValue::Null, 5));
        assert_eq!(decode_one(b"*-1\r\n").unwrap(), (RespValue::Null, 5));
    }

    #[test]
    fn test_bulk_length_beyond_buffer_is_truncated() {
        let err = decode(b"$10\r\nhello\r\n").unwrap_err();
        assert_eq!(err, ParseError::Truncated("bulk string"));
        assert!(err.is_malformed());
        assert!(err.is_incomplete());

        assert!(decode(b"$5\r\nhello").unwrap_err().is_incomplete());
        assert!(decode(b"$5\r\nhello\r").unwrap_err().is_incomplete());
    }

    #[test]
    fn test_bulk_string_bad_terminator() {
        assert!(matches!(
            decode(b"$3\r\nhelloXX"),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_bulk_length_limits() {
        assert_eq!(
            decode(b"$-2\r\n").unwrap_err(),
            ParseError::InvalidBulkLength(-2)
        );
        assert!(matches!(
            decode(b"$999999999999\r\n"),
            Err(ParseError::MessageTooLarge { .. })
        ));
    }

    #[test]
    fn test_unterminated_length_never_reads_past_end() {
        assert_eq!(decode(b"$12345").unwrap_err(), ParseError::Truncated("length"));
        assert_eq!(decode(b"*").unwrap_err(), ParseError::Truncated("length"));
        assert_eq!(decode(b"$3\r").unwrap_err(), ParseError::Truncated("length"));
        assert!(matches!(decode(b"$3x\r\n"), Err(ParseError::ProtocolError(_))));
        assert!(matches!(decode(b"$\r\n"), Err(ParseError::InvalidInteger(_))));
    }

    #[test]
    fn test_unterminated_simple_string() {
        assert_eq!(decode(b"+OK").unwrap_err(), ParseError::Truncated("line"));
        assert_eq!(decode(b"+OK\r").unwrap_err(), ParseError::Truncated("line"));
        assert_eq!(decode(b"+").unwrap_err(), ParseError::Truncated("line"));
        assert!(matches!(decode(b"+OK\rX"), Err(ParseError::ProtocolError(_))));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(decode(b"").unwrap_err(), ParseError::EmptyInput);
    }

    #[test]
    fn test_unknown_prefix_is_an_error() {
        let err = decode_one(b"@invalid\r\n").unwrap_err();
        assert_eq!(err, ParseError::UnknownPrefix(b'@'));
        assert!(err.is_malformed());
        assert!(!err.is_incomplete());
    }

    #[test]
    fn test_parse_array_consumed_is_header_plus_elements() {
        let input = b"*3\r\n+OK\r\n:100\r\n$5\r\nhello\r\nEXTRA";
        let (value, consumed) = decode_one(input).unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::SimpleString("OK".to_string()),
                RespValue::Integer(100),
                RespValue::BulkString(Bytes::from("hello")),
            ])
        );
        // "*3\r\n" + "+OK\r\n" + ":100\r\n" + "$5\r\nhello\r\n"
        assert_eq!(consumed, 4 + 5 + 6 + 11);
    }

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(decode_one(b"*0\r\n").unwrap(), (RespValue::Array(vec![]), 4));
    }

    #[test]
    fn test_parse_nested_array() {
        let input = b"*2\r\n:1\r\n*2\r\n:2\r\n:3\r\n";
        let (value, consumed) = decode_one(input).unwrap();
        assert_eq!(
            value,
            RespValue::Array(vec![
                RespValue::Integer(1),
                RespValue::Array(vec![RespValue::Integer(2), RespValue::Integer(3)]),
            ])
        );
        assert_eq!(consumed, input.len());
    }

    #[test]
    fn test_array_propagates_element_failure() {
        assert!(matches!(
            decode(b"*2\r\n:1\r\n:x\r\n"),
            Err(ParseError::InvalidInteger(_))
        ));
        assert_eq!(
            decode(b"*2\r\n$3\r\nGET\r\n").unwrap_err(),
            ParseError::Truncated("array")
        );
    }

    #[test]
    fn test_huge_array_count_does_not_preallocate() {
        assert_eq!(
            decode(b"*4294967295\r\n:1\r\n").unwrap_err(),
            ParseError::Truncated("array")
        );
    }

    #[test]
    fn test_nesting_depth_limit() {
        let input = "*1\r\n".repeat(MAX_NESTING_DEPTH + 2);
        assert!(matches!(
            decode(input.as_bytes()),
            Err(ParseError::ProtocolError(_))
        ));
    }

    #[test]
    fn test_string_roundtrip() {
        for s in ["", "hello", "with space", "héllo wörld", "日本語"] {
            assert_eq!(
                decode(&encode_string(s, false)).unwrap(),
                RespValue::BulkString(Bytes::from(s.to_string()))
            );
            assert_eq!(
                decode(&encode_string(s, true)).unwrap(),
                RespValue::SimpleString(s.to_string())
            );
        }
    }

    #[test]
    fn test_binary_safe_bulk_string() {
        let input = b"$5\r\nhel\x00o\r\n";
        assert_eq!(
            decode(input).unwrap(),
            RespValue::BulkString(Bytes::from(&b"hel\x00o"[..]))
        );
        // CR inside a bulk payload is data, not a terminator
        assert_eq!(
            decode(b"$4\r\na\r\nb\r\n").unwrap(),
            RespValue::BulkString(Bytes::from("a\r\nb"))
        );
    }

    #[test]
    fn test_decode_array_string() {
        let tokens = decode_array_string(b"*3\r\n$3\r\nSET\r\n$1\r\nk\r\n+v\r\n").unwrap();
        assert_eq!(tokens, vec!["SET", "k", "v"]);
    }

    #[test]
    fn test_decode_array_string_type_mismatch() {
        let err = decode_array_string(b"*2\r\n$3\r\nGET\r\n:1\r\n").unwrap_err();
        assert_eq!(
            err,
            ParseError::TypeMismatch {
                expected: "string",
                found: "integer"
            }
        );
        assert!(!err.is_malformed());

        assert_eq!(
            decode_array_string(b"+PING\r\n").unwrap_err(),
            ParseError::TypeMismatch {
                expected: "array",
                found: "simple string"
            }
        );
    }

    #[test]
    fn test_decode_array_string_rejects_invalid_utf8() {
        assert!(matches!(
            decode_array_string(b"*1\r\n$2\r\n\xff\xfe\r\n"),
            Err(ParseError::InvalidUtf8(_))
        ));
    }
}
