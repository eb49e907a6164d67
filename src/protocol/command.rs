//! Client requests decoded into commands.

use crate::protocol::parser::{decode_one, into_strings, ParseError, ParseResult};
use crate::protocol::types::RespValue;

/// A decoded client request.
///
/// The name is upper-cased so dispatch is case-insensitive; arguments keep
/// the case the client sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new(name: &str, args: Vec<String>) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            args,
        }
    }

    /// Builds a command from request tokens. The first token is the name.
    pub fn from_tokens(tokens: Vec<String>) -> ParseResult<Self> {
        let mut tokens = tokens.into_iter();
        let name = tokens.next().ok_or(ParseError::TypeMismatch {
            expected: "non-empty array",
            found: "empty array",
        })?;
        Ok(Self::new(&name, tokens.collect()))
    }
}

impl TryFrom<RespValue> for Command {
    type Error = ParseError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        into_strings(value).and_then(Command::from_tokens)
    }
}

/// Decodes one request from the front of `buf`.
///
/// Returns the command and the number of bytes it occupied.
///
/// ```
/// use sparkkv::protocol::decode_command;
///
/// let (cmd, consumed) = decode_command(b"*2\r\n$3\r\nget\r\n$1\r\nx\r\n").unwrap();
/// assert_eq!(cmd.name, "GET");
/// assert_eq!(cmd.args, vec!["x".to_string()]);
/// assert_eq!(consumed, 20);
/// ```
pub fn decode_command(buf: &[u8]) -> ParseResult<(Command, usize)> {
    let (value, consumed) = decode_one(buf)?;
    Ok((Command::try_from(value)?, consumed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_request() {
        let (cmd, consumed) = decode_command(b"*2\r\n$3\r\nGET\r\n$1\r\nx\r\n").unwrap();
        assert_eq!(cmd, Command::new("GET", vec!["x".to_string()]));
        assert_eq!(consumed, 20);
    }

    #[test]
    fn test_only_name_is_normalized() {
        let (cmd, _) =
            decode_command(b"*3\r\n$3\r\nsEt\r\n$3\r\nKey\r\n$5\r\nVaLuE\r\n").unwrap();
        assert_eq!(cmd.name, "SET");
        assert_eq!(cmd.args, vec!["Key", "VaLuE"]);
    }

    #[test]
    fn test_empty_request_is_rejected() {
        assert!(matches!(
            decode_command(b"*0\r\n"),
            Err(ParseError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_non_string_element_is_rejected() {
        assert_eq!(
            decode_command(b"*2\r\n$3\r\nGET\r\n*0\r\n").unwrap_err(),
            ParseError::TypeMismatch {
                expected: "string",
                found: "array"
            }
        );
    }
}
