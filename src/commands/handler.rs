//! Default Command Evaluator
//!
//! Executes decoded commands against the [`Store`] and writes the encoded
//! reply into the connection's response buffer.
//!
//! ## Supported Commands
//!
//! - `PING [message]` - Test connection
//! - `ECHO message` - Echo message
//! - `SET key value [EX seconds | PX milliseconds]` - Set a key
//! - `GET key` - Get a key's value
//! - `DEL key [key ...]` - Delete keys
//! - `TTL key` - Remaining time to live in seconds
//! - `KEYS pattern` - Find keys by glob pattern

use crate::protocol::{encode_integer, encode_string, Command, RespValue};
use crate::storage::{Store, StoredObject};
use bytes::{BufMut, Bytes, BytesMut};
use std::sync::Arc;
use thiserror::Error;

/// Errors an evaluator reports back to the client as `-<message>\r\n`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("ERR unknown command '{0}'")]
    UnknownCommand(String),

    #[error("ERR wrong number of arguments for '{0}' command")]
    WrongArity(String),

    #[error("ERR syntax error")]
    Syntax,

    #[error("ERR value is not an integer or out of range")]
    NotAnInteger,

    #[error("ERR invalid expire time in '{0}' command")]
    InvalidExpireTime(String),
}

/// Interprets a [`Command`] and writes the encoded reply into `out`.
///
/// On `Err`, anything already written to `out` is discarded by the caller and
/// the error is sent to the client instead.
pub trait Evaluate {
    fn evaluate(&self, command: &Command, out: &mut BytesMut) -> Result<(), CommandError>;
}

/// Evaluates the built-in command set against a shared store.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    store: Arc<Store>,
}

impl CommandHandler {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    fn cmd_ping(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        match args {
            [] => out.put_slice(&encode_string("PONG", true)),
            [message] => out.put_slice(&encode_string(message, false)),
            _ => return Err(CommandError::WrongArity("ping".into())),
        }
        Ok(())
    }

    fn cmd_echo(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        let [message] = args else {
            return Err(CommandError::WrongArity("echo".into()));
        };
        out.put_slice(&encode_string(message, false));
        Ok(())
    }

    /// `SET key value [EX seconds | PX milliseconds]`
    fn cmd_set(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        let (key, value, options) = match args {
            [key, value, options @ ..] => (key, value, options),
            _ => return Err(CommandError::WrongArity("set".into())),
        };

        let duration_ms = match options {
            [] => 0,
            [unit, amount] => {
                let amount: i64 = amount.parse().map_err(|_| CommandError::NotAnInteger)?;
                if amount <= 0 {
                    return Err(CommandError::InvalidExpireTime("set".into()));
                }
                match unit.to_ascii_uppercase().as_str() {
                    "EX" => amount
                        .checked_mul(1000)
                        .ok_or_else(|| CommandError::InvalidExpireTime("set".into()))?,
                    "PX" => amount,
                    _ => return Err(CommandError::Syntax),
                }
            }
            _ => return Err(CommandError::Syntax),
        };

        self.store.put(
            key.clone(),
            StoredObject::new(Bytes::from(value.clone()), duration_ms),
        );
        out.put_slice(&encode_string("OK", true));
        Ok(())
    }

    fn cmd_get(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        let [key] = args else {
            return Err(CommandError::WrongArity("get".into()));
        };
        RespValue::from(self.store.get(key).map(|object| object.value)).serialize_into(out);
        Ok(())
    }

    fn cmd_del(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        if args.is_empty() {
            return Err(CommandError::WrongArity("del".into()));
        }
        let deleted = args.iter().filter(|key| self.store.del(key)).count();
        out.put_slice(&encode_integer(deleted as i64));
        Ok(())
    }

    /// Replies -2 for a missing key, -1 for a key without expiry, otherwise
    /// the remaining seconds rounded up.
    fn cmd_ttl(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        let [key] = args else {
            return Err(CommandError::WrongArity("ttl".into()));
        };
        let ttl = match self.store.get(key) {
            None => -2,
            Some(object) => match object.ttl() {
                None => -1,
                Some(remaining) => remaining.as_millis().div_ceil(1000) as i64,
            },
        };
        out.put_slice(&encode_integer(ttl));
        Ok(())
    }

    fn cmd_keys(&self, args: &[String], out: &mut BytesMut) -> Result<(), CommandError> {
        let [pattern] = args else {
            return Err(CommandError::WrongArity("keys".into()));
        };
        let pattern = GlobPattern::new(pattern);

        let mut keys: Vec<String> = self
            .store
            .list_keys()
            .into_iter()
            .filter(|key| pattern.matches(key))
            .collect();
        keys.sort_unstable();

        RespValue::array(
            keys.into_iter()
                .map(RespValue::bulk_string)
                .collect(),
        )
        .serialize_into(out);
        Ok(())
    }
}

impl Evaluate for CommandHandler {
    fn evaluate(&self, command: &Command, out: &mut BytesMut) -> Result<(), CommandError> {
        let args = command.args.as_slice();
        match command.name.as_str() {
            "PING" => self.cmd_ping(args, out),
            "ECHO" => self.cmd_echo(args, out),
            "SET" => self.cmd_set(args, out),
            "GET" => self.cmd_get(args, out),
            "DEL" => self.cmd_del(args, out),
            "TTL" => self.cmd_ttl(args, out),
            "KEYS" => self.cmd_keys(args, out),
            other => Err(CommandError::UnknownCommand(other.to_string())),
        }
    }
}

/// Redis-style glob matching: `*`, `?`, `[abc]`, `[^a]`, `[a-z]` and `\` escapes.
struct GlobPattern<'a> {
    pattern: &'a [u8],
}

impl<'a> GlobPattern<'a> {
    fn new(pattern: &'a str) -> Self {
        Self {
            pattern: pattern.as_bytes(),
        }
    }

    fn matches(&self, text: &str) -> bool {
        glob_match(self.pattern, text.as_bytes())
    }
}

fn glob_match(pattern: &[u8], text: &[u8]) -> bool {
    let (mut p, mut t) = (0, 0);
    // Position to resume from after the most recent '*'
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        let step = match pattern.get(p) {
            Some(b'*') => {
                backtrack = Some((p, t));
                p += 1;
                continue;
            }
            Some(b'?') => Some(1),
            Some(b'[') => match_class(&pattern[p..], text[t]),
            Some(b'\\') if p + 1 < pattern.len() => (pattern[p + 1] == text[t]).then_some(2),
            Some(&c) => (c == text[t]).then_some(1),
            None => None,
        };

        match step {
            Some(width) => {
                p += width;
                t += 1;
            }
            None => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    t = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

/// Matches one byte against a `[...]` class at the start of `pattern`.
///
/// Returns the width of the class on a match.
fn match_class(pattern: &[u8], c: u8) -> Option<usize> {
    let mut i = 1;
    let negate = pattern.get(i) == Some(&b'^');
    if negate {
        i += 1;
    }

    let mut matched = false;
    while i < pattern.len() && pattern[i] != b']' {
        if pattern[i] == b'\\' && i + 1 < pattern.len() {
            matched |= pattern[i + 1] == c;
            i += 2;
        } else if i + 2 < pattern.len() && pattern[i + 1] == b'-' && pattern[i + 2] != b']' {
            let (lo, hi) = (pattern[i].min(pattern[i + 2]), pattern[i].max(pattern[i + 2]));
            matched |= (lo..=hi).contains(&c);
            i += 3;
        } else {
            matched |= pattern[i] == c;
            i += 1;
        }
    }

    // Unterminated class: treat '[' as a literal
    if i >= pattern.len() {
        return (c == b'[').then_some(1);
    }

    (matched != negate).then_some(i + 1)
}
