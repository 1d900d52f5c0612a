//! Replies produced by the command layer.

use bytes::Bytes;
use std::fmt;

/// The result of executing one command, ready to be shown to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The command succeeded and has nothing to return.
    Ok,

    /// The key does not exist.
    Nil,

    /// A signed 64-bit integer.
    Integer(i64),

    /// A binary-safe string.
    Bulk(Bytes),

    /// The command failed; the keyspace is unchanged.
    Error(String),
}

impl Reply {
    /// Creates a new error reply.
    ///
    /// # Example
    /// ```
    /// use slotkv::commands::Reply;
    /// let err = Reply::error("ERR unknown command");
    /// assert!(err.is_error());
    /// ```
    pub fn error(s: impl Into<String>) -> Self {
        Reply::Error(s.into())
    }

    /// Creates a new bulk string reply.
    pub fn bulk(data: impl Into<Bytes>) -> Self {
        Reply::Bulk(data.into())
    }

    /// Creates an integer reply from a boolean (1 or 0).
    pub fn flag(b: bool) -> Self {
        Reply::Integer(i64::from(b))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Returns the integer if this is an Integer variant.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Reply::Integer(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the bytes if this is a Bulk variant.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Reply::Bulk(b) => Some(b),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Ok => write!(f, "OK"),
            Reply::Nil => write!(f, "(nil)"),
            Reply::Integer(n) => write!(f, "(integer) {}", n),
            Reply::Bulk(data) => {
                if let Ok(s) = std::str::from_utf8(data) {
                    write!(f, "\"{}\"", s)
                } else {
                    write!(f, "(binary data, {} bytes)", data.len())
                }
            }
            Reply::Error(s) => write!(f, "(error) {}", s),
        }
    }
}
