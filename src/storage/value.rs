//! Stored Values and Their Encodings
//!
//! Every value in the keyspace is held in one of two physical encodings:
//!
//! ```text
//! ┌──────────────────────────┐     ┌──────────────────────────┐
//! │ Integer(i64)             │     │ Raw(BytesMut)            │
//! │ inline, no heap buffer   │     │ owned byte buffer        │
//! └──────────────────────────┘     └──────────────────────────┘
//!         ▲     │ materialize()                 │
//!         │     └──────────────────────────────>│
//!         └─────────────────────────────────────┘
//!                try_compact_encoding()
//! ```
//!
//! Counters dominate most workloads, so a value that is a canonical decimal
//! integer is kept inline and only turned into bytes when a caller needs to
//! mutate it as a string. Longer than [`MAX_INTEGER_LEN`] bytes is never
//! attempted as an integer: that is the widest an i64 can print.
//!
//! Each value also carries a version. The keyspace resets it to 0 when a key
//! is created and bumps it on every overwrite, which gives higher layers a
//! per-key sequence for detecting lost updates.

use crate::storage::error::{StoreError, StoreResult};
use bytes::BytesMut;
use std::borrow::Cow;

/// Longest input that is ever considered for integer encoding.
pub const MAX_INTEGER_LEN: usize = 21;

/// Slack above this fraction of the used length is given back on compaction.
const SLACK_DIVISOR: usize = 10;

/// Physical encoding of a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Raw,
    Integer,
}

impl Encoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Encoding::Raw => "raw",
            Encoding::Integer => "int",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Payload {
    Raw(BytesMut),
    Integer(i64),
}

/// A stored value: its payload plus a version number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    payload: Payload,
    version: u64,
}

impl Value {
    /// Creates an integer-encoded value.
    pub fn from_integer(v: i64) -> Self {
        Self {
            payload: Payload::Integer(v),
            version: 0,
        }
    }

    /// Creates a value from bytes, choosing integer encoding when `bytes`
    /// is a canonical decimal integer.
    ///
    /// # Example
    ///
    /// ```
    /// use slotkv::storage::{Encoding, Value};
    ///
    /// assert_eq!(Value::from_bytes(b"42").encoding(), Encoding::Integer);
    /// assert_eq!(Value::from_bytes(b"042").encoding(), Encoding::Raw);
    /// ```
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let payload = match parse_canonical(bytes) {
            Some(v) => Payload::Integer(v),
            None => Payload::Raw(BytesMut::from(bytes)),
        };
        Self {
            payload,
            version: 0,
        }
    }

    pub fn encoding(&self) -> Encoding {
        match self.payload {
            Payload::Raw(_) => Encoding::Raw,
            Payload::Integer(_) => Encoding::Integer,
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: u64) {
        self.version = version;
    }

    /// Re-attempts integer encoding on a raw value.
    ///
    /// A raw value that stays raw gives back its spare capacity once the
    /// slack exceeds a tenth of the used length.
    pub fn try_compact_encoding(&mut self) {
        let buf = match &mut self.payload {
            Payload::Integer(_) => return,
            Payload::Raw(buf) => buf,
        };

        if let Some(v) = parse_canonical(&buf[..]) {
            self.payload = Payload::Integer(v);
            return;
        }

        let slack = buf.capacity() - buf.len();
        if slack > buf.len() / SLACK_DIVISOR {
            *buf = BytesMut::from(&buf[..]);
        }
    }

    /// Reads the value as a signed 64-bit integer.
    ///
    /// Raw values are parsed leniently (an explicit sign and leading zeros
    /// are accepted, an empty buffer reads as 0) but any whitespace,
    /// trailing bytes, or overflow fails.
    pub fn to_integer(&self) -> StoreResult<i64> {
        match &self.payload {
            Payload::Integer(v) => Ok(*v),
            Payload::Raw(buf) if buf.is_empty() => Ok(0),
            Payload::Raw(buf) => std::str::from_utf8(buf)
                .ok()
                .and_then(|s| s.parse::<i64>().ok())
                .ok_or(StoreError::NotAnInteger),
        }
    }

    /// Turns the value into its byte representation in place and returns the
    /// buffer.
    ///
    /// Once materialized the value stays raw; calling this again is free.
    /// The returned buffer is exclusively borrowed, so no reader can observe
    /// it while it is being grown.
    pub fn materialize(&mut self) -> &mut BytesMut {
        if let Payload::Integer(v) = self.payload {
            self.payload = Payload::Raw(BytesMut::from(v.to_string().as_bytes()));
        }
        match &mut self.payload {
            Payload::Raw(buf) => buf,
            Payload::Integer(_) => unreachable!("value was just materialized"),
        }
    }

    /// Returns the value's bytes without changing its encoding.
    pub fn as_bytes(&self) -> Cow<'_, [u8]> {
        match &self.payload {
            Payload::Raw(buf) => Cow::Borrowed(&buf[..]),
            Payload::Integer(v) => Cow::Owned(v.to_string().into_bytes()),
        }
    }

    /// Length in bytes of the value's string form.
    pub fn len(&self) -> usize {
        match &self.payload {
            Payload::Raw(buf) => buf.len(),
            Payload::Integer(v) => decimal_len(*v),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Reads an optional value as an integer, treating a missing value as 0.
pub fn integer_or_zero(value: Option<&Value>) -> StoreResult<i64> {
    value.map_or(Ok(0), Value::to_integer)
}

/// Parses `bytes` only if it is exactly how an i64 would print: no sign
/// other than a leading `-`, no leading zeros, no `-0`.
fn parse_canonical(bytes: &[u8]) -> Option<i64> {
    if bytes.is_empty() || bytes.len() > MAX_INTEGER_LEN {
        return None;
    }

    let digits = bytes.strip_prefix(b"-").unwrap_or(bytes);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return None;
    }
    if digits[0] == b'0' && bytes != b"0" {
        return None;
    }

    std::str::from_utf8(bytes).ok()?.parse().ok()
}

fn decimal_len(v: i64) -> usize {
    let sign = usize::from(v < 0);
    let digits = v.unsigned_abs().checked_ilog10().map_or(1, |d| d as usize + 1);
    sign + digits
}
