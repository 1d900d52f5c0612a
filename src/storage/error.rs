//! User-visible failures of keyspace operations.
//!
//! These are ordinary, recoverable results: an operation that returns one
//! of them has left the keyspace exactly as it found it. Broken caller
//! preconditions (adding an existing key, overwriting a missing one) are
//! not represented here; those abort via assertions in the keyspace.

use thiserror::Error;

/// Errors reported by the arithmetic and string-growing operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The stored value cannot be read as a base-10 signed 64-bit integer.
    #[error("value is not an integer or out of range")]
    NotAnInteger,

    /// Applying the delta would leave the i64 range.
    #[error("increment or decrement would overflow")]
    Overflow,

    /// The resulting string would exceed the configured maximum length.
    #[error("string exceeds maximum allowed size: {len} bytes (max: {max})")]
    StringTooLong { len: usize, max: usize },
}

/// Result type for keyspace operations.
pub type StoreResult<T> = Result<T, StoreError>;
