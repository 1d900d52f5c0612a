//! Storage Module
//!
//! This module provides the keyspace core of SlotKV: the value model, the
//! key tables, slot bookkeeping, and expiration.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        Keyspace                             │
//! │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────────┐ │
//! │  │ main         │ │ expires      │ │ slots                │ │
//! │  │ Key -> Value │ │ Key -> ms    │ │ slot -> {Key}        │ │
//! │  └──────────────┘ └──────────────┘ └──────────────────────┘ │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                            │ run_cycle()
//!              ┌─────────────┴─────────────┐
//!              │       ActiveExpiry        │
//!              │  (driven by the caller)   │
//!              └───────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Compact Values**: Canonical integers are stored inline
//! - **Versions**: Every overwrite bumps a per-key version
//! - **Lazy Expiry**: Expired keys are removed on access
//! - **Active Expiry**: An optional driver reclaims keys nobody touches
//! - **Slots**: Per-partition key membership for resharding features
//!
//! ## Example
//!
//! ```
//! use slotkv::storage::{Keyspace, ManualClock, Value};
//! use bytes::Bytes;
//! use std::sync::Arc;
//!
//! let clock = ManualClock::new(0);
//! let mut keyspace = Keyspace::with_clock(16, Arc::new(clock.clone()));
//!
//! keyspace.set_key(Bytes::from("session"), Value::from_bytes(b"token123"));
//! keyspace.set_expire(b"session", 1000);
//!
//! clock.set(1500);
//! assert!(keyspace.lookup_read(b"session").is_none());
//! assert_eq!(keyspace.stats().expiredkeys, 1);
//! ```

pub mod clock;
pub mod error;
pub mod expiry;
pub mod keyspace;
pub mod slots;
pub mod stats;
pub mod value;

// Re-export commonly used types
pub use clock::{Clock, ManualClock, Millis, SystemClock};
pub use error::{StoreError, StoreResult};
pub use expiry::{ActiveExpiry, ExpiryConfig};
pub use keyspace::{Key, Keyspace, MemoryInfo};
pub use slots::SlotIndex;
pub use stats::Stats;
pub use value::{integer_or_zero, Encoding, Value, MAX_INTEGER_LEN};
