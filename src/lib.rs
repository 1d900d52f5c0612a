//! # SlotKV - An In-Memory Keyspace Core
//!
//! SlotKV owns the keys and values of a single-node key-value store. It
//! decides how each value is encoded, tracks per-key expiration, partitions
//! keys into fixed slots, and implements the primitive string operations
//! higher-level commands are built from.
//!
//! ## Features
//!
//! - **Compact Encoding**: Canonical decimal strings are stored as inline integers
//! - **Versioned Writes**: Every overwrite bumps a per-key version
//! - **Lazy + Active Expiry**: Keys expire on access, or via a bounded sweep
//! - **Slots**: Keys are partitioned into a fixed number of slots
//! - **Overflow Safe**: INCR/DECR never wrap around
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                               SlotKV                                    │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────────────────────────────────────┐     │
//! │  │  Textual    │───>│              CommandHandler                 │     │
//! │  │  commands   │    │  GET SET ADD REPLACE APPEND PREPEND DELETE  │     │
//! │  └─────────────┘    │  INCR DECR FLUSH ...                        │     │
//! │                     └──────────────────────┬──────────────────────┘     │
//! │                                            │                            │
//! │                                            ▼                            │
//! │                     ┌─────────────────────────────────────────────┐     │
//! │                     │                 Keyspace                    │     │
//! │                     │  ┌────────┐  ┌─────────┐  ┌───────┐ ┌─────┐ │     │
//! │                     │  │ main   │  │ expires │  │ slots │ │stats│ │     │
//! │                     │  └────────┘  └─────────┘  └───────┘ └─────┘ │     │
//! │                     └─────────────────────────────────────────────┘     │
//! │                                            ▲                            │
//! │                                            │                            │
//! │                     ┌──────────────────────┴──────────────────────┐     │
//! │                     │               ActiveExpiry                  │     │
//! │                     │        (cycles driven by the owner)         │     │
//! │                     └─────────────────────────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use slotkv::{CommandHandler, KeyspaceConfig};
//!
//! let mut handler = CommandHandler::new(KeyspaceConfig::default());
//!
//! handler.set(b"a", b"100", None);
//! assert_eq!(handler.incr(b"a"), Ok(101));
//!
//! handler.set(b"s", b"hello", None);
//! assert_eq!(handler.append(b"s", b"world"), Ok(10));
//! assert_eq!(&handler.get(b"s").unwrap().as_bytes()[..], b"helloworld");
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Values, the keyspace tables, slots and expiration
//! - [`commands`]: Core operations and textual command dispatch
//! - [`config`]: Keyspace settings
//!
//! ## Design Highlights
//!
//! ### Single Owner
//!
//! The keyspace is mutated through `&mut self` only. Requests run to
//! completion one at a time, and values handed out by lookups are borrows
//! that end at the next mutation.
//!
//! ### Lazy + Active Expiry
//!
//! Keys with TTL are expired in two ways:
//! 1. **Lazy**: When a key is accessed, we check if it's expired
//! 2. **Active**: [`ActiveExpiry`] sweeps a bounded number of keys per cycle
//!
//! This ensures memory is reclaimed even for keys that are never accessed again.

pub mod commands;
pub mod config;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, Reply, Ttl};
pub use config::{ConfigError, KeyspaceConfig};
pub use storage::{ActiveExpiry, ExpiryConfig, Keyspace, StoreError, StoreResult, Value};

/// Version of SlotKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
