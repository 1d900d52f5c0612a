//! Command Handler Module
//!
//! This module implements the command processing layer for SlotKV.
//! It composes the keyspace primitives into the user-facing operations and
//! exposes them both as typed methods and as textual commands.
//!
//! ## Architecture
//!
//! ```text
//! Caller (typed API or text line)
//!       │
//!       ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Validate     │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │    Keyspace     │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! ### String Commands
//! - `GET`, `SET`, `ADD`, `REPLACE`
//! - `APPEND`, `PREPEND`
//! - `INCR`, `INCRBY`, `DECR`, `DECRBY`
//!
//! ### Key Commands
//! - `DEL`, `EXISTS`
//! - `EXPIREAT`, `PERSIST`, `PTTL`
//! - `SLOT`, `COUNTKEYSINSLOT`
//!
//! ### Server Commands
//! - `DBSIZE`, `FLUSH`, `FLUSHALL`, `FLUSHDB`, `INFO`

pub mod handler;
pub mod reply;

pub use handler::{CommandHandler, Ttl};
pub use reply::Reply;
