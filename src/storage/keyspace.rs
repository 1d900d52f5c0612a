//! The Keyspace Store
//!
//! This module owns every key and value. It provides the primitive
//! operations (lookup, add, overwrite, delete, flush) that the command layer
//! composes into user-facing commands.
//!
//! ## Layout
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Keyspace                            │
//! │                                                             │
//! │  main:    HashMap<Key, Value>      every live key           │
//! │  expires: ExpireTable              keys with a TTL          │
//! │  slots:   SlotIndex                key membership per slot  │
//! │  stats:   Stats                    hits, misses, expired... │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! A key in `expires` or in a slot is a clone of the `Bytes` handle stored
//! in `main`, so all three tables refer to one allocation per key.
//!
//! ## Concurrency Model
//!
//! None. The keyspace is a plain single-owner structure mutated through
//! `&mut self`; callers serialize requests and run each to completion.
//! Borrowed values returned by lookups cannot outlive the next mutation.
//!
//! ## Preconditions
//!
//! [`Keyspace::add`] requires the key to be absent and
//! [`Keyspace::overwrite`] requires it to be present. Breaking either is a
//! bug in the caller and aborts with a panic instead of corrupting the
//! bookkeeping. Use [`Keyspace::exists`] or the lookups to check first.

use crate::storage::clock::{Clock, Millis, SystemClock};
use crate::storage::expiry::ExpireTable;
use crate::storage::slots::SlotIndex;
use crate::storage::stats::Stats;
use crate::storage::value::Value;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// An owned key, compared and hashed by its bytes.
pub type Key = Bytes;

/// Rough per-entry bookkeeping cost used by [`Keyspace::memory_info`].
const ENTRY_OVERHEAD: usize = 64;

/// The in-memory keyspace.
///
/// # Example
///
/// ```
/// use slotkv::storage::{Keyspace, Value};
/// use bytes::Bytes;
///
/// let mut keyspace = Keyspace::new(16);
///
/// keyspace.set_key(Bytes::from("name"), Value::from_bytes(b"Ariz"));
/// let value = keyspace.lookup_read(b"name").unwrap();
/// assert_eq!(&value.as_bytes()[..], b"Ariz");
/// ```
pub struct Keyspace {
    pub(super) main: HashMap<Key, Value>,
    pub(super) expires: ExpireTable,
    pub(super) slots: SlotIndex,
    pub(super) stats: Stats,
    pub(super) clock: Arc<dyn Clock + Send + Sync>,
}

impl std::fmt::Debug for Keyspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Keyspace")
            .field("keys", &self.main.len())
            .field("expires", &self.expires.len())
            .field("slots", &self.slots.num_slots())
            .field("stats", &self.stats)
            .finish()
    }
}

impl Keyspace {
    /// Creates an empty keyspace with `num_slots` slots on the system clock.
    pub fn new(num_slots: usize) -> Self {
        Self::with_clock(num_slots, Arc::new(SystemClock))
    }

    /// Creates an empty keyspace that reads time from `clock`.
    ///
    /// # Panics
    ///
    /// Panics if `num_slots` is zero.
    pub fn with_clock(num_slots: usize, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let stats = Stats::new(clock.now_ms());
        debug!(num_slots, "keyspace created");
        Self {
            main: HashMap::new(),
            expires: ExpireTable::default(),
            slots: SlotIndex::new(num_slots),
            stats,
            clock,
        }
    }

    /// Current time according to the keyspace clock.
    pub fn now_ms(&self) -> Millis {
        self.clock.now_ms()
    }

    /// Looks a key up for reading.
    ///
    /// Expires the key first if its TTL has elapsed, then counts a hit or a
    /// miss.
    pub fn lookup_read(&mut self, key: &[u8]) -> Option<&Value> {
        self.expire_if_needed(key);
        match self.main.get(key) {
            Some(value) => {
                self.stats.keyspace_hits += 1;
                Some(value)
            }
            None => {
                self.stats.keyspace_misses += 1;
                None
            }
        }
    }

    /// Looks a key up for writing.
    ///
    /// Same expiration check as [`Keyspace::lookup_read`], without touching
    /// the hit/miss counters.
    pub fn lookup_write(&mut self, key: &[u8]) -> Option<&mut Value> {
        self.expire_if_needed(key);
        self.main.get_mut(key)
    }

    /// Inserts a brand-new key with version 0.
    ///
    /// # Panics
    ///
    /// Panics if the key already exists.
    pub fn add(&mut self, key: Key, mut value: Value) {
        assert!(
            !self.main.contains_key(&key),
            "add: key '{}' already exists",
            String::from_utf8_lossy(&key)
        );
        value.set_version(0);
        self.slots.insert(key.clone());
        self.main.insert(key, value);
    }

    /// Replaces the value of an existing key, carrying its version forward
    /// by one. The key's TTL is left alone.
    ///
    /// # Panics
    ///
    /// Panics if the key does not exist.
    pub fn overwrite(&mut self, key: &[u8], mut value: Value) {
        let old = self.main.get_mut(key).unwrap_or_else(|| {
            panic!(
                "overwrite: key '{}' does not exist",
                String::from_utf8_lossy(key)
            )
        });
        value.set_version(old.version() + 1);
        *old = value;
    }

    /// Sets a key whether or not it exists, and makes it persistent.
    pub fn set_key(&mut self, key: Key, value: Value) {
        if self.lookup_write(&key).is_some() {
            self.overwrite(&key, value);
        } else {
            self.add(key.clone(), value);
        }
        self.remove_expire(&key);
    }

    /// Checks whether a key is present, without an expiration check.
    pub fn exists(&self, key: &[u8]) -> bool {
        self.main.contains_key(key)
    }

    /// Removes a key, its TTL and its slot membership.
    ///
    /// Returns `true` if the key was present.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        if !self.expires.is_empty() {
            self.expires.remove(key);
        }
        if self.main.remove(key).is_some() {
            self.slots.remove(key);
            true
        } else {
            false
        }
    }

    /// Empties the keyspace and returns how many keys were removed.
    pub fn flush(&mut self) -> usize {
        let removed = self.main.len();
        self.main.clear();
        self.expires.clear();
        self.slots.clear();
        debug!(removed, "keyspace flushed");
        removed
    }

    /// Number of keys, including expired ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.main.len()
    }

    pub fn is_empty(&self) -> bool {
        self.main.is_empty()
    }

    /// Number of keys carrying a TTL.
    pub fn expires_len(&self) -> usize {
        self.expires.len()
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut Stats {
        &mut self.stats
    }

    pub fn num_slots(&self) -> usize {
        self.slots.num_slots()
    }

    /// Slot a key maps to, whether or not the key exists.
    pub fn slot_of(&self, key: &[u8]) -> usize {
        self.slots.slot_of(key)
    }

    pub fn count_keys_in_slot(&self, slot: usize) -> usize {
        self.slots.count(slot)
    }

    pub fn keys_in_slot(&self, slot: usize) -> impl Iterator<Item = &Key> {
        self.slots.keys(slot)
    }

    /// Returns memory usage information (approximate).
    pub fn memory_info(&self) -> MemoryInfo {
        let used_memory = self
            .main
            .iter()
            .map(|(key, value)| key.len() + value.len() + ENTRY_OVERHEAD)
            .sum();

        MemoryInfo {
            keys: self.main.len(),
            used_memory,
        }
    }
}

/// Memory usage information.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryInfo {
    /// Number of keys
    pub keys: usize,
    /// Approximate memory used in bytes
    pub used_memory: usize,
}

#[cfg(test)]
impl Keyspace {
    /// Checks the cross-table invariants.
    pub(crate) fn assert_consistent(&self) {
        self.expires.assert_consistent();
        for key in self.expires.keys() {
            assert!(self.main.contains_key(key), "expire entry without key");
        }
        for key in self.main.keys() {
            assert!(self.slots.contains(key), "key missing from its slot");
        }
        let slotted: usize = (0..self.slots.num_slots())
            .map(|slot| self.slots.count(slot))
            .sum();
        assert_eq!(slotted, self.main.len(), "slot index out of sync");
    }
}
