//! Slot Partition Index
//!
//! The keyspace is split into a fixed number of slots. A key's slot is
//! XXH64 (seed 0) of its bytes modulo the slot count, and every slot
//! records which keys currently live in it. XXH64 has a published
//! definition, so a key maps to the same slot in every build:
//!
//! ```text
//!           xxh64(key) % N
//!   key ─────────────────────┐
//!                            ▼
//! ┌────────┐ ┌────────┐ ┌────────┐ ┌────────┐
//! │ Slot 0 │ │ Slot 1 │ │ Slot 2 │ │ Slot N │
//! │ {keys} │ │ {keys} │ │ {keys} │ │ {keys} │
//! └────────┘ └────────┘ └────────┘ └────────┘
//! ```
//!
//! The index never holds values, only membership. It is kept in lockstep
//! with the main table on every add, delete and flush so that partition
//! aware features (per-slot iteration, migrating a slot elsewhere) can read
//! membership directly instead of rescanning the keyspace.

use crate::storage::keyspace::Key;
use std::collections::HashSet;
use xxhash_rust::xxh64::xxh64;

/// Per-slot key membership.
#[derive(Debug)]
pub struct SlotIndex {
    slots: Vec<HashSet<Key>>,
}

impl SlotIndex {
    /// Creates an index with `num_slots` empty slots.
    ///
    /// # Panics
    ///
    /// Panics if `num_slots` is zero.
    pub fn new(num_slots: usize) -> Self {
        assert!(num_slots > 0, "slot count must be positive");
        Self {
            slots: (0..num_slots).map(|_| HashSet::new()).collect(),
        }
    }

    /// Number of slots.
    pub fn num_slots(&self) -> usize {
        self.slots.len()
    }

    /// Determines which slot a key belongs to.
    #[inline]
    pub fn slot_of(&self, key: &[u8]) -> usize {
        (xxh64(key, 0) % self.slots.len() as u64) as usize
    }

    pub(crate) fn insert(&mut self, key: Key) -> bool {
        let slot = self.slot_of(&key);
        self.slots[slot].insert(key)
    }

    pub(crate) fn remove(&mut self, key: &[u8]) -> bool {
        let slot = self.slot_of(key);
        self.slots[slot].remove(key)
    }

    pub(crate) fn contains(&self, key: &[u8]) -> bool {
        self.slots[self.slot_of(key)].contains(key)
    }

    /// Number of keys in `slot`; 0 for a slot that does not exist.
    pub fn count(&self, slot: usize) -> usize {
        self.slots.get(slot).map_or(0, HashSet::len)
    }

    /// Keys currently assigned to `slot`, in no particular order.
    pub fn keys(&self, slot: usize) -> impl Iterator<Item = &Key> {
        self.slots.get(slot).into_iter().flatten()
    }

    pub(crate) fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }
}
