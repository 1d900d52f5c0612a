//! Observable keyspace statistics.
//!
//! The keyspace bumps `keyspace_hits`/`keyspace_misses` on read lookups and
//! `expiredkeys` on expiration. `numcommands` belongs to the command layer,
//! `evictedkeys` to an eviction collaborator, and `peak_memory` to whoever
//! samples memory usage.

use crate::storage::clock::Millis;

/// Counters describing keyspace activity since start-up.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    /// When the keyspace was created
    pub starttime: Millis,
    /// Number of processed commands
    pub numcommands: u64,
    /// Number of keys removed because their TTL elapsed
    pub expiredkeys: u64,
    /// Number of keys removed to stay under a memory limit
    pub evictedkeys: u64,
    /// Number of read lookups that found a key
    pub keyspace_hits: u64,
    /// Number of read lookups that found nothing
    pub keyspace_misses: u64,
    /// Highest memory usage observed, in bytes
    pub peak_memory: usize,
}

impl Stats {
    pub fn new(starttime: Millis) -> Self {
        Self {
            starttime,
            ..Default::default()
        }
    }

    /// Records a memory usage sample, keeping the maximum.
    pub fn observe_memory(&mut self, used: usize) {
        self.peak_memory = self.peak_memory.max(used);
    }

    /// Fraction of read lookups that were hits, or `None` before any lookup.
    pub fn hit_ratio(&self) -> Option<f64> {
        let lookups = self.keyspace_hits + self.keyspace_misses;
        if lookups == 0 {
            None
        } else {
            Some(self.keyspace_hits as f64 / lookups as f64)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_starts_empty() {
        let stats = Stats::new(1234);
        assert_eq!(stats.starttime, 1234);
        assert_eq!(stats.keyspace_hits, 0);
        assert_eq!(stats.peak_memory, 0);
    }

    #[test]
    fn test_observe_memory_keeps_peak() {
        let mut stats = Stats::new(0);
        stats.observe_memory(100);
        stats.observe_memory(50);
        assert_eq!(stats.peak_memory, 100);
        stats.observe_memory(150);
        assert_eq!(stats.peak_memory, 150);
    }

    #[test]
    fn test_hit_ratio() {
        let mut stats = Stats::new(0);
        assert_eq!(stats.hit_ratio(), None);

        stats.keyspace_hits = 3;
        stats.keyspace_misses = 1;
        assert_eq!(stats.hit_ratio(), Some(0.75));
    }
}
