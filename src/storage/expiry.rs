//! Key Expiration
//!
//! A key may carry an absolute expiration time in milliseconds. The core
//! enforces it lazily: every read and write lookup first asks
//! [`Keyspace::expire_if_needed`], which deletes the key once `now > when`.
//!
//! ## Why an Active Driver Too?
//!
//! Lazy expiry is cheap but a key that expires and is never touched again
//! stays in memory until a flush. [`ActiveExpiry`] lets an outside scheduler
//! reclaim those keys in bounded batches. It never runs by itself; whoever
//! owns the keyspace calls [`ActiveExpiry::run_cycle`] and waits for the
//! interval it returns.
//!
//! ## Adaptive Frequency
//!
//! If many keys are expiring, the interval shrinks so cycles run more often.
//! If nothing expired, it grows to save CPU.

use crate::storage::clock::Millis;
use crate::storage::keyspace::{Key, Keyspace};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, trace};

/// Keys carrying a TTL, with a dense key list so sweeps can resume where
/// the previous one stopped.
///
/// Removal swaps the last key into the freed position, so a key moved
/// behind the cursor waits one extra pass before it is examined again.
#[derive(Debug, Default)]
pub(crate) struct ExpireTable {
    index: HashMap<Key, (Millis, usize)>,
    order: Vec<Key>,
    cursor: usize,
}

impl ExpireTable {
    pub(crate) fn insert(&mut self, key: Key, when: Millis) {
        match self.index.get_mut(&key[..]) {
            Some(entry) => entry.0 = when,
            None => {
                self.index.insert(key.clone(), (when, self.order.len()));
                self.order.push(key);
            }
        }
    }

    pub(crate) fn remove(&mut self, key: &[u8]) -> Option<Millis> {
        let (when, pos) = self.index.remove(key)?;
        self.order.swap_remove(pos);
        if let Some(moved) = self.order.get(pos) {
            if let Some(entry) = self.index.get_mut(&moved[..]) {
                entry.1 = pos;
            }
        }
        Some(when)
    }

    pub(crate) fn get(&self, key: &[u8]) -> Option<Millis> {
        self.index.get(key).map(|&(when, _)| when)
    }

    pub(crate) fn len(&self) -> usize {
        self.order.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
        self.cursor = 0;
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = &Key> {
        self.order.iter()
    }

    /// Examines at most `max` entries starting at the cursor, wrapping
    /// around, and returns the keys whose expiry matches `pred`.
    pub(crate) fn scan(&mut self, max: usize, mut pred: impl FnMut(Millis) -> bool) -> Vec<Key> {
        let len = self.order.len();
        if len == 0 {
            return Vec::new();
        }

        let examined = max.min(len);
        let start = self.cursor % len;
        let mut matched = Vec::new();
        for i in 0..examined {
            let key = &self.order[(start + i) % len];
            if let Some(&(when, _)) = self.index.get(&key[..]) {
                if pred(when) {
                    matched.push(key.clone());
                }
            }
        }
        self.cursor = (start + examined) % len;
        matched
    }

    #[cfg(test)]
    pub(crate) fn key_handle(&self, key: &[u8]) -> Option<&Key> {
        self.index.get_key_value(key).map(|(k, _)| k)
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        assert_eq!(self.index.len(), self.order.len(), "expire index out of sync");
        for (pos, key) in self.order.iter().enumerate() {
            assert_eq!(self.index.get(&key[..]).map(|e| e.1), Some(pos));
        }
    }
}

impl Keyspace {
    /// Sets the absolute expiration time of an existing key.
    ///
    /// The expires table reuses the key handle owned by the main table.
    ///
    /// # Panics
    ///
    /// Panics if the key does not exist.
    pub fn set_expire(&mut self, key: &[u8], when: Millis) {
        let (shared, _) = self.main.get_key_value(key).unwrap_or_else(|| {
            panic!(
                "set_expire: key '{}' does not exist",
                String::from_utf8_lossy(key)
            )
        });
        let shared = shared.clone();
        self.expires.insert(shared, when);
    }

    /// Makes an existing key persistent.
    ///
    /// Returns `true` if the key had a TTL.
    ///
    /// # Panics
    ///
    /// Panics if the key does not exist; an orphaned expire entry could
    /// never be reclaimed.
    pub fn remove_expire(&mut self, key: &[u8]) -> bool {
        assert!(
            self.main.contains_key(key),
            "remove_expire: key '{}' does not exist",
            String::from_utf8_lossy(key)
        );
        self.expires.remove(key).is_some()
    }

    /// Returns the expiration time of a key, or `None` if it is persistent
    /// (or absent).
    pub fn get_expire(&self, key: &[u8]) -> Option<Millis> {
        if self.expires.is_empty() {
            return None;
        }
        let when = self.expires.get(key)?;
        assert!(
            self.main.contains_key(key),
            "get_expire: expire entry for missing key '{}'",
            String::from_utf8_lossy(key)
        );
        Some(when)
    }

    /// Deletes the key if its TTL has elapsed.
    ///
    /// Returns `true` if the key was expired and removed.
    pub fn expire_if_needed(&mut self, key: &[u8]) -> bool {
        let Some(when) = self.get_expire(key) else {
            return false;
        };
        if self.clock.now_ms() <= when {
            return false;
        }

        self.stats.expiredkeys += 1;
        trace!(key = %String::from_utf8_lossy(key), when, "key expired on access");
        self.delete(key)
    }

    /// Examines up to `max_keys` keys carrying a TTL and deletes the ones
    /// that have elapsed. Each call resumes after the keys examined by the
    /// previous one.
    ///
    /// Returns the number of keys removed.
    pub fn sweep_expired(&mut self, max_keys: usize) -> usize {
        let now = self.clock.now_ms();
        let expired = self.expires.scan(max_keys, |when| now > when);

        for key in &expired {
            self.delete(key);
        }
        self.stats.expiredkeys += expired.len() as u64;

        expired.len()
    }
}

/// Configuration for the active expiry driver.
#[derive(Debug, Clone)]
pub struct ExpiryConfig {
    /// Base interval between cycles (default: 100ms)
    pub base_interval: Duration,

    /// Minimum interval between cycles (default: 10ms)
    pub min_interval: Duration,

    /// Maximum interval between cycles (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of keys with a TTL expired, speed up
    pub speedup_threshold: f64,

    /// If this fraction of keys with a TTL expired, slow down
    pub slowdown_threshold: f64,

    /// Maximum number of keys removed per cycle
    pub keys_per_cycle: usize,
}

impl Default for ExpiryConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(100),
            min_interval: Duration::from_millis(10),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,
            slowdown_threshold: 0.01,
            keys_per_cycle: 1000,
        }
    }
}

/// Incremental reclamation of expired keys, driven from outside the core.
#[derive(Debug)]
pub struct ActiveExpiry {
    config: ExpiryConfig,
    current_interval: Duration,
}

impl ActiveExpiry {
    pub fn new(config: ExpiryConfig) -> Self {
        let current_interval = config.base_interval;
        Self {
            config,
            current_interval,
        }
    }

    /// Delay the caller should wait before the next cycle.
    pub fn interval(&self) -> Duration {
        self.current_interval
    }

    /// Runs one reclamation cycle and returns the delay until the next one.
    pub fn run_cycle(&mut self, keyspace: &mut Keyspace) -> Duration {
        let examined = keyspace.expires_len().min(self.config.keys_per_cycle);
        let expired = keyspace.sweep_expired(self.config.keys_per_cycle);

        if examined > 0 {
            let expiry_rate = expired as f64 / examined as f64;

            if expiry_rate > self.config.speedup_threshold {
                self.current_interval = (self.current_interval / 2).max(self.config.min_interval);
                debug!(
                    expired = expired,
                    rate = %format!("{:.2}%", expiry_rate * 100.0),
                    new_interval_ms = self.current_interval.as_millis(),
                    "High expiry rate, speeding up"
                );
            } else if expiry_rate < self.config.slowdown_threshold && expired == 0 {
                self.current_interval = (self.current_interval * 2).min(self.config.max_interval);
                trace!(
                    new_interval_ms = self.current_interval.as_millis(),
                    "Low expiry rate, slowing down"
                );
            }
        }

        if expired > 0 {
            debug!(
                expired = expired,
                keys_remaining = keyspace.len(),
                "Expired keys cleaned up"
            );
        }

        self.current_interval
    }
}

impl Default for ActiveExpiry {
    fn default() -> Self {
        Self::new(ExpiryConfig::default())
    }
}
