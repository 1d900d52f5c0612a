//! Command Handler Module
//!
//! This module implements the core operations of SlotKV on top of the
//! [`Keyspace`], and a small textual command set that dispatches to them.
//!
//! ## Supported Commands
//!
//! ### String Commands
//! - `GET key` - Get a key's value
//! - `SET key value [expire_at_ms]` - Set a key, optionally with an absolute expiry
//! - `ADD key value [expire_at_ms]` - Set only if the key does not exist
//! - `REPLACE key value [expire_at_ms]` - Set only if the key exists
//! - `APPEND key value` - Append to a string
//! - `PREPEND key value` - Prepend to a string
//! - `INCR key` / `DECR key` - Increment or decrement by one
//! - `INCRBY key delta` / `DECRBY key delta` - Increment or decrement by an amount
//!
//! ### Key Commands
//! - `DEL key [key ...]` - Delete keys
//! - `EXISTS key [key ...]` - Count existing keys
//! - `EXPIREAT key ms` - Set an absolute expiry
//! - `PERSIST key` - Remove expiry
//! - `PTTL key` - Remaining TTL in ms
//! - `SLOT key` - Slot a key maps to
//! - `COUNTKEYSINSLOT slot` - Number of keys in a slot
//!
//! ### Server Commands
//! - `DBSIZE` - Number of keys
//! - `FLUSH` / `FLUSHALL` / `FLUSHDB` - Clear the keyspace
//! - `INFO` - Counters and memory usage
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     CommandHandler                          │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐      │
//! │  │  execute()  │───>│  dispatch() │───>│  get/set/.. │      │
//! │  └─────────────┘    └─────────────┘    └─────────────┘      │
//! │                                               │             │
//! │                                               ▼             │
//! │                                           Keyspace          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use crate::commands::reply::Reply;
use crate::config::KeyspaceConfig;
use crate::storage::{
    integer_or_zero, Clock, Keyspace, Millis, StoreError, StoreResult, SystemClock, Value,
};
use bytes::{Bytes, BytesMut};
use std::sync::Arc;
use tracing::{debug, trace};

/// Remaining lifetime of a key, as reported by [`CommandHandler::pttl`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// The key does not exist.
    Missing,
    /// The key exists and never expires.
    Persistent,
    /// The key expires after this many milliseconds.
    Remaining(Millis),
}

/// Executes operations against a single owned keyspace.
#[derive(Debug)]
pub struct CommandHandler {
    keyspace: Keyspace,
    config: KeyspaceConfig,
}

impl CommandHandler {
    /// Creates a handler over an empty keyspace on the system clock.
    pub fn new(config: KeyspaceConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a handler whose keyspace reads time from `clock`.
    ///
    /// # Panics
    ///
    /// Panics if `config.num_slots` is zero. Call
    /// [`KeyspaceConfig::validate`] first when the config comes from a user.
    pub fn with_clock(config: KeyspaceConfig, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            keyspace: Keyspace::with_clock(config.num_slots, clock),
            config,
        }
    }

    pub fn keyspace(&self) -> &Keyspace {
        &self.keyspace
    }

    pub fn keyspace_mut(&mut self) -> &mut Keyspace {
        &mut self.keyspace
    }

    pub fn config(&self) -> &KeyspaceConfig {
        &self.config
    }

    // ========================================================================
    // Core operations
    // ========================================================================

    /// Returns the live value of a key.
    ///
    /// The borrow ends at the next mutation; copy the bytes out to keep them.
    pub fn get(&mut self, key: &[u8]) -> Option<&Value> {
        self.keyspace.lookup_read(key)
    }

    /// Sets a key, replacing any previous value and TTL.
    ///
    /// `expire_at` is an absolute time in milliseconds. Zero or a negative
    /// time means no expiry.
    pub fn set(&mut self, key: &[u8], value: &[u8], expire_at: Option<Millis>) {
        let key = Bytes::copy_from_slice(key);
        self.keyspace.set_key(key.clone(), Value::from_bytes(value));
        if let Some(when) = expire_at.filter(|&when| when > 0) {
            self.keyspace.set_expire(&key, when);
        }
    }

    /// Sets a key only if it does not exist yet.
    ///
    /// Returns `false`, leaving the keyspace untouched, if the key exists.
    pub fn add(&mut self, key: &[u8], value: &[u8], expire_at: Option<Millis>) -> bool {
        if self.keyspace.lookup_write(key).is_some() {
            return false;
        }
        self.set(key, value, expire_at);
        true
    }

    /// Sets a key only if it already exists.
    ///
    /// Returns `false`, leaving the keyspace untouched, if the key is absent.
    pub fn replace(&mut self, key: &[u8], value: &[u8], expire_at: Option<Millis>) -> bool {
        if self.keyspace.lookup_write(key).is_none() {
            return false;
        }
        self.set(key, value, expire_at);
        true
    }

    /// Appends `suffix` to a key, creating it if missing.
    ///
    /// Returns the new length of the value.
    pub fn append(&mut self, key: &[u8], suffix: &[u8]) -> StoreResult<usize> {
        self.concat(key, suffix, true)
    }

    /// Prepends `prefix` to a key, creating it if missing.
    ///
    /// Returns the new length of the value.
    pub fn prepend(&mut self, key: &[u8], prefix: &[u8]) -> StoreResult<usize> {
        self.concat(key, prefix, false)
    }

    fn concat(&mut self, key: &[u8], data: &[u8], at_end: bool) -> StoreResult<usize> {
        let max = self.config.max_string_len;

        match self.keyspace.lookup_write(key) {
            None => {
                check_string_length(data.len(), max)?;
                self.keyspace
                    .add(Bytes::copy_from_slice(key), Value::from_bytes(data));
                Ok(data.len())
            }
            Some(value) => {
                let total = value.len() + data.len();
                check_string_length(total, max)?;

                let version = value.version();
                let buf = value.materialize();
                if at_end {
                    buf.extend_from_slice(data);
                } else {
                    let mut joined = BytesMut::with_capacity(total);
                    joined.extend_from_slice(data);
                    joined.extend_from_slice(&buf[..]);
                    *buf = joined;
                }
                value.set_version(version + 1);
                Ok(total)
            }
        }
    }

    /// Deletes a key. Returns `false` if it did not exist.
    pub fn delete(&mut self, key: &[u8]) -> bool {
        self.keyspace.expire_if_needed(key);
        self.keyspace.delete(key)
    }

    pub fn incr(&mut self, key: &[u8]) -> StoreResult<i64> {
        self.incr_by(key, 1)
    }

    pub fn decr(&mut self, key: &[u8]) -> StoreResult<i64> {
        self.incr_by(key, -1)
    }

    /// Adds `delta` to the integer stored at a key.
    ///
    /// A missing key counts as 0 and is created. The TTL of an existing key
    /// is kept. On error the keyspace is unchanged.
    pub fn incr_by(&mut self, key: &[u8], delta: i64) -> StoreResult<i64> {
        let current = self.keyspace.lookup_write(key);
        let existed = current.is_some();
        let value = integer_or_zero(current.as_deref())?;

        // Checked before adding so the sum is never computed out of range.
        if (delta < 0 && value < 0 && delta < i64::MIN - value)
            || (delta > 0 && value > 0 && delta > i64::MAX - value)
        {
            return Err(StoreError::Overflow);
        }
        let sum = value + delta;

        let new_value = Value::from_integer(sum);
        if existed {
            self.keyspace.overwrite(key, new_value);
        } else {
            self.keyspace.add(Bytes::copy_from_slice(key), new_value);
        }
        Ok(sum)
    }

    /// Subtracts `delta` from the integer stored at a key.
    pub fn decr_by(&mut self, key: &[u8], delta: i64) -> StoreResult<i64> {
        let delta = delta.checked_neg().ok_or(StoreError::Overflow)?;
        self.incr_by(key, delta)
    }

    /// Removes every key. Returns how many were removed.
    pub fn flush(&mut self) -> usize {
        self.keyspace.flush()
    }

    // ========================================================================
    // Key operations
    // ========================================================================

    /// Checks whether a live key exists. Does not count as a hit or miss.
    pub fn exists(&mut self, key: &[u8]) -> bool {
        self.keyspace.lookup_write(key).is_some()
    }

    /// Sets an absolute expiry on an existing key.
    pub fn expire_at(&mut self, key: &[u8], when: Millis) -> bool {
        if self.keyspace.lookup_write(key).is_none() {
            return false;
        }
        self.keyspace.set_expire(key, when);
        true
    }

    /// Removes the expiry of a key. Returns `false` if it had none.
    pub fn persist(&mut self, key: &[u8]) -> bool {
        if self.keyspace.lookup_write(key).is_none() {
            return false;
        }
        self.keyspace.remove_expire(key)
    }

    pub fn pttl(&mut self, key: &[u8]) -> Ttl {
        if self.keyspace.lookup_write(key).is_none() {
            return Ttl::Missing;
        }
        match self.keyspace.get_expire(key) {
            None => Ttl::Persistent,
            Some(when) => Ttl::Remaining((when - self.keyspace.now_ms()).max(0)),
        }
    }

    /// Number of keys, including expired ones not yet reclaimed.
    pub fn dbsize(&self) -> usize {
        self.keyspace.len()
    }

    // ========================================================================
    // Textual commands
    // ========================================================================

    /// Executes one command given as its name followed by its arguments.
    ///
    /// Every command that reaches dispatch counts towards `numcommands`.
    pub fn execute(&mut self, args: &[Bytes]) -> Reply {
        let Some((name, args)) = args.split_first() else {
            return Reply::error("ERR empty command");
        };

        let cmd_name = match std::str::from_utf8(name) {
            Ok(s) => s.to_uppercase(),
            Err(_) => return Reply::error("ERR invalid command name"),
        };

        trace!(command = %cmd_name, args = args.len(), "executing command");
        self.keyspace.stats_mut().numcommands += 1;
        self.dispatch(&cmd_name, args)
    }

    fn dispatch(&mut self, cmd: &str, args: &[Bytes]) -> Reply {
        match cmd {
            // String commands
            "GET" => self.cmd_get(args),
            "SET" => self.cmd_set(args),
            "ADD" => self.cmd_add(args),
            "REPLACE" => self.cmd_replace(args),
            "APPEND" => self.cmd_concat(args, true),
            "PREPEND" => self.cmd_concat(args, false),
            "INCR" => self.cmd_incr(args, 1),
            "DECR" => self.cmd_incr(args, -1),
            "INCRBY" => self.cmd_incrby(args, false),
            "DECRBY" => self.cmd_incrby(args, true),

            // Key commands
            "DEL" => self.cmd_del(args),
            "EXISTS" => self.cmd_exists(args),
            "EXPIREAT" => self.cmd_expireat(args),
            "PERSIST" => self.cmd_persist(args),
            "PTTL" => self.cmd_pttl(args),
            "SLOT" => self.cmd_slot(args),
            "COUNTKEYSINSLOT" => self.cmd_countkeysinslot(args),

            // Server commands
            "DBSIZE" => self.cmd_dbsize(args),
            "FLUSH" | "FLUSHALL" | "FLUSHDB" => self.cmd_flush(args),
            "INFO" => self.cmd_info(args),

            _ => Reply::error(format!("ERR unknown command '{}'", cmd)),
        }
    }

    // ========================================================================
    // Helper functions
    // ========================================================================

    /// Parses an optional absolute expiry argument. Zero means no expiry.
    fn parse_expire_at(arg: Option<&Bytes>) -> Result<Option<Millis>, Reply> {
        match arg {
            None => Ok(None),
            Some(arg) => match parse_integer(arg) {
                Some(0) => Ok(None),
                Some(when) if when > 0 => Ok(Some(when)),
                _ => Err(Reply::error("ERR invalid expire time")),
            },
        }
    }

    fn store_result<T: Into<i64>>(result: StoreResult<T>) -> Reply {
        match result {
            Ok(n) => Reply::Integer(n.into()),
            Err(e) => Reply::error(format!("ERR {}", e)),
        }
    }

    // ========================================================================
    // String Commands
    // ========================================================================

    /// GET key
    fn cmd_get(&mut self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("GET");
        }

        match self.get(&args[0]) {
            Some(value) => Reply::bulk(value.as_bytes().into_owned()),
            None => Reply::Nil,
        }
    }

    /// SET key value [expire_at_ms]
    fn cmd_set(&mut self, args: &[Bytes]) -> Reply {
        if !(2..=3).contains(&args.len()) {
            return wrong_arity("SET");
        }
        let expire_at = match Self::parse_expire_at(args.get(2)) {
            Ok(e) => e,
            Err(reply) => return reply,
        };

        self.set(&args[0], &args[1], expire_at);
        Reply::Ok
    }

    /// ADD key value [expire_at_ms]
    fn cmd_add(&mut self, args: &[Bytes]) -> Reply {
        if !(2..=3).contains(&args.len()) {
            return wrong_arity("ADD");
        }
        let expire_at = match Self::parse_expire_at(args.get(2)) {
            Ok(e) => e,
            Err(reply) => return reply,
        };

        Reply::flag(self.add(&args[0], &args[1], expire_at))
    }

    /// REPLACE key value [expire_at_ms]
    fn cmd_replace(&mut self, args: &[Bytes]) -> Reply {
        if !(2..=3).contains(&args.len()) {
            return wrong_arity("REPLACE");
        }
        let expire_at = match Self::parse_expire_at(args.get(2)) {
            Ok(e) => e,
            Err(reply) => return reply,
        };

        Reply::flag(self.replace(&args[0], &args[1], expire_at))
    }

    /// APPEND key value / PREPEND key value
    fn cmd_concat(&mut self, args: &[Bytes], at_end: bool) -> Reply {
        if args.len() != 2 {
            return wrong_arity(if at_end { "APPEND" } else { "PREPEND" });
        }

        let result = self
            .concat(&args[0], &args[1], at_end)
            .map(|len| len as i64);
        Self::store_result(result)
    }

    /// INCR key / DECR key
    fn cmd_incr(&mut self, args: &[Bytes], delta: i64) -> Reply {
        if args.len() != 1 {
            return wrong_arity(if delta > 0 { "INCR" } else { "DECR" });
        }
        Self::store_result(self.incr_by(&args[0], delta))
    }

    /// INCRBY key delta / DECRBY key delta
    fn cmd_incrby(&mut self, args: &[Bytes], negate: bool) -> Reply {
        if args.len() != 2 {
            return wrong_arity(if negate { "DECRBY" } else { "INCRBY" });
        }
        let delta = match parse_integer(&args[1]) {
            Some(d) => d,
            None => return Reply::error(format!("ERR {}", StoreError::NotAnInteger)),
        };

        let result = if negate {
            self.decr_by(&args[0], delta)
        } else {
            self.incr_by(&args[0], delta)
        };
        Self::store_result(result)
    }

    // ========================================================================
    // Key Commands
    // ========================================================================

    /// DEL key [key ...]
    fn cmd_del(&mut self, args: &[Bytes]) -> Reply {
        if args.is_empty() {
            return wrong_arity("DEL");
        }
        let deleted = args.iter().filter(|key| self.delete(key)).count();
        Reply::Integer(deleted as i64)
    }

    /// EXISTS key [key ...]
    fn cmd_exists(&mut self, args: &[Bytes]) -> Reply {
        if args.is_empty() {
            return wrong_arity("EXISTS");
        }
        let count = args.iter().filter(|key| self.exists(key)).count();
        Reply::Integer(count as i64)
    }

    /// EXPIREAT key ms
    fn cmd_expireat(&mut self, args: &[Bytes]) -> Reply {
        if args.len() != 2 {
            return wrong_arity("EXPIREAT");
        }
        match parse_integer(&args[1]) {
            Some(when) => Reply::flag(self.expire_at(&args[0], when)),
            None => Reply::error("ERR invalid expire time"),
        }
    }

    /// PERSIST key
    fn cmd_persist(&mut self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("PERSIST");
        }
        Reply::flag(self.persist(&args[0]))
    }

    /// PTTL key
    ///
    /// Returns -2 for a missing key and -1 for a key without expiry.
    fn cmd_pttl(&mut self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("PTTL");
        }
        match self.pttl(&args[0]) {
            Ttl::Missing => Reply::Integer(-2),
            Ttl::Persistent => Reply::Integer(-1),
            Ttl::Remaining(ms) => Reply::Integer(ms),
        }
    }

    /// SLOT key
    fn cmd_slot(&mut self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("SLOT");
        }
        Reply::Integer(self.keyspace.slot_of(&args[0]) as i64)
    }

    /// COUNTKEYSINSLOT slot
    fn cmd_countkeysinslot(&mut self, args: &[Bytes]) -> Reply {
        if args.len() != 1 {
            return wrong_arity("COUNTKEYSINSLOT");
        }
        match parse_integer(&args[0]) {
            Some(slot) if slot >= 0 && (slot as usize) < self.keyspace.num_slots() => {
                Reply::Integer(self.keyspace.count_keys_in_slot(slot as usize) as i64)
            }
            _ => Reply::error("ERR invalid slot"),
        }
    }

    // ========================================================================
    // Server Commands
    // ========================================================================

    /// DBSIZE
    fn cmd_dbsize(&mut self, _args: &[Bytes]) -> Reply {
        Reply::Integer(self.dbsize() as i64)
    }

    /// FLUSH / FLUSHALL / FLUSHDB
    fn cmd_flush(&mut self, _args: &[Bytes]) -> Reply {
        let removed = self.flush();
        debug!(removed, "flush command");
        Reply::Ok
    }

    /// INFO
    fn cmd_info(&mut self, _args: &[Bytes]) -> Reply {
        let mem = self.keyspace.memory_info();
        self.keyspace.stats_mut().observe_memory(mem.used_memory);

        let stats = *self.keyspace.stats();
        let uptime = (self.keyspace.now_ms() - stats.starttime).max(0) / 1000;
        let hit_ratio = stats
            .hit_ratio()
            .map(|r| format!("{:.2}", r))
            .unwrap_or_else(|| "-".to_string());

        let info = format!(
            "# Server\r\n\
             slotkv_version:{}\r\n\
             uptime_in_seconds:{}\r\n\
             \r\n\
             # Stats\r\n\
             total_commands_processed:{}\r\n\
             keyspace_hits:{}\r\n\
             keyspace_misses:{}\r\n\
             keyspace_hit_ratio:{}\r\n\
             expired_keys:{}\r\n\
             evicted_keys:{}\r\n\
             \r\n\
             # Memory\r\n\
             used_memory:{}\r\n\
             used_memory_peak:{}\r\n\
             \r\n\
             # Keyspace\r\n\
             db0:keys={},expires={},slots={}\r\n",
            crate::VERSION,
            uptime,
            stats.numcommands,
            stats.keyspace_hits,
            stats.keyspace_misses,
            hit_ratio,
            stats.expiredkeys,
            stats.evictedkeys,
            mem.used_memory,
            stats.peak_memory,
            mem.keys,
            self.keyspace.expires_len(),
            self.keyspace.num_slots(),
        );

        Reply::bulk(info)
    }
}

fn wrong_arity(cmd: &str) -> Reply {
    Reply::error(format!(
        "ERR wrong number of arguments for '{}' command",
        cmd
    ))
}

fn check_string_length(len: usize, max: usize) -> StoreResult<()> {
    if len > max {
        return Err(StoreError::StringTooLong { len, max });
    }
    Ok(())
}

fn parse_integer(arg: &[u8]) -> Option<i64> {
    std::str::from_utf8(arg).ok().and_then(|s| s.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Encoding, ManualClock};
    use test_case::test_case;

    fn create_handler() -> (CommandHandler, ManualClock) {
        let clock = ManualClock::new(1_000);
        let config = KeyspaceConfig {
            num_slots: 16,
            max_string_len: 16,
        };
        let handler = CommandHandler::with_clock(config, Arc::new(clock.clone()));
        (handler, clock)
    }

    fn make_command(args: &[&str]) -> Vec<Bytes> {
        args.iter().map(|s| Bytes::from(s.to_string())).collect()
    }

    fn get_bytes(handler: &mut CommandHandler, key: &[u8]) -> Option<Vec<u8>> {
        handler.get(key).map(|v| v.as_bytes().into_owned())
    }

    #[test]
    fn test_set_get() {
        let (mut handler, _) = create_handler();

        handler.set(b"key", b"value", None);
        assert_eq!(get_bytes(&mut handler, b"key"), Some(b"value".to_vec()));
        assert_eq!(get_bytes(&mut handler, b"missing"), None);
    }

    #[test]
    fn test_set_with_expiry() {
        let (mut handler, clock) = create_handler();

        handler.set(b"key", b"value", Some(1_500));
        assert_eq!(handler.pttl(b"key"), Ttl::Remaining(500));

        clock.set(1_501);
        assert!(handler.get(b"key").is_none());
        assert_eq!(handler.pttl(b"key"), Ttl::Missing);
    }

    #[test]
    fn test_set_clears_previous_expiry() {
        let (mut handler, _) = create_handler();

        handler.set(b"key", b"a", Some(5_000));
        handler.set(b"key", b"b", None);
        assert_eq!(handler.pttl(b"key"), Ttl::Persistent);
    }

    #[test]
    fn test_zero_expiry_means_persistent() {
        let (mut handler, clock) = create_handler();

        handler.set(b"set", b"v", Some(0));
        assert!(handler.add(b"add", b"v", Some(0)));
        handler.set(b"replace", b"old", Some(5_000));
        assert!(handler.replace(b"replace", b"v", Some(0)));
        handler.set(b"negative", b"v", Some(-1));

        clock.advance(10_000);
        for key in [&b"set"[..], b"add", b"replace", b"negative"] {
            assert_eq!(get_bytes(&mut handler, key), Some(b"v".to_vec()));
            assert_eq!(handler.pttl(key), Ttl::Persistent);
        }
        assert_eq!(handler.keyspace().expires_len(), 0);
        assert_eq!(handler.keyspace().stats().expiredkeys, 0);
    }

    #[test]
    fn test_incr_empty_value() {
        let (mut handler, _) = create_handler();

        handler.set(b"e", b"", None);
        assert_eq!(handler.incr(b"e"), Ok(1));
        assert_eq!(handler.get(b"e").unwrap().encoding(), Encoding::Integer);
    }

    #[test]
    fn test_add_replace_exclusive() {
        let (mut handler, _) = create_handler();

        assert!(!handler.replace(b"key", b"a", None));
        assert!(handler.keyspace().is_empty());

        assert!(handler.add(b"key", b"a", None));
        assert!(!handler.add(b"key", b"b", None));
        assert_eq!(get_bytes(&mut handler, b"key"), Some(b"a".to_vec()));

        assert!(handler.replace(b"key", b"c", Some(9_000)));
        assert_eq!(get_bytes(&mut handler, b"key"), Some(b"c".to_vec()));
        assert_eq!(handler.pttl(b"key"), Ttl::Remaining(8_000));
    }

    #[test]
    fn test_add_over_expired_key() {
        let (mut handler, clock) = create_handler();

        handler.set(b"key", b"old", Some(1_100));
        clock.advance(200);
        assert!(handler.add(b"key", b"new", None));
        assert_eq!(handler.get(b"key").unwrap().version(), 0);
    }

    #[test]
    fn test_append_and_prepend() {
        let (mut handler, _) = create_handler();

        handler.set(b"s", b"hello", None);
        assert_eq!(handler.append(b"s", b"world"), Ok(10));
        assert_eq!(get_bytes(&mut handler, b"s"), Some(b"helloworld".to_vec()));

        assert_eq!(handler.prepend(b"s", b">"), Ok(11));
        assert_eq!(get_bytes(&mut handler, b"s"), Some(b">helloworld".to_vec()));
    }

    #[test]
    fn test_append_to_integer() {
        let (mut handler, _) = create_handler();

        handler.set(b"n", b"12", None);
        assert_eq!(handler.get(b"n").unwrap().encoding(), Encoding::Integer);

        assert_eq!(handler.append(b"n", b"34"), Ok(4));
        let value = handler.get(b"n").unwrap();
        assert_eq!(value.encoding(), Encoding::Raw);
        assert_eq!(&value.as_bytes()[..], b"1234");
        assert_eq!(value.version(), 1);
    }

    #[test]
    fn test_append_creates_missing_key() {
        let (mut handler, _) = create_handler();

        assert_eq!(handler.append(b"a", b"xyz"), Ok(3));
        assert_eq!(handler.prepend(b"p", b"42"), Ok(2));
        assert_eq!(handler.get(b"p").unwrap().encoding(), Encoding::Integer);
        assert_eq!(handler.get(b"p").unwrap().version(), 0);
    }

    #[test]
    fn test_append_keeps_ttl() {
        let (mut handler, _) = create_handler();

        handler.set(b"s", b"a", Some(2_000));
        handler.append(b"s", b"b").unwrap();
        assert_eq!(handler.pttl(b"s"), Ttl::Remaining(1_000));
    }

    #[test]
    fn test_append_too_long_leaves_value() {
        let (mut handler, _) = create_handler();

        handler.set(b"s", b"0123456789", None);
        let err = handler.append(b"s", b"abcdefg").unwrap_err();
        assert_eq!(err, StoreError::StringTooLong { len: 17, max: 16 });

        let value = handler.get(b"s").unwrap();
        assert_eq!(&value.as_bytes()[..], b"0123456789");
        assert_eq!(value.version(), 0);

        assert!(handler.prepend(b"new", &[b'x'; 17]).is_err());
        assert!(!handler.exists(b"new"));
    }

    #[test]
    fn test_incr_decr() {
        let (mut handler, _) = create_handler();

        handler.set(b"a", b"100", None);
        assert_eq!(handler.incr(b"a"), Ok(101));
        assert_eq!(handler.decr(b"a"), Ok(100));
        assert_eq!(handler.incr_by(b"a", 50), Ok(150));
        assert_eq!(handler.decr_by(b"a", 200), Ok(-50));

        let value = handler.get(b"a").unwrap();
        assert_eq!(value.encoding(), Encoding::Integer);
        assert_eq!(value.version(), 4);
    }

    #[test]
    fn test_incr_missing_key() {
        let (mut handler, _) = create_handler();

        assert_eq!(handler.incr(b"counter"), Ok(1));
        assert_eq!(handler.decr(b"other"), Ok(-1));
        assert_eq!(handler.get(b"counter").unwrap().version(), 0);
    }

    #[test]
    fn test_incr_not_integer() {
        let (mut handler, _) = create_handler();

        handler.set(b"s", b"abc", None);
        assert_eq!(handler.incr(b"s"), Err(StoreError::NotAnInteger));
        assert_eq!(get_bytes(&mut handler, b"s"), Some(b"abc".to_vec()));
    }

    #[test_case(i64::MAX, 1 ; "max plus one")]
    #[test_case(i64::MAX - 5, 6 ; "near max")]
    #[test_case(i64::MIN, -1 ; "min minus one")]
    #[test_case(-2, i64::MIN ; "negative plus min")]
    fn test_incr_overflow(start: i64, delta: i64) {
        let (mut handler, _) = create_handler();

        handler.set(b"n", start.to_string().as_bytes(), None);
        assert_eq!(handler.incr_by(b"n", delta), Err(StoreError::Overflow));

        let value = handler.get(b"n").unwrap();
        assert_eq!(value.to_integer(), Ok(start));
        assert_eq!(value.version(), 0);
    }

    #[test]
    fn test_incr_reaches_limits() {
        let (mut handler, _) = create_handler();

        handler.set(b"n", (i64::MAX - 1).to_string().as_bytes(), None);
        assert_eq!(handler.incr(b"n"), Ok(i64::MAX));
        assert_eq!(handler.incr_by(b"n", i64::MIN), Ok(-1));
        assert_eq!(handler.decr_by(b"n", i64::MIN), Err(StoreError::Overflow));
    }

    #[test]
    fn test_incr_keeps_ttl() {
        let (mut handler, _) = create_handler();

        handler.set(b"n", b"1", Some(3_000));
        handler.incr(b"n").unwrap();
        assert_eq!(handler.pttl(b"n"), Ttl::Remaining(2_000));
    }

    #[test]
    fn test_delete() {
        let (mut handler, clock) = create_handler();

        handler.set(b"key", b"value", None);
        assert!(handler.delete(b"key"));
        assert!(!handler.delete(b"key"));

        handler.set(b"ttl", b"value", Some(1_010));
        clock.advance(20);
        assert!(!handler.delete(b"ttl"));
        assert_eq!(handler.keyspace().stats().expiredkeys, 1);
    }

    #[test]
    fn test_expire_at_and_persist() {
        let (mut handler, _) = create_handler();

        assert!(!handler.expire_at(b"key", 2_000));
        assert!(!handler.persist(b"key"));

        handler.set(b"key", b"v", None);
        assert!(!handler.persist(b"key"));
        assert!(handler.expire_at(b"key", 2_000));
        assert_eq!(handler.pttl(b"key"), Ttl::Remaining(1_000));
        assert!(handler.persist(b"key"));
        assert_eq!(handler.pttl(b"key"), Ttl::Persistent);
    }

    #[test]
    fn test_flush() {
        let (mut handler, _) = create_handler();

        handler.set(b"a", b"1", None);
        handler.set(b"b", b"2", Some(9_000));
        assert_eq!(handler.flush(), 2);
        assert_eq!(handler.dbsize(), 0);
        assert!(handler.get(b"a").is_none());
        handler.keyspace().assert_consistent();
    }

    // ========================================================================
    // Textual commands
    // ========================================================================

    #[test]
    fn test_execute_set_get() {
        let (mut handler, _) = create_handler();

        let response = handler.execute(&make_command(&["SET", "key", "value"]));
        assert_eq!(response, Reply::Ok);

        let response = handler.execute(&make_command(&["get", "key"]));
        assert_eq!(response, Reply::bulk("value"));

        let response = handler.execute(&make_command(&["GET", "missing"]));
        assert_eq!(response, Reply::Nil);
    }

    #[test]
    fn test_execute_counts_commands() {
        let (mut handler, _) = create_handler();

        handler.execute(&make_command(&["SET", "a", "1"]));
        handler.execute(&make_command(&["INCR", "a"]));
        handler.execute(&make_command(&["NOPE"]));
        handler.execute(&[]);

        assert_eq!(handler.keyspace().stats().numcommands, 3);
    }

    #[test]
    fn test_execute_integer_commands() {
        let (mut handler, _) = create_handler();

        assert_eq!(
            handler.execute(&make_command(&["INCR", "n"])),
            Reply::Integer(1)
        );
        assert_eq!(
            handler.execute(&make_command(&["INCRBY", "n", "10"])),
            Reply::Integer(11)
        );
        assert_eq!(
            handler.execute(&make_command(&["DECRBY", "n", "20"])),
            Reply::Integer(-9)
        );
        assert_eq!(
            handler.execute(&make_command(&["DECR", "n"])),
            Reply::Integer(-10)
        );
        assert!(handler
            .execute(&make_command(&["INCRBY", "n", "ten"]))
            .is_error());
    }

    #[test]
    fn test_execute_add_replace() {
        let (mut handler, _) = create_handler();

        assert_eq!(
            handler.execute(&make_command(&["REPLACE", "k", "v"])),
            Reply::Integer(0)
        );
        assert_eq!(
            handler.execute(&make_command(&["ADD", "k", "v"])),
            Reply::Integer(1)
        );
        assert_eq!(
            handler.execute(&make_command(&["ADD", "k", "w"])),
            Reply::Integer(0)
        );
        assert_eq!(
            handler.execute(&make_command(&["REPLACE", "k", "w", "5000"])),
            Reply::Integer(1)
        );
        assert_eq!(
            handler.execute(&make_command(&["PTTL", "k"])),
            Reply::Integer(4_000)
        );
    }

    #[test]
    fn test_execute_append_error() {
        let (mut handler, _) = create_handler();

        assert_eq!(
            handler.execute(&make_command(&["APPEND", "s", "0123456789"])),
            Reply::Integer(10)
        );
        let response = handler.execute(&make_command(&["PREPEND", "s", "0123456789"]));
        assert_eq!(
            response,
            Reply::error("ERR string exceeds maximum allowed size: 20 bytes (max: 16)")
        );
    }

    #[test]
    fn test_execute_key_commands() {
        let (mut handler, _) = create_handler();

        handler.execute(&make_command(&["SET", "a", "1"]));
        handler.execute(&make_command(&["SET", "b", "2"]));

        assert_eq!(
            handler.execute(&make_command(&["EXISTS", "a", "b", "c"])),
            Reply::Integer(2)
        );
        assert_eq!(
            handler.execute(&make_command(&["PTTL", "a"])),
            Reply::Integer(-1)
        );
        assert_eq!(
            handler.execute(&make_command(&["PTTL", "c"])),
            Reply::Integer(-2)
        );
        assert_eq!(
            handler.execute(&make_command(&["EXPIREAT", "a", "1500"])),
            Reply::Integer(1)
        );
        assert_eq!(
            handler.execute(&make_command(&["PERSIST", "a"])),
            Reply::Integer(1)
        );
        assert_eq!(
            handler.execute(&make_command(&["DEL", "a", "b", "c"])),
            Reply::Integer(2)
        );
        assert_eq!(
            handler.execute(&make_command(&["DBSIZE"])),
            Reply::Integer(0)
        );
    }

    #[test]
    fn test_execute_slots() {
        let (mut handler, _) = create_handler();

        handler.execute(&make_command(&["SET", "user:1", "x"]));
        let slot = handler
            .execute(&make_command(&["SLOT", "user:1"]))
            .as_integer()
            .unwrap();
        assert!((0..16).contains(&slot));

        assert_eq!(
            handler.execute(&make_command(&["COUNTKEYSINSLOT", &slot.to_string()])),
            Reply::Integer(1)
        );
        assert!(handler
            .execute(&make_command(&["COUNTKEYSINSLOT", "16"]))
            .is_error());
    }

    #[test]
    fn test_execute_flush_and_info() {
        let (mut handler, _) = create_handler();

        handler.execute(&make_command(&["SET", "a", "1"]));
        handler.execute(&make_command(&["GET", "a"]));
        assert_eq!(handler.execute(&make_command(&["FLUSHALL"])), Reply::Ok);
        assert_eq!(handler.dbsize(), 0);

        let info = handler.execute(&make_command(&["INFO"]));
        let text = String::from_utf8(info.as_bytes().unwrap().to_vec()).unwrap();
        assert!(text.contains("total_commands_processed:4"));
        assert!(text.contains("keyspace_hits:1"));
        assert!(text.contains("db0:keys=0,expires=0,slots=16"));
    }

    #[test_case(&["GET"] ; "get without key")]
    #[test_case(&["SET", "k"] ; "set without value")]
    #[test_case(&["SET", "k", "v", "-5"] ; "negative expiry")]
    #[test_case(&["APPEND", "k"] ; "append without value")]
    #[test_case(&["DEL"] ; "del without keys")]
    #[test_case(&["EXPIREAT", "k", "soon"] ; "non numeric expiry")]
    #[test_case(&["UNKNOWN"] ; "unknown command")]
    fn test_execute_rejects(args: &[&str]) {
        let (mut handler, _) = create_handler();

        assert!(handler.execute(&make_command(args)).is_error());
        assert!(handler.keyspace().is_empty());
    }
}
