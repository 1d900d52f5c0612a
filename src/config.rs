//! Keyspace configuration.

use thiserror::Error;

/// Default number of slots the keyspace is partitioned into.
pub const DEFAULT_NUM_SLOTS: usize = 16384;

/// Default upper bound for a string grown by APPEND/PREPEND (512 MB).
pub const DEFAULT_MAX_STRING_LEN: usize = 512 * 1024 * 1024;

/// Errors raised by [`KeyspaceConfig::validate`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("slot count must be positive")]
    ZeroSlots,

    #[error("maximum string length must be positive")]
    ZeroMaxStringLen,
}

/// Settings fixed for the lifetime of a keyspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceConfig {
    /// Number of slots keys are partitioned into
    pub num_slots: usize,
    /// Longest string APPEND/PREPEND may produce, in bytes
    pub max_string_len: usize,
}

impl Default for KeyspaceConfig {
    fn default() -> Self {
        Self {
            num_slots: DEFAULT_NUM_SLOTS,
            max_string_len: DEFAULT_MAX_STRING_LEN,
        }
    }
}

impl KeyspaceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.num_slots == 0 {
            return Err(ConfigError::ZeroSlots);
        }
        if self.max_string_len == 0 {
            return Err(ConfigError::ZeroMaxStringLen);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = KeyspaceConfig::default();
        assert_eq!(config.num_slots, 16384);
        assert_eq!(config.max_string_len, 512 * 1024 * 1024);
        assert_eq!(config.validate(), Ok(()));
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let config = KeyspaceConfig {
            num_slots: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroSlots));

        let config = KeyspaceConfig {
            max_string_len: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::ZeroMaxStringLen));
    }
}
