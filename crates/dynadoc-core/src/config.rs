//! Client configuration.

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::codec::{CodecOptions, EmptySetPolicy, NumericStrings};

/// Default number of attempts for a batch chunk before leftovers are reported.
pub const DEFAULT_BATCH_MAX_ATTEMPTS: u32 = 3;

/// Table client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynadocConfig {
    /// How digit-only strings are encoded.
    pub numeric_strings: NumericStrings,
    /// What happens to empty sets on encode.
    pub empty_sets: EmptySetPolicy,
    /// Attempts per batch chunk, including the first.
    pub batch_max_attempts: u32,
    /// `Limit` sent with every query and scan page.
    pub page_size: Option<i32>,
    /// Request strongly consistent reads.
    pub consistent_read: bool,
}

impl DynadocConfig {
    /// Create configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            numeric_strings: env_parse("DYNADOC_NUMERIC_STRINGS", defaults.numeric_strings),
            empty_sets: env_parse("DYNADOC_EMPTY_SETS", defaults.empty_sets),
            batch_max_attempts: env_parse("DYNADOC_BATCH_MAX_ATTEMPTS", defaults.batch_max_attempts)
                .max(1),
            page_size: env::var("DYNADOC_PAGE_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n: &i32| *n > 0),
            consistent_read: env_bool("DYNADOC_CONSISTENT_READ", defaults.consistent_read),
        }
    }

    /// Codec options derived from this configuration.
    #[must_use]
    pub fn codec_options(&self) -> CodecOptions {
        CodecOptions {
            numeric_strings: self.numeric_strings,
            empty_sets: self.empty_sets,
        }
    }
}

impl Default for DynadocConfig {
    fn default() -> Self {
        Self {
            numeric_strings: NumericStrings::default(),
            empty_sets: EmptySetPolicy::default(),
            batch_max_attempts: DEFAULT_BATCH_MAX_ATTEMPTS,
            page_size: None,
            consistent_read: false,
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key).map_or(default, |v| {
        matches!(v.as_str(), "1" | "true" | "yes" | "TRUE" | "YES")
    })
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, "ignoring invalid configuration value");
            default
        }),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_default_to_source_compatible_codec() {
        let config = DynadocConfig::default();
        assert_eq!(config.numeric_strings, NumericStrings::Digits);
        assert_eq!(config.empty_sets, EmptySetPolicy::Reject);
        assert_eq!(config.batch_max_attempts, 3);
        assert_eq!(config.codec_options(), CodecOptions::default());
    }

    #[test]
    fn test_should_fall_back_on_unparsable_values() {
        // Keys unique to this test so parallel tests cannot interfere.
        assert_eq!(env_parse("DYNADOC_TEST_UNSET_KEY", 7_u32), 7);
        assert!(env_bool("DYNADOC_TEST_UNSET_BOOL", true));
    }
}
