//! Capacity and expiry presets for the caches the bot keeps.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub max_capacity: u64,
    pub ttl: Option<Duration>,
    pub tti: Option<Duration>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::chat_settings()
    }
}

impl CacheConfig {
    /// Per-chat policy records read on every message: flood, locks,
    /// blacklist, warn and captcha settings, filters.
    /// Writes go through the repository, which refreshes the entry.
    pub fn chat_settings() -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(Duration::from_secs(600)),
            tti: None,
        }
    }

    /// User and chat records used for `@username` resolution.
    pub fn lookup() -> Self {
        Self {
            max_capacity: 20_000,
            ttl: Some(Duration::from_secs(1800)),
            tti: Some(Duration::from_secs(600)),
        }
    }

    /// Bot team roster. Managed outside the bot, so entries expire sooner.
    pub fn team() -> Self {
        Self {
            max_capacity: 1_000,
            ttl: Some(Duration::from_secs(300)),
            tti: None,
        }
    }

    /// Admin lists, bounded by the configured staleness.
    pub fn admin_lists(ttl: Duration) -> Self {
        Self {
            max_capacity: 10_000,
            ttl: Some(ttl),
            tti: None,
        }
    }

    /// Compiled matchers: pure LRU, rebuilt on invalidation only.
    pub fn matchers(capacity: u64) -> Self {
        Self {
            max_capacity: capacity,
            ttl: None,
            tti: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(CacheConfig::default(), CacheConfig::chat_settings());
        assert_eq!(CacheConfig::admin_lists(Duration::from_secs(3600)).ttl, Some(Duration::from_secs(3600)));
        assert_eq!(CacheConfig::matchers(1000).ttl, None);
        assert_eq!(CacheConfig::matchers(1000).max_capacity, 1000);
    }
}
