//! Configuration module for Warden.
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Bot running mode
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BotMode {
    #[default]
    Polling,
    Webhook,
}

/// Persistent store backend.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Mongo,
    Memory,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Tunables of the enforcement core.
#[derive(Debug, Clone)]
pub struct Limits {
    /// Security gate: events allowed per user within `rate_limit_window`.
    pub rate_limit_max: usize,
    pub rate_limit_window: Duration,

    /// Deadline for a single handler invocation.
    pub handler_timeout: Duration,

    /// Admin list staleness bound.
    pub admin_cache_ttl: Duration,

    /// Token bucket refill interval (one token per interval).
    pub flood_refill_interval: Duration,

    /// Default antispam level.
    pub antispam_limit: u32,
    pub antispam_window: Duration,

    pub matcher_cache_capacity: u64,
    pub captcha_sweep_interval: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            rate_limit_max: 30,
            rate_limit_window: Duration::from_secs(60),
            handler_timeout: Duration::from_secs(30),
            admin_cache_ttl: Duration::from_secs(3600),
            flood_refill_interval: Duration::from_millis(1000),
            antispam_limit: 18,
            antispam_window: Duration::from_millis(1000),
            matcher_cache_capacity: 1000,
            captcha_sweep_interval: Duration::from_secs(30),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    // Telegram
    pub bot_token: String,
    pub bot_mode: BotMode,
    pub webhook_url: Option<String>,
    pub webhook_port: u16,
    pub webhook_secret: Option<String>,

    /// Bot username (without @) used to match `/cmd@bot`.
    /// Optional - will be fetched via getMe if not set.
    pub bot_username: Option<String>,

    /// Owner user IDs (comma-separated)
    /// These users bypass every permission check.
    pub owner_ids: Vec<u64>,

    // Storage
    pub store_backend: StoreBackend,
    pub mongodb_uri: Option<String>,
    pub mongodb_database: String,

    pub limits: Limits,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let bot_mode = match env::var("BOT_MODE")
            .unwrap_or_else(|_| "polling".to_string())
            .to_lowercase()
            .as_str()
        {
            "webhook" => BotMode::Webhook,
            _ => BotMode::Polling,
        };

        let webhook_url = env::var("WEBHOOK_URL").ok().filter(|s| !s.is_empty());
        if bot_mode == BotMode::Webhook && webhook_url.is_none() {
            return Err(ConfigError::Missing("WEBHOOK_URL"));
        }

        let store_backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "mongo".to_string())
            .to_lowercase()
            .as_str()
        {
            "memory" => StoreBackend::Memory,
            "mongo" | "mongodb" => StoreBackend::Mongo,
            other => {
                return Err(ConfigError::Invalid {
                    name: "STORE_BACKEND",
                    value: other.to_string(),
                });
            }
        };

        let mongodb_uri = env::var("MONGODB_URI").ok().filter(|s| !s.is_empty());
        if store_backend == StoreBackend::Mongo && mongodb_uri.is_none() {
            return Err(ConfigError::Missing("MONGODB_URI"));
        }

        let defaults = Limits::default();
        let limits = Limits {
            rate_limit_max: parse_var("RATE_LIMIT_MAX", defaults.rate_limit_max)?,
            rate_limit_window: secs_var("RATE_LIMIT_WINDOW_SECS", defaults.rate_limit_window)?,
            handler_timeout: secs_var("HANDLER_TIMEOUT_SECS", defaults.handler_timeout)?,
            admin_cache_ttl: secs_var("ADMIN_CACHE_TTL_SECS", defaults.admin_cache_ttl)?,
            flood_refill_interval: millis_var("FLOOD_REFILL_MS", defaults.flood_refill_interval)?,
            antispam_limit: parse_var("ANTISPAM_LIMIT", defaults.antispam_limit)?,
            antispam_window: millis_var("ANTISPAM_WINDOW_MS", defaults.antispam_window)?,
            matcher_cache_capacity: parse_var(
                "MATCHER_CACHE_CAPACITY",
                defaults.matcher_cache_capacity,
            )?,
            captcha_sweep_interval: secs_var("CAPTCHA_SWEEP_SECS", defaults.captcha_sweep_interval)?,
        };

        Ok(Self {
            bot_token: env::var("BOT_TOKEN").map_err(|_| ConfigError::Missing("BOT_TOKEN"))?,
            bot_mode,
            webhook_url,
            webhook_port: parse_var("WEBHOOK_PORT", 8080)?,
            webhook_secret: env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            bot_username: env::var("BOT_USERNAME")
                .ok()
                .map(|s| s.trim_start_matches('@').to_string())
                .filter(|s| !s.is_empty()),
            owner_ids: parse_id_list(&env::var("OWNER_IDS").unwrap_or_default()),
            store_backend,
            mongodb_uri,
            mongodb_database: env::var("MONGODB_DATABASE")
                .unwrap_or_else(|_| "warden".to_string()),
            limits,
        })
    }
}

/// Parse a comma-separated id list, skipping malformed entries.
pub fn parse_id_list(raw: &str) -> Vec<u64> {
    raw.split(',')
        .filter_map(|s| s.trim().parse::<u64>().ok())
        .collect()
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}

fn secs_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(name, default.as_secs()).map(Duration::from_secs)
}

fn millis_var(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_var(name, default.as_millis() as u64).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1, 2,x,3"), vec![1, 2, 3]);
        assert!(parse_id_list("").is_empty());
    }

    #[test]
    fn test_default_limits() {
        let limits = Limits::default();
        assert_eq!(limits.rate_limit_max, 30);
        assert_eq!(limits.rate_limit_window, Duration::from_secs(60));
        assert_eq!(limits.handler_timeout, Duration::from_secs(30));
        assert_eq!(limits.admin_cache_ttl, Duration::from_secs(3600));
        assert_eq!(limits.antispam_limit, 18);
    }
}
