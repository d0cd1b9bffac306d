//! Application configuration structures.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use taskyard_core::TelemetryConfig;

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name and metadata.
    #[serde(default)]
    pub app: AppMetadata,

    /// Redis configuration.
    #[serde(default)]
    pub redis: RedisConfig,

    /// Logging configuration.
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Application metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppMetadata {
    /// Application name.
    pub name: String,
    /// Application version.
    pub version: String,
    /// Environment (development, staging, production).
    pub environment: String,
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self {
            name: "taskyard".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            environment: "development".to_string(),
        }
    }
}

/// Redis connection configuration for the queue store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    /// Redis URL.
    #[serde(default = "default_redis_url")]
    pub url: String,

    /// Connection pool size.
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,

    /// Timeout for establishing the first connection, in seconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Deadline applied to every store round trip, in milliseconds.
    /// `0` disables the deadline.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,

    /// Prefix for the five queue keys.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            url: default_redis_url(),
            pool_size: default_pool_size(),
            connect_timeout_secs: default_connect_timeout(),
            command_timeout_ms: default_command_timeout(),
            key_prefix: default_key_prefix(),
        }
    }
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_pool_size() -> usize {
    10
}

fn default_connect_timeout() -> u64 {
    5
}

fn default_command_timeout() -> u64 {
    5000
}

fn default_key_prefix() -> String {
    "taskyard".to_string()
}

impl RedisConfig {
    /// Returns the connect timeout as a `Duration`.
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Returns the per-command deadline, if one is configured.
    #[must_use]
    pub fn command_timeout(&self) -> Option<Duration> {
        (self.command_timeout_ms > 0).then(|| Duration::from_millis(self.command_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redis_defaults() {
        let config = RedisConfig::default();
        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.pool_size, 10);
        assert_eq!(config.key_prefix, "taskyard");
        assert_eq!(config.connect_timeout(), Duration::from_secs(5));
        assert_eq!(config.command_timeout(), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn test_zero_command_timeout_disables_deadline() {
        let config = RedisConfig {
            command_timeout_ms: 0,
            ..RedisConfig::default()
        };
        assert_eq!(config.command_timeout(), None);
    }

    #[test]
    fn test_partial_redis_section_uses_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{"redis":{"key_prefix":"asynq"}}"#).unwrap();
        assert_eq!(config.redis.key_prefix, "asynq");
        assert_eq!(config.redis.pool_size, 10);
        assert_eq!(config.app.name, "taskyard");
    }
}
