//! Configuration validation module.
//!
//! Collects every problem in one pass so a bad deployment fails fast with a
//! complete report instead of one error at a time.

use crate::AppConfig;
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Pool size must be at least one.
    EmptyPool,
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: usize, maximum: usize },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Queue key prefix is empty or contains whitespace.
    InvalidKeyPrefix { value: String },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::EmptyPool => write!(f, "Redis pool size must be at least 1"),
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(
                    f,
                    "Pool size {} exceeds maximum allowed ({})",
                    value, maximum
                )
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::InvalidKeyPrefix { value } => {
                write!(
                    f,
                    "Invalid key prefix: '{}' (must be non-empty without whitespace)",
                    value
                )
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: usize = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];

    /// Validates the entire application configuration.
    ///
    /// Returns Ok(()) if valid, or Err with all validation errors found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_redis(&config.redis, &mut errors);
        Self::validate_telemetry(&config.telemetry, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validates Redis configuration.
    fn validate_redis(config: &crate::RedisConfig, errors: &mut Vec<ConfigValidationError>) {
        if !config.url.starts_with("redis://") && !config.url.starts_with("rediss://") {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: "URL must start with redis:// or rediss://".to_string(),
            });
        } else if let Err(e) = Url::parse(&config.url) {
            errors.push(ConfigValidationError::InvalidUrl {
                url_type: "redis".to_string(),
                message: e.to_string(),
            });
        }

        if config.pool_size == 0 {
            errors.push(ConfigValidationError::EmptyPool);
        } else if config.pool_size > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.pool_size,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        // command_timeout_ms = 0 is allowed and disables the per-command deadline.
        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "redis.connect_timeout_secs".to_string(),
                value: 0,
            });
        }

        if config.key_prefix.is_empty() || config.key_prefix.chars().any(char::is_whitespace) {
            errors.push(ConfigValidationError::InvalidKeyPrefix {
                value: config.key_prefix.clone(),
            });
        }
    }

    /// Validates telemetry configuration.
    ///
    /// `format` is a closed enum, so unknown values already fail when the
    /// configuration is deserialized.
    fn validate_telemetry(
        config: &taskyard_core::TelemetryConfig,
        errors: &mut Vec<ConfigValidationError>,
    ) {
        let level = config.level.to_lowercase();
        if !Self::VALID_LOG_LEVELS.contains(&level.as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.level.clone(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RedisConfig;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_zero_command_timeout_is_valid() {
        let mut config = AppConfig::default();
        config.redis.command_timeout_ms = 0;

        assert!(ConfigValidator::validate(&config).is_ok());
        assert!(config.redis.command_timeout().is_none());
    }

    #[test]
    fn test_zero_connect_timeout_is_rejected() {
        let mut config = AppConfig::default();
        config.redis.connect_timeout_secs = 0;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigValidationError::NonPositiveTimeout {
                name: "redis.connect_timeout_secs".to_string(),
                value: 0,
            }]
        );
    }

    #[test]
    fn test_rejects_non_redis_url() {
        let mut config = AppConfig::default();
        config.redis.url = "http://localhost:6379".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ConfigValidationError::InvalidUrl { .. }));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = AppConfig::default();
        config.redis = RedisConfig {
            url: "localhost".to_string(),
            pool_size: 0,
            connect_timeout_secs: 0,
            command_timeout_ms: 0,
            key_prefix: "my queue".to_string(),
        };
        config.telemetry.level = "verbose".to_string();

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(errors.len(), 5);
        assert!(errors.contains(&ConfigValidationError::EmptyPool));
        assert!(errors.contains(&ConfigValidationError::InvalidKeyPrefix {
            value: "my queue".to_string()
        }));
        assert!(errors.contains(&ConfigValidationError::InvalidLogLevel {
            value: "verbose".to_string()
        }));
    }

    #[test]
    fn test_pool_size_upper_bound() {
        let mut config = AppConfig::default();
        config.redis.pool_size = 5000;

        let errors = ConfigValidator::validate(&config).unwrap_err();
        assert_eq!(
            errors,
            vec![ConfigValidationError::PoolSizeTooLarge {
                value: 5000,
                maximum: 1000
            }]
        );
    }

    #[test]
    fn test_error_display() {
        let err = ConfigValidationError::NonPositiveTimeout {
            name: "redis.connect_timeout_secs".to_string(),
            value: 0,
        };
        assert_eq!(
            err.to_string(),
            "Timeout 'redis.connect_timeout_secs' must be positive, got 0"
        );
    }
}
