//! Configuration loader with layered sources.

use crate::{AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use std::path::Path;
use std::sync::Arc;
use taskyard_core::TaskyardError;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Environment variable selecting the environment-specific config file.
pub const ENVIRONMENT_VAR: &str = "TASKYARD_ENVIRONMENT";

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<AppConfig>>,
    config_dir: String,
    environment: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides
    /// 4. Environment variables with `TASKYARD_` prefix and `__` separator
    pub fn new(config_dir: impl Into<String>) -> Result<Self, TaskyardError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var(ENVIRONMENT_VAR).unwrap_or_else(|_| "development".to_string());
        Self::with_environment(config_dir, environment)
    }

    /// Creates a loader for an explicit environment name.
    pub fn with_environment(
        config_dir: impl Into<String>,
        environment: impl Into<String>,
    ) -> Result<Self, TaskyardError> {
        let config_dir = config_dir.into();
        let environment = environment.into();
        let config = Self::load_config(&config_dir, &environment)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
            environment,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, TaskyardError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    ///
    /// The previous configuration stays in place if the new one is invalid.
    pub async fn reload(&self) -> Result<(), TaskyardError> {
        let new_config = Self::load_config(&self.config_dir, &self.environment)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str, environment: &str) -> Result<AppConfig, TaskyardError> {
        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = format!("{}/{}.toml", config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix("TASKYARD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error)?;
        let mut app_config: AppConfig = config.try_deserialize().map_err(config_error)?;
        app_config.app.environment = environment.to_string();

        ConfigValidator::validate(&app_config).map_err(|errors| {
            let joined = errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            TaskyardError::Configuration(joined)
        })?;

        Ok(app_config)
    }

    /// Gets a specific configuration value by key path.
    pub async fn get_value<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let config = self.config.read().await;
        let json = serde_json::to_value(&*config).ok()?;

        let mut current = &json;
        for part in key.split('.') {
            current = current.get(part)?;
        }

        serde_json::from_value(current.clone()).ok()
    }
}

fn config_error(err: ConfigError) -> TaskyardError {
    TaskyardError::Configuration(err.to_string())
}
