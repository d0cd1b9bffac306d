//! Logging setup built on `tracing-subscriber`.

use crate::{TaskyardError, TaskyardResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Output format of the log layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-field lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Telemetry configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Base log level (trace, debug, info, warn, error).
    #[serde(default = "default_level")]
    pub level: String,

    /// Log output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Whether to print the event target (module path).
    #[serde(default = "default_with_target")]
    pub with_target: bool,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_with_target() -> bool {
    true
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
            with_target: default_with_target(),
        }
    }
}

impl TelemetryConfig {
    /// Filter directive used when `RUST_LOG` is not set.
    #[must_use]
    pub fn filter_directive(&self) -> String {
        format!("{},taskyard=debug", self.level)
    }
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level. Calling this more
/// than once is harmless: the first subscriber stays installed and later calls
/// return `Ok(())`.
pub fn init_telemetry(config: &TelemetryConfig) -> TaskyardResult<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(config.filter_directive())
            .map_err(|e| TaskyardError::Telemetry(format!("Invalid log filter: {}", e)))?,
    };

    let registry = tracing_subscriber::registry().with(filter);

    let installed = match config.format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_target(config.with_target))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(config.with_target),
            )
            .try_init(),
    };

    match installed {
        Ok(()) => {
            tracing::info!(level = %config.level, format = ?config.format, "Telemetry initialized");
        }
        Err(e) => {
            tracing::debug!(error = %e, "Tracing subscriber already installed");
        }
    }

    Ok(())
}
