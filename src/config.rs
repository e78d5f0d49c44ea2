//! Configuration loaded from an optional TOML file.
//!
//! Every field has a default, so an absent file or an empty section yields a
//! working configuration. Command-line flags override individual values after
//! loading.
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub store: StoreConfig,
    pub review: ReviewConfig,
    pub server: ServerConfig,
}

/// Thresholds used by the aggregation stages.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct AnalysisConfig {
    pub default_window_minutes: u32,
    pub top_components: usize,
    /// A component logging strictly faster than this is flagged as high volume.
    pub high_volume_per_minute: f64,
    /// More than this many errors from one component inside a minute is a burst.
    pub burst_error_threshold: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            default_window_minutes: 30,
            top_components: 10,
            high_volume_per_minute: 5.0,
            burst_error_threshold: 5,
        }
    }
}

/// Longest retention accepted by `validate`, one hundred years.
pub const MAX_RETENTION_HOURS: u64 = 100 * 365 * 24;

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct StoreConfig {
    pub buffer_capacity: usize,
    pub retrieval_timeout_ms: u64,
    pub retention_hours: u64,
    pub prune_interval_minutes: u64,
}

impl StoreConfig {
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval_timeout_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_hours.saturating_mul(60 * 60))
    }

    pub fn prune_interval(&self) -> Duration {
        Duration::from_secs(self.prune_interval_minutes.saturating_mul(60))
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 1000,
            retrieval_timeout_ms: 5000,
            retention_hours: 7 * 24,
            prune_interval_minutes: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ReviewConfig {
    pub interval_minutes: u32,
    pub window_minutes: u32,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            interval_minutes: 5,
            window_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8787 }
    }
}

impl Config {
    /// Loads the config file at `path`, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.display().to_string(),
                        source,
                    })?;
                let config = Self::from_toml(&content)?;
                info!("Configuration loaded from {:?}", path);
                config
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.analysis.default_window_minutes == 0 {
            return Err(invalid("analysis.default_window_minutes must be positive"));
        }
        if self.analysis.top_components == 0 {
            return Err(invalid("analysis.top_components must be positive"));
        }
        let rate = self.analysis.high_volume_per_minute;
        if !rate.is_finite() || rate <= 0.0 {
            return Err(invalid("analysis.high_volume_per_minute must be positive"));
        }
        if self.analysis.burst_error_threshold == 0 {
            return Err(invalid("analysis.burst_error_threshold must be positive"));
        }
        if self.store.buffer_capacity == 0 {
            return Err(invalid("store.buffer_capacity must be positive"));
        }
        if self.store.retrieval_timeout_ms == 0 {
            return Err(invalid("store.retrieval_timeout_ms must be positive"));
        }
        if self.store.retention_hours == 0 || self.store.retention_hours > MAX_RETENTION_HOURS {
            return Err(ConfigError::Invalid(format!(
                "store.retention_hours must be between 1 and {}",
                MAX_RETENTION_HOURS
            )));
        }
        if self.store.prune_interval_minutes == 0 {
            return Err(invalid("store.prune_interval_minutes must be positive"));
        }
        if self.review.interval_minutes == 0 || self.review.window_minutes == 0 {
            return Err(invalid("review intervals must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::Invalid(message.to_string())
}
