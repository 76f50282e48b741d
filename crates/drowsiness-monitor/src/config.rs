//! Monitor configuration

use alerting::AlertConfig;
use analysis_client::AnalysisConfig;
use camera_capture::CameraConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Environment variable prefix for overrides, e.g.
/// `SLEEP_MONITOR__SESSION__SAMPLE_INTERVAL_MS=250`
pub const ENV_PREFIX: &str = "SLEEP_MONITOR";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Session timing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Time between frame samples (milliseconds)
    pub sample_interval_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
        }
    }
}

impl SessionConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub session: SessionConfig,
    pub camera: CameraConfig,
    pub analysis: AnalysisConfig,
    pub alert: AlertConfig,
}

impl MonitorConfig {
    /// Load from an optional file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let loaded: MonitorConfig = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject values the session cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.session.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid("session.sample_interval_ms must be positive".into()));
        }
        if self.analysis.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("analysis.endpoint is empty".into()));
        }
        if self.analysis.timeout_ms == 0 {
            return Err(ConfigError::Invalid("analysis.timeout_ms must be positive".into()));
        }
        if self.camera.grab_timeout_ms == 0 {
            return Err(ConfigError::Invalid("camera.grab_timeout_ms must be positive".into()));
        }
        Ok(())
    }
}
