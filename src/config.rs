//! Configuration management for the scoring pipeline

use crate::error::PipelineError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;

/// Environment variable prefix, e.g. `RISK_ANALYTICS__DETECTION__TOPUP_MIN_COUNT`
pub const ENV_PREFIX: &str = "RISK_ANALYTICS";

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// How a value that lands exactly on a threshold is treated.
///
/// Applies to the rapid window (`<=` vs `<`), the top-up count and the
/// anomaly score threshold (`>=` vs `>`). The amount rule is always strict.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryPolicy {
    #[default]
    Inclusive,
    Exclusive,
}

impl BoundaryPolicy {
    /// `value <= limit` (inclusive) or `value < limit` (exclusive)
    pub fn within<T: PartialOrd>(self, value: T, limit: T) -> bool {
        match self {
            BoundaryPolicy::Inclusive => value <= limit,
            BoundaryPolicy::Exclusive => value < limit,
        }
    }

    /// `value >= limit` (inclusive) or `value > limit` (exclusive)
    pub fn reaches<T: PartialOrd>(self, value: T, limit: T) -> bool {
        match self {
            BoundaryPolicy::Inclusive => value >= limit,
            BoundaryPolicy::Exclusive => value > limit,
        }
    }
}

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub detection: DetectionConfig,
    pub pipeline: PipelineConfig,
    pub logging: LoggingConfig,
}

/// Rule thresholds
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct DetectionConfig {
    /// |z-score| strictly above this flags an amount outlier
    pub amount_zscore_threshold: f64,
    /// Max gap to the user's previous transaction
    pub rapid_window_seconds: i64,
    /// Trailing per-user records in the top-up window (current included)
    pub topup_window_size: usize,
    /// Top-ups in the window needed to flag
    pub topup_min_count: u32,
    /// Flags that must agree for `is_anomaly`
    pub anomaly_score_threshold: u8,
    /// Tie handling at the rapid, top-up and score thresholds
    pub boundary: BoundaryPolicy,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            amount_zscore_threshold: 2.5,
            rapid_window_seconds: 60,
            topup_window_size: 3,
            topup_min_count: 3,
            anomaly_score_threshold: 2,
            boundary: BoundaryPolicy::Inclusive,
        }
    }
}

impl DetectionConfig {
    /// Reject thresholds the detectors cannot evaluate meaningfully.
    pub fn validate(&self) -> std::result::Result<(), PipelineError> {
        if !self.amount_zscore_threshold.is_finite() || self.amount_zscore_threshold < 0.0 {
            return Err(PipelineError::Config(format!(
                "amount_zscore_threshold must be a finite, non-negative number (got {})",
                self.amount_zscore_threshold
            )));
        }
        if self.rapid_window_seconds < 0 {
            return Err(PipelineError::Config(format!(
                "rapid_window_seconds must not be negative (got {})",
                self.rapid_window_seconds
            )));
        }
        if chrono::Duration::try_seconds(self.rapid_window_seconds).is_none() {
            return Err(PipelineError::Config(format!(
                "rapid_window_seconds is out of range (got {})",
                self.rapid_window_seconds
            )));
        }
        if self.topup_window_size == 0 {
            return Err(PipelineError::Config(
                "topup_window_size must be at least 1".to_string(),
            ));
        }
        if self.topup_min_count == 0 {
            return Err(PipelineError::Config(
                "topup_min_count must be at least 1".to_string(),
            ));
        }
        if self.anomaly_score_threshold > 3 {
            return Err(PipelineError::Config(format!(
                "anomaly_score_threshold must be between 0 and 3 (got {})",
                self.anomaly_score_threshold
            )));
        }
        Ok(())
    }
}

/// Pipeline configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Run the three detectors as parallel tasks
    pub concurrent: bool,
    /// Input dataset, overridable from the command line
    pub input_path: Option<String>,
    /// Destination for the annotated dataset; nothing is written when unset
    pub output_path: Option<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrent: true,
            input_path: None,
            output_path: None,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default file (if present) and the environment
    pub fn load() -> Result<Self> {
        Self::build(DEFAULT_CONFIG_PATH, false)
    }

    /// Load configuration from a specific path, which must exist
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::build(path, true)
    }

    fn build<P: AsRef<Path>>(path: P, required: bool) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()).required(required))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config
            .detection
            .validate()
            .context("Configuration failed validation")?;

        Ok(config)
    }
}
