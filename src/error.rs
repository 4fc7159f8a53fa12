//! Error taxonomy for the scoring pipeline

use thiserror::Error;

/// Errors raised while loading, scoring or persisting a dataset.
///
/// Every variant is fatal for the run: nothing is written once one is returned.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// One or more required columns are absent from the input header
    #[error("input is missing required column(s): {}", .missing.join(", "))]
    Schema { missing: Vec<String> },

    /// A value could not be coerced to the column's type
    #[error("row {row}: column `{column}` has invalid value {value:?}: {reason}")]
    InvalidValue {
        row: usize,
        column: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A detector task panicked or was cancelled before it joined
    #[error("detector task `{detector}` failed: {reason}")]
    Task {
        detector: &'static str,
        reason: String,
    },
}

impl PipelineError {
    pub(crate) fn invalid(
        row: usize,
        column: &'static str,
        value: &str,
        reason: impl Into<String>,
    ) -> Self {
        PipelineError::InvalidValue {
            row,
            column,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
