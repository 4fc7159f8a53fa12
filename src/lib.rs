//! Risk Analytics Library
//!
//! Batch anomaly scoring for fintech transaction datasets: three
//! deterministic rules (amount outlier, rapid succession, frequent top-up)
//! combined into a per-transaction anomaly verdict.

pub mod config;
pub mod detectors;
pub mod error;
pub mod loader;
pub mod metrics;
pub mod pipeline;
pub mod types;
pub mod writer;

pub use self::config::{AppConfig, BoundaryPolicy, DetectionConfig};
pub use detectors::{
    AmountOutlierDetector, AnomalyCombinator, Detector, FrequentTopupDetector,
    RapidSuccessionDetector,
};
pub use error::{PipelineError, Result};
pub use pipeline::{run_detection, AnomalyPipeline, RunOptions};
pub use types::{ScoredTransaction, Transaction, TransactionSet};
pub use writer::ResultWriter;
