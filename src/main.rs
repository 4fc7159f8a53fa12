//! Risk Analytics - Main Entry Point
//!
//! Loads a transaction dataset, scores every record with the anomaly rules
//! and optionally writes the annotated dataset back out.

use anyhow::{Context, Result};
use clap::Parser;
use risk_analytics::{
    config::{AppConfig, LoggingConfig},
    run_detection, RunOptions,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "risk-analytics",
    about = "Scores a transaction dataset for suspicious behavior."
)]
struct Cli {
    /// Configuration file (defaults to config/config.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Input CSV; overrides pipeline.input_path
    #[arg(long)]
    input: Option<PathBuf>,

    /// Destination (.csv or .json); overrides pipeline.output_path
    #[arg(long)]
    output: Option<PathBuf>,

    /// Run the detectors one after another instead of in parallel
    #[arg(long, default_value_t = false)]
    sequential: bool,

    #[arg(long)]
    amount_zscore_threshold: Option<f64>,

    #[arg(long)]
    rapid_window_seconds: Option<i64>,

    #[arg(long)]
    topup_window_size: Option<usize>,

    #[arg(long)]
    topup_min_count: Option<u32>,

    #[arg(long)]
    anomaly_score_threshold: Option<u8>,
}

impl Cli {
    /// Fold command-line overrides into the loaded configuration
    fn apply(&self, config: &mut AppConfig) {
        let detection = &mut config.detection;
        if let Some(v) = self.amount_zscore_threshold {
            detection.amount_zscore_threshold = v;
        }
        if let Some(v) = self.rapid_window_seconds {
            detection.rapid_window_seconds = v;
        }
        if let Some(v) = self.topup_window_size {
            detection.topup_window_size = v;
        }
        if let Some(v) = self.topup_min_count {
            detection.topup_min_count = v;
        }
        if let Some(v) = self.anomaly_score_threshold {
            detection.anomaly_score_threshold = v;
        }
        if self.sequential {
            config.pipeline.concurrent = false;
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("Invalid log level")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format.eq_ignore_ascii_case("json") {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = match &cli.config {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load()?,
    };
    cli.apply(&mut config);

    init_logging(&config.logging)?;
    info!("Starting Risk Analytics");

    config
        .detection
        .validate()
        .context("Invalid detection thresholds")?;
    info!(
        "Thresholds: amount |z|>{:.2}, rapid<={}s, top-ups {}/{}, score>={} ({:?})",
        config.detection.amount_zscore_threshold,
        config.detection.rapid_window_seconds,
        config.detection.topup_min_count,
        config.detection.topup_window_size,
        config.detection.anomaly_score_threshold,
        config.detection.boundary
    );

    let input = cli
        .input
        .clone()
        .or_else(|| config.pipeline.input_path.as_ref().map(PathBuf::from))
        .context("No input dataset given (use --input or pipeline.input_path)")?;

    let options = RunOptions {
        concurrent: config.pipeline.concurrent,
        output_path: cli
            .output
            .clone()
            .or_else(|| config.pipeline.output_path.as_ref().map(PathBuf::from)),
    };

    let scored = run_detection(&input, &config.detection, &options)
        .await
        .with_context(|| format!("Detection failed for {}", input.display()))?;

    let anomalies = scored.iter().filter(|tx| tx.is_anomaly()).count();
    match &options.output_path {
        Some(path) => info!(
            anomalies,
            records = scored.len(),
            "Detection finished. Output saved as {}",
            path.display()
        ),
        None => info!(
            anomalies,
            records = scored.len(),
            "Detection finished (no output path configured)"
        ),
    }

    Ok(())
}
