//! Pipeline orchestration: load, detect, combine, persist.

use crate::config::DetectionConfig;
use crate::detectors::{
    AmountOutlierDetector, AmountScores, AnomalyCombinator, Detector, FrequentTopupDetector,
    RapidFlags, RapidSuccessionDetector, TopupFlags,
};
use crate::error::{PipelineError, Result};
use crate::loader;
use crate::metrics::PipelineMetrics;
use crate::types::{ScoredTransaction, TransactionSet};
use crate::writer::ResultWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span, Instrument};

/// The three rules plus the combinator, configured once per run.
#[derive(Debug, Clone)]
pub struct AnomalyPipeline {
    amount: Arc<AmountOutlierDetector>,
    rapid: Arc<RapidSuccessionDetector>,
    topup: Arc<FrequentTopupDetector>,
    combinator: AnomalyCombinator,
}

impl AnomalyPipeline {
    /// Build a pipeline from validated thresholds
    pub fn new(config: &DetectionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            amount: Arc::new(AmountOutlierDetector::new(config.amount_zscore_threshold)),
            rapid: Arc::new(RapidSuccessionDetector::new(
                config.rapid_window_seconds,
                config.boundary,
            )),
            topup: Arc::new(FrequentTopupDetector::new(
                config.topup_window_size,
                config.topup_min_count,
                config.boundary,
            )),
            combinator: AnomalyCombinator::new(config.anomaly_score_threshold, config.boundary),
        })
    }

    /// Score a set, running the detectors one after another
    pub fn score(&self, set: &TransactionSet) -> Vec<ScoredTransaction> {
        self.score_with_metrics(set, &PipelineMetrics::new())
    }

    pub fn score_with_metrics(
        &self,
        set: &TransactionSet,
        metrics: &PipelineMetrics,
    ) -> Vec<ScoredTransaction> {
        let amount = run_timed(self.amount.as_ref(), set, metrics);
        let rapid = run_timed(self.rapid.as_ref(), set, metrics);
        let topup = run_timed(self.topup.as_ref(), set, metrics);

        self.finish(set, metrics, amount, rapid, topup)
    }

    /// Score a set with each detector on its own blocking task.
    ///
    /// All tasks read the same snapshot; their overlays are joined before
    /// the combinator runs, so the result equals [`AnomalyPipeline::score`].
    pub async fn score_concurrent(
        &self,
        set: Arc<TransactionSet>,
        metrics: Arc<PipelineMetrics>,
    ) -> Result<Vec<ScoredTransaction>> {
        let (amount, rapid, topup) = tokio::try_join!(
            spawn_detector(self.amount.clone(), set.clone(), metrics.clone()),
            spawn_detector(self.rapid.clone(), set.clone(), metrics.clone()),
            spawn_detector(self.topup.clone(), set.clone(), metrics.clone()),
        )?;

        Ok(self.finish(&set, &metrics, amount, rapid, topup))
    }

    fn finish(
        &self,
        set: &TransactionSet,
        metrics: &PipelineMetrics,
        amount: AmountScores,
        rapid: RapidFlags,
        topup: TopupFlags,
    ) -> Vec<ScoredTransaction> {
        debug!(
            amount_flags = amount.flagged(),
            rapid_flags = rapid.flagged(),
            freq_flags = topup.flagged(),
            mean_amount = amount.mean,
            std_amount = ?amount.std_dev,
            "Detectors finished"
        );

        let scored = metrics.time_stage("combine", || {
            self.combinator.combine(set, &amount, &rapid, &topup)
        });
        metrics.record_scored(&scored);
        scored
    }
}

fn run_timed<D: Detector>(
    detector: &D,
    set: &TransactionSet,
    metrics: &PipelineMetrics,
) -> D::Output {
    metrics.time_stage(detector.name(), || detector.detect(set))
}

async fn spawn_detector<D: Detector>(
    detector: Arc<D>,
    set: Arc<TransactionSet>,
    metrics: Arc<PipelineMetrics>,
) -> Result<D::Output> {
    let name = detector.name();
    tokio::task::spawn_blocking(move || run_timed(detector.as_ref(), &set, &metrics))
        .await
        .map_err(|e| PipelineError::Task {
            detector: name,
            reason: e.to_string(),
        })
}

/// How a run executes and where its result goes
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub concurrent: bool,
    pub output_path: Option<std::path::PathBuf>,
}

/// Load `input`, score it and optionally persist the annotated set.
///
/// Any failure aborts before output is written.
pub async fn run_detection(
    input: &Path,
    config: &DetectionConfig,
    options: &RunOptions,
) -> Result<Vec<ScoredTransaction>> {
    let run_id = uuid::Uuid::new_v4();
    let span = info_span!("detection_run", %run_id);

    async move {
        let pipeline = AnomalyPipeline::new(config)?;
        let metrics = Arc::new(PipelineMetrics::new());

        let start = Instant::now();
        let set = loader::load_path(input)?;
        metrics.record_stage("load", start.elapsed());

        let scored = if options.concurrent {
            pipeline
                .score_concurrent(Arc::new(set), metrics.clone())
                .await?
        } else {
            pipeline.score_with_metrics(&set, &metrics)
        };

        if let Some(output) = &options.output_path {
            let start = Instant::now();
            ResultWriter::new(output).persist(&scored)?;
            metrics.record_stage("persist", start.elapsed());
        }

        for tx in scored.iter().filter(|tx| tx.is_anomaly()) {
            debug!(
                transaction_id = tx.transaction_id,
                user_id = %tx.user_id,
                anomaly_score = tx.anomaly_score,
                rules = ?tx.triggered_rules(),
                "Anomaly flagged"
            );
        }

        info!(
            records = scored.len(),
            anomalies = scored.iter().filter(|tx| tx.is_anomaly()).count(),
            concurrent = options.concurrent,
            "Detection finished"
        );
        metrics.print_summary();

        Ok::<_, PipelineError>(scored)
    }
    .instrument(span)
    .await
}
