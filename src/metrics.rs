//! Run statistics for the scoring pipeline.

use crate::types::ScoredTransaction;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use tracing::info;

/// Collector shared by the orchestrator and its detector tasks
pub struct PipelineMetrics {
    /// Records that went through the combinator
    pub records_scored: AtomicU64,
    /// Records with `is_anomaly == 1`
    pub anomalies: AtomicU64,
    amount_flags: AtomicU64,
    rapid_flags: AtomicU64,
    freq_flags: AtomicU64,
    /// Records per anomaly score 0..=3
    score_buckets: RwLock<[u64; 4]>,
    /// Wall-clock time per stage, in completion order
    stage_times: RwLock<Vec<(String, Duration)>>,
    start_time: Instant,
}

impl PipelineMetrics {
    pub fn new() -> Self {
        Self {
            records_scored: AtomicU64::new(0),
            anomalies: AtomicU64::new(0),
            amount_flags: AtomicU64::new(0),
            rapid_flags: AtomicU64::new(0),
            freq_flags: AtomicU64::new(0),
            score_buckets: RwLock::new([0; 4]),
            stage_times: RwLock::new(Vec::with_capacity(8)),
            start_time: Instant::now(),
        }
    }

    /// Record how long a stage took
    pub fn record_stage(&self, stage: &str, elapsed: Duration) {
        let mut times = self.stage_times.write().unwrap_or_else(|e| e.into_inner());
        times.push((stage.to_string(), elapsed));
    }

    /// Time `f` and record it under `stage`
    pub fn time_stage<T>(&self, stage: &str, f: impl FnOnce() -> T) -> T {
        let start = Instant::now();
        let out = f();
        self.record_stage(stage, start.elapsed());
        out
    }

    /// Count flags and verdicts of the combined output
    pub fn record_scored(&self, scored: &[ScoredTransaction]) {
        let mut buckets = self.score_buckets.write().unwrap_or_else(|e| e.into_inner());
        for tx in scored {
            self.records_scored.fetch_add(1, Ordering::Relaxed);
            self.amount_flags
                .fetch_add(u64::from(tx.amount_flag), Ordering::Relaxed);
            self.rapid_flags
                .fetch_add(u64::from(tx.rapid_flag), Ordering::Relaxed);
            self.freq_flags
                .fetch_add(u64::from(tx.freq_flag), Ordering::Relaxed);
            self.anomalies
                .fetch_add(u64::from(tx.is_anomaly), Ordering::Relaxed);

            let bucket = usize::from(tx.anomaly_score.min(3));
            buckets[bucket] += 1;
        }
    }

    pub fn get_flag_counts(&self) -> FlagCounts {
        FlagCounts {
            amount: self.amount_flags.load(Ordering::Relaxed),
            rapid: self.rapid_flags.load(Ordering::Relaxed),
            freq: self.freq_flags.load(Ordering::Relaxed),
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 4] {
        *self.score_buckets.read().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get_stage_times(&self) -> Vec<(String, Duration)> {
        self.stage_times
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Fraction of scored records flagged as anomalies
    pub fn get_anomaly_rate(&self) -> f64 {
        let scored = self.records_scored.load(Ordering::Relaxed);
        if scored == 0 {
            return 0.0;
        }
        self.anomalies.load(Ordering::Relaxed) as f64 / scored as f64
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let scored = self.records_scored.load(Ordering::Relaxed);
        let anomalies = self.anomalies.load(Ordering::Relaxed);
        let flags = self.get_flag_counts();
        let dist = self.get_score_distribution();

        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║              ANOMALY SCORING - RUN SUMMARY                   ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Records Scored: {:>8}  │  Anomalies: {:>6} ({:>5.1}%)      ║",
            scored,
            anomalies,
            self.get_anomaly_rate() * 100.0
        );
        info!(
            "║ Flags: amount={:>6} rapid={:>6} freq={:>6}                 ║",
            flags.amount, flags.rapid, flags.freq
        );
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!("║ Anomaly Score Distribution:                                  ║");
        for (score, &count) in dist.iter().enumerate() {
            let pct = if scored > 0 {
                (count as f64 / scored as f64) * 100.0
            } else {
                0.0
            };
            let bar: String = "█".repeat(((pct / 5.0) as usize).min(20));
            info!("║   {}: {:>8} ({:>5.1}%) {}", score, count, pct, bar);
        }
        info!("╠══════════════════════════════════════════════════════════════╣");
        for (stage, elapsed) in self.get_stage_times() {
            info!("║   {:<18} {:>10.3} ms", stage, elapsed.as_secs_f64() * 1000.0);
        }
        info!(
            "║   {:<18} {:>10.3} ms",
            "total",
            self.elapsed().as_secs_f64() * 1000.0
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-rule flag totals
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlagCounts {
    pub amount: u64,
    pub rapid: u64,
    pub freq: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Annotation, Transaction};
    use chrono::NaiveDate;

    fn scored(amount_flag: u8, rapid_flag: u8, freq_flag: u8) -> ScoredTransaction {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let anomaly_score = amount_flag + rapid_flag + freq_flag;
        ScoredTransaction::from_parts(
            &Transaction::new(1, "a", 1.0, time),
            Annotation {
                zscore_amount: 0.0,
                amount_flag,
                rapid_flag,
                freq_flag,
                anomaly_score,
                is_anomaly: u8::from(anomaly_score >= 2),
            },
        )
    }

    #[test]
    fn test_metrics_recording() {
        let metrics = PipelineMetrics::new();
        metrics.record_scored(&[scored(0, 0, 0), scored(0, 1, 1), scored(1, 1, 1)]);

        assert_eq!(metrics.records_scored.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.anomalies.load(Ordering::Relaxed), 2);
        assert_eq!(
            metrics.get_flag_counts(),
            FlagCounts {
                amount: 1,
                rapid: 2,
                freq: 2
            }
        );
        assert_eq!(metrics.get_score_distribution(), [1, 0, 1, 1]);
        assert!((metrics.get_anomaly_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_stage_timing() {
        let metrics = PipelineMetrics::new();
        let out = metrics.time_stage("load", || 7);
        metrics.record_stage("persist", Duration::from_millis(3));

        assert_eq!(out, 7);
        let stages: Vec<String> = metrics
            .get_stage_times()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(stages, vec!["load", "persist"]);
    }

    #[test]
    fn test_empty_run_rate() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.get_anomaly_rate(), 0.0);
    }
}
