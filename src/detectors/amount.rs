//! Dataset-wide z-score rule on transaction amounts

use super::Detector;
use crate::types::TransactionSet;
use tracing::debug;

/// Z-scores and flags for every record, in set order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AmountScores {
    pub zscores: Vec<f64>,
    pub flags: Vec<u8>,
    /// Mean amount over the whole set (0 when empty)
    pub mean: f64,
    /// Sample standard deviation; `None` when the set has no spread
    pub std_dev: Option<f64>,
}

impl AmountScores {
    pub fn flagged(&self) -> usize {
        self.flags.iter().filter(|&&f| f == 1).count()
    }
}

/// Flags amounts more than `threshold` sample standard deviations from the
/// mean of the entire set.
#[derive(Debug, Clone)]
pub struct AmountOutlierDetector {
    threshold: f64,
}

impl AmountOutlierDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for AmountOutlierDetector {
    fn default() -> Self {
        Self::new(2.5)
    }
}

impl Detector for AmountOutlierDetector {
    type Output = AmountScores;

    fn name(&self) -> &'static str {
        "amount_outlier"
    }

    fn detect(&self, set: &TransactionSet) -> AmountScores {
        let amounts: Vec<f64> = set.records().iter().map(|tx| tx.amount).collect();
        let moments = Moments::of(&amounts);

        let Some(std) = moments.std else {
            debug!(
                records = amounts.len(),
                "Amounts have no spread, skipping outlier rule"
            );
            return AmountScores {
                zscores: vec![0.0; amounts.len()],
                flags: vec![0; amounts.len()],
                mean: moments.mean * moments.scale,
                std_dev: None,
            };
        };

        let zscores: Vec<f64> = amounts
            .iter()
            .map(|a| (a / moments.scale - moments.mean) / std)
            .collect();
        let flags = zscores
            .iter()
            .map(|z| u8::from(z.abs() > self.threshold))
            .collect();

        AmountScores {
            zscores,
            flags,
            mean: moments.mean * moments.scale,
            std_dev: Some(std * moments.scale),
        }
    }
}

/// Mean and sample (N-1) standard deviation of `vals / scale`.
///
/// `scale` is a power of two near the largest magnitude, so dividing by it
/// is exact and squared deviations cannot overflow. `std` is `None` for
/// fewer than two values or zero variance.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Moments {
    scale: f64,
    mean: f64,
    std: Option<f64>,
}

impl Moments {
    fn of(vals: &[f64]) -> Self {
        let max = vals.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let scale = if max >= f64::MIN_POSITIVE {
            2.0_f64.powi(max.log2().floor() as i32)
        } else {
            1.0
        };

        if vals.is_empty() {
            return Self {
                scale,
                mean: 0.0,
                std: None,
            };
        }
        let n = vals.len() as f64;
        let mean = vals.iter().map(|v| v / scale).sum::<f64>() / n;
        if vals.len() < 2 {
            return Self {
                scale,
                mean,
                std: None,
            };
        }
        let sq_diff: f64 = vals.iter().map(|v| (v / scale - mean).powi(2)).sum();
        let std = (sq_diff / (n - 1.0)).sqrt();
        Self {
            scale,
            mean,
            std: (std > 0.0).then_some(std),
        }
    }
}
