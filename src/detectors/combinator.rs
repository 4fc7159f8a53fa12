//! Combines per-rule flags into an anomaly verdict

use super::{AmountScores, RapidFlags, TopupFlags};
use crate::config::BoundaryPolicy;
use crate::types::{Annotation, ScoredTransaction, TransactionSet};

/// Sums the three rule flags and applies the score threshold.
#[derive(Debug, Clone)]
pub struct AnomalyCombinator {
    threshold: u8,
    boundary: BoundaryPolicy,
}

impl AnomalyCombinator {
    pub fn new(threshold: u8, boundary: BoundaryPolicy) -> Self {
        Self {
            threshold,
            boundary,
        }
    }

    /// Number of rules that fired.
    pub fn score(amount_flag: u8, rapid_flag: u8, freq_flag: u8) -> u8 {
        amount_flag.min(1) + rapid_flag.min(1) + freq_flag.min(1)
    }

    pub fn is_anomaly(&self, score: u8) -> bool {
        self.boundary.reaches(score, self.threshold)
    }

    /// Merge the detector overlays back onto the records they were computed
    /// from. Every overlay must have one entry per record.
    pub fn combine(
        &self,
        set: &TransactionSet,
        amount: &AmountScores,
        rapid: &RapidFlags,
        topup: &TopupFlags,
    ) -> Vec<ScoredTransaction> {
        debug_assert_eq!(amount.flags.len(), set.len());
        debug_assert_eq!(rapid.flags.len(), set.len());
        debug_assert_eq!(topup.flags.len(), set.len());

        set.records()
            .iter()
            .enumerate()
            .map(|(i, tx)| {
                let (amount_flag, rapid_flag, freq_flag) =
                    (amount.flags[i], rapid.flags[i], topup.flags[i]);
                let anomaly_score = Self::score(amount_flag, rapid_flag, freq_flag);

                ScoredTransaction::from_parts(
                    tx,
                    Annotation {
                        zscore_amount: amount.zscores[i],
                        amount_flag,
                        rapid_flag,
                        freq_flag,
                        anomaly_score,
                        is_anomaly: u8::from(self.is_anomaly(anomaly_score)),
                    },
                )
            })
            .collect()
    }
}

impl Default for AnomalyCombinator {
    fn default() -> Self {
        Self::new(2, BoundaryPolicy::Inclusive)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;
    use chrono::NaiveDate;

    #[test]
    fn test_score_counts_flags() {
        assert_eq!(AnomalyCombinator::score(0, 0, 0), 0);
        assert_eq!(AnomalyCombinator::score(1, 0, 1), 2);
        assert_eq!(AnomalyCombinator::score(1, 1, 1), 3);
    }

    #[test]
    fn test_threshold_policy() {
        let inclusive = AnomalyCombinator::default();
        assert!(!inclusive.is_anomaly(1));
        assert!(inclusive.is_anomaly(2));
        assert!(inclusive.is_anomaly(3));

        let exclusive = AnomalyCombinator::new(2, BoundaryPolicy::Exclusive);
        assert!(!exclusive.is_anomaly(2));
        assert!(exclusive.is_anomaly(3));

        let any_signal = AnomalyCombinator::new(1, BoundaryPolicy::Inclusive);
        assert!(any_signal.is_anomaly(1));
    }

    #[test]
    fn test_combine_merges_overlays() {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let set = TransactionSet::new(vec![
            Transaction::new(1, "a", 10.0, time),
            Transaction::new(2, "a", 20.0, time),
        ]);
        let amount = AmountScores {
            zscores: vec![-0.7, 0.7],
            flags: vec![0, 1],
            mean: 15.0,
            std_dev: Some(7.07),
        };
        let rapid = RapidFlags {
            gaps: vec![None, Some(chrono::Duration::zero())],
            flags: vec![0, 1],
        };
        let topup = TopupFlags {
            window_counts: vec![0, 0],
            flags: vec![0, 0],
        };

        let scored = AnomalyCombinator::default().combine(&set, &amount, &rapid, &topup);

        assert_eq!(scored.len(), 2);
        assert_eq!(scored[0].anomaly_score, 0);
        assert_eq!(scored[0].is_anomaly, 0);
        assert_eq!(scored[1].zscore_amount, 0.7);
        assert_eq!(scored[1].anomaly_score, 2);
        assert_eq!(scored[1].is_anomaly, 1);
    }
}
