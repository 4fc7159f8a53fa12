//! Per-user rapid succession rule

use super::Detector;
use crate::config::BoundaryPolicy;
use crate::types::TransactionSet;
use chrono::Duration;

/// Gap to the same user's previous transaction, and the resulting flag.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RapidFlags {
    /// `None` for a user's first transaction
    pub gaps: Vec<Option<Duration>>,
    pub flags: Vec<u8>,
}

impl RapidFlags {
    pub fn flagged(&self) -> usize {
        self.flags.iter().filter(|&&f| f == 1).count()
    }
}

/// Flags a transaction that follows the same user's immediately preceding
/// transaction within `window`.
#[derive(Debug, Clone)]
pub struct RapidSuccessionDetector {
    window: Duration,
    boundary: BoundaryPolicy,
}

impl RapidSuccessionDetector {
    /// Windows beyond chrono's range saturate to the largest duration.
    pub fn new(window_seconds: i64, boundary: BoundaryPolicy) -> Self {
        Self {
            window: Duration::try_seconds(window_seconds).unwrap_or(Duration::MAX),
            boundary,
        }
    }
}

impl Default for RapidSuccessionDetector {
    fn default() -> Self {
        Self::new(60, BoundaryPolicy::Inclusive)
    }
}

impl Detector for RapidSuccessionDetector {
    type Output = RapidFlags;

    fn name(&self) -> &'static str {
        "rapid_succession"
    }

    fn detect(&self, set: &TransactionSet) -> RapidFlags {
        let records = set.records();
        let mut gaps = vec![None; records.len()];
        let mut flags = vec![0u8; records.len()];

        for (_, indices) in set.partition().iter() {
            for pair in indices.windows(2) {
                let (prev, curr) = (pair[0], pair[1]);
                let gap = records[curr].time - records[prev].time;
                gaps[curr] = Some(gap);
                flags[curr] = u8::from(self.boundary.within(gap, self.window));
            }
        }

        RapidFlags { gaps, flags }
    }
}
