//! Per-user frequent top-up rule

use super::Detector;
use crate::config::BoundaryPolicy;
use crate::types::TransactionSet;
use std::collections::VecDeque;

/// Trailing top-up counts and the resulting flag, in set order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopupFlags {
    /// Top-ups among the user's last `window` records, current included
    pub window_counts: Vec<u32>,
    pub flags: Vec<u8>,
}

impl TopupFlags {
    pub fn flagged(&self) -> usize {
        self.flags.iter().filter(|&&f| f == 1).count()
    }
}

/// Flags a transaction when enough of the user's trailing `window` records
/// (itself included) are top-ups.
///
/// Windows shorter than `window` at the start of a user's history are
/// evaluated as they are.
#[derive(Debug, Clone)]
pub struct FrequentTopupDetector {
    window: usize,
    min_count: u32,
    boundary: BoundaryPolicy,
}

impl FrequentTopupDetector {
    pub fn new(window: usize, min_count: u32, boundary: BoundaryPolicy) -> Self {
        Self {
            window: window.max(1),
            min_count,
            boundary,
        }
    }
}

impl Default for FrequentTopupDetector {
    fn default() -> Self {
        Self::new(3, 3, BoundaryPolicy::Inclusive)
    }
}

impl Detector for FrequentTopupDetector {
    type Output = TopupFlags;

    fn name(&self) -> &'static str {
        "frequent_topup"
    }

    fn detect(&self, set: &TransactionSet) -> TopupFlags {
        let records = set.records();
        let mut window_counts = vec![0u32; records.len()];
        let mut flags = vec![0u8; records.len()];

        for (_, indices) in set.partition().iter() {
            let mut window: VecDeque<u8> = VecDeque::with_capacity(self.window);
            let mut sum: u32 = 0;

            for &idx in indices {
                let flag = records[idx].topup_flag;
                window.push_back(flag);
                sum += u32::from(flag);
                if window.len() > self.window {
                    if let Some(front) = window.pop_front() {
                        sum -= u32::from(front);
                    }
                }

                window_counts[idx] = sum;
                flags[idx] = u8::from(self.boundary.reaches(sum, self.min_count));
            }
        }

        TopupFlags {
            window_counts,
            flags,
        }
    }
}
