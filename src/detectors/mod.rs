//! Rule detectors and the flag combinator
//!
//! Each detector reads an immutable [`TransactionSet`] and returns its own
//! column overlay, indexed like `set.records()`. Detectors never see each
//! other's output, so they can run in any order or in parallel.

pub mod amount;
pub mod combinator;
pub mod rapid;
pub mod topup;

pub use amount::{AmountOutlierDetector, AmountScores};
pub use combinator::AnomalyCombinator;
pub use rapid::{RapidFlags, RapidSuccessionDetector};
pub use topup::{FrequentTopupDetector, TopupFlags};

use crate::types::TransactionSet;

/// A single scoring rule.
pub trait Detector: Send + Sync + 'static {
    /// Column overlay produced for the whole set
    type Output: Send + 'static;

    /// Stable rule name used in logs and metrics
    fn name(&self) -> &'static str;

    fn detect(&self, set: &TransactionSet) -> Self::Output;
}
