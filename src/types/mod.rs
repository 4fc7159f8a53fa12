//! Type definitions for the scoring pipeline

pub mod dataset;
pub mod scored;
pub mod transaction;

pub use dataset::{TransactionSet, UserPartition};
pub use scored::{Annotation, ScoredTransaction, OUTPUT_COLUMNS};
pub use transaction::Transaction;
