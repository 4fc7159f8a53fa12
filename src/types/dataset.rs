//! Sorted, partitioned record set shared by every detector

use super::transaction::Transaction;
use std::collections::BTreeMap;

/// Per-user view of a [`TransactionSet`]: `user_id` to that user's record
/// indices, in global (time-sorted) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPartition {
    groups: BTreeMap<String, Vec<usize>>,
}

impl UserPartition {
    /// Build the partition from records that are already globally sorted.
    ///
    /// Indices are pushed in iteration order, so each group is a
    /// sub-sequence of the global order and is never re-sorted.
    pub fn build(records: &[Transaction]) -> Self {
        let mut groups: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        for (idx, tx) in records.iter().enumerate() {
            groups.entry(tx.user_id.clone()).or_default().push(idx);
        }
        Self { groups }
    }

    /// Iterate `(user_id, indices)` in user id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[usize])> {
        self.groups
            .iter()
            .map(|(user, indices)| (user.as_str(), indices.as_slice()))
    }

    pub fn get(&self, user_id: &str) -> Option<&[usize]> {
        self.groups.get(user_id).map(Vec::as_slice)
    }

    pub fn user_count(&self) -> usize {
        self.groups.len()
    }
}

/// Immutable snapshot consumed by the detectors.
#[derive(Debug, Clone, Default)]
pub struct TransactionSet {
    records: Vec<Transaction>,
    partition: UserPartition,
}

impl TransactionSet {
    /// Sort records by time (stable, so ties keep input order) and
    /// partition them by user.
    pub fn new(mut records: Vec<Transaction>) -> Self {
        records.sort_by_key(|tx| tx.time);
        let partition = UserPartition::build(&records);
        Self { records, partition }
    }

    pub fn records(&self) -> &[Transaction] {
        &self.records
    }

    pub fn partition(&self) -> &UserPartition {
        &self.partition
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
