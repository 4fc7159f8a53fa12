//! Annotated output record

use super::transaction::{timestamp, Transaction};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column order of the persisted output.
pub const OUTPUT_COLUMNS: [&str; 12] = [
    "transaction_id",
    "user_id",
    "amount",
    "time",
    "method",
    "topup_flag",
    "zscore_amount",
    "amount_flag",
    "rapid_flag",
    "freq_flag",
    "anomaly_score",
    "is_anomaly",
];

/// A transaction carrying every derived field.
///
/// Fields are kept flat (no nested record) so the CSV writer can emit one
/// column per field in [`OUTPUT_COLUMNS`] order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredTransaction {
    pub transaction_id: i64,
    pub user_id: String,
    pub amount: f64,
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,
    pub method: String,
    pub topup_flag: u8,

    /// Standardized amount; 0 when the dataset has no spread
    pub zscore_amount: f64,
    pub amount_flag: u8,
    pub rapid_flag: u8,
    pub freq_flag: u8,

    /// Number of rules that fired, 0..=3
    pub anomaly_score: u8,
    pub is_anomaly: u8,
}

/// Derived fields for one record, produced by the combinator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Annotation {
    pub zscore_amount: f64,
    pub amount_flag: u8,
    pub rapid_flag: u8,
    pub freq_flag: u8,
    pub anomaly_score: u8,
    pub is_anomaly: u8,
}

impl ScoredTransaction {
    pub fn from_parts(tx: &Transaction, annotation: Annotation) -> Self {
        Self {
            transaction_id: tx.transaction_id,
            user_id: tx.user_id.clone(),
            amount: tx.amount,
            time: tx.time,
            method: tx.method.clone(),
            topup_flag: tx.topup_flag,
            zscore_amount: annotation.zscore_amount,
            amount_flag: annotation.amount_flag,
            rapid_flag: annotation.rapid_flag,
            freq_flag: annotation.freq_flag,
            anomaly_score: annotation.anomaly_score,
            is_anomaly: annotation.is_anomaly,
        }
    }

    pub fn is_anomaly(&self) -> bool {
        self.is_anomaly == 1
    }

    /// Names of the rules that fired for this record.
    pub fn triggered_rules(&self) -> Vec<&'static str> {
        let mut rules = Vec::with_capacity(3);
        if self.amount_flag == 1 {
            rules.push("amount_outlier");
        }
        if self.rapid_flag == 1 {
            rules.push("rapid_succession");
        }
        if self.freq_flag == 1 {
            rules.push("frequent_topup");
        }
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn scored(amount_flag: u8, rapid_flag: u8, freq_flag: u8) -> ScoredTransaction {
        let time = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        let tx = Transaction::new(1, "user_1", 100.0, time);
        let anomaly_score = amount_flag + rapid_flag + freq_flag;
        ScoredTransaction::from_parts(
            &tx,
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
    fn test_triggered_rules() {
        assert!(scored(0, 0, 0).triggered_rules().is_empty());
        assert_eq!(
            scored(1, 0, 1).triggered_rules(),
            vec!["amount_outlier", "frequent_topup"]
        );
    }

    #[test]
    fn test_csv_header_matches_output_columns() {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.serialize(scored(0, 1, 1)).unwrap();
        let bytes = writer.into_inner().unwrap();
        let text = String::from_utf8(bytes).unwrap();

        let header = text.lines().next().unwrap();
        assert_eq!(header, OUTPUT_COLUMNS.join(","));
    }
}
