//! Normalized transaction record

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One row of the input dataset after normalization.
///
/// `time` is always UTC; `topup_flag` is always 0 or 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier
    pub transaction_id: i64,

    /// Owning account, shared by all of that user's records
    pub user_id: String,

    /// Monetary value, finite and non-negative
    pub amount: f64,

    /// Event time (UTC)
    #[serde(with = "timestamp")]
    pub time: NaiveDateTime,

    /// Payment channel, passed through untouched
    pub method: String,

    /// 1 when the transaction is a top-up/recharge
    pub topup_flag: u8,
}

impl Transaction {
    /// Create a record with the given identity and timing, `card` method and no top-up.
    pub fn new(
        transaction_id: i64,
        user_id: impl Into<String>,
        amount: f64,
        time: NaiveDateTime,
    ) -> Self {
        Self {
            transaction_id,
            user_id: user_id.into(),
            amount,
            time,
            method: "card".to_string(),
            topup_flag: 0,
        }
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    /// Mark the record as a top-up (any non-zero input counts).
    pub fn with_topup(mut self, topup: bool) -> Self {
        self.topup_flag = u8::from(topup);
        self
    }

    pub fn is_topup(&self) -> bool {
        self.topup_flag == 1
    }
}

/// Serde adapter writing `YYYY-MM-DD HH:MM:SS[.fff]`.
pub(crate) mod timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

    pub fn serialize<S>(time: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(&time.format(FORMAT))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        crate::loader::parse_time(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_transaction_builder() {
        let tx = Transaction::new(1, "user_1", 5000.0, at(12, 0, 0))
            .with_method("mobile_money")
            .with_topup(true);

        assert_eq!(tx.user_id, "user_1");
        assert_eq!(tx.method, "mobile_money");
        assert_eq!(tx.topup_flag, 1);
        assert!(tx.is_topup());
    }

    #[test]
    fn test_transaction_json_time_format() {
        let tx = Transaction::new(42, "user_3", 120.5, at(8, 30, 15));

        let json = serde_json::to_string(&tx).unwrap();
        assert!(json.contains("\"time\":\"2024-01-01 08:30:15\""));

        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
