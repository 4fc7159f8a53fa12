//! CSV record loader and normalizer

use crate::error::{PipelineError, Result};
use crate::types::{Transaction, TransactionSet};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Columns every input must carry, named exactly.
pub const REQUIRED_COLUMNS: [&str; 6] = [
    "transaction_id",
    "user_id",
    "amount",
    "time",
    "method",
    "topup_flag",
];

const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Load a CSV dataset from disk.
pub fn load_path<P: AsRef<Path>>(path: P) -> Result<TransactionSet> {
    let path = path.as_ref();
    info!(path = %path.display(), "Loading transactions");
    let file = File::open(path)?;
    load_reader(file)
}

/// Load a CSV dataset from any reader.
///
/// The whole input is validated before a set is returned; one bad row
/// fails the load.
pub fn load_reader<R: Read>(reader: R) -> Result<TransactionSet> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(reader);

    let headers = reader.headers()?.clone();
    let columns = ColumnIndex::resolve(&headers)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        let row = row?;
        records.push(columns.parse_row(&row, i + 1)?);
    }

    let set = TransactionSet::new(records);
    info!(
        records = set.len(),
        users = set.partition().user_count(),
        "Transactions loaded"
    );
    Ok(set)
}

/// Positions of the required columns within the header row.
struct ColumnIndex {
    transaction_id: usize,
    user_id: usize,
    amount: usize,
    time: usize,
    method: usize,
    topup_flag: usize,
}

impl ColumnIndex {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|&&name| position(name).is_none())
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return Err(PipelineError::Schema { missing });
        }

        let extra: Vec<&str> = headers
            .iter()
            .filter(|h| !REQUIRED_COLUMNS.contains(h))
            .collect();
        if !extra.is_empty() {
            warn!(columns = ?extra, "Ignoring unrecognized input columns");
        }

        // Presence was checked above.
        let at = |name: &str| position(name).unwrap_or_default();
        Ok(Self {
            transaction_id: at("transaction_id"),
            user_id: at("user_id"),
            amount: at("amount"),
            time: at("time"),
            method: at("method"),
            topup_flag: at("topup_flag"),
        })
    }

    fn parse_row(&self, row: &StringRecord, line: usize) -> Result<Transaction> {
        let field = |idx: usize| row.get(idx).unwrap_or("");

        let raw_id = field(self.transaction_id);
        let transaction_id = raw_id.parse::<i64>().map_err(|e| {
            PipelineError::invalid(line, "transaction_id", raw_id, e.to_string())
        })?;

        let raw_amount = field(self.amount);
        let amount = parse_amount(raw_amount)
            .map_err(|reason| PipelineError::invalid(line, "amount", raw_amount, reason))?;

        let raw_time = field(self.time);
        let time = parse_time(raw_time)
            .map_err(|reason| PipelineError::invalid(line, "time", raw_time, reason))?;

        let raw_topup = field(self.topup_flag);
        let topup_flag = parse_topup_flag(raw_topup)
            .map_err(|reason| PipelineError::invalid(line, "topup_flag", raw_topup, reason))?;

        debug!(row = line, transaction_id, "Parsed row");

        Ok(Transaction {
            transaction_id,
            user_id: field(self.user_id).to_string(),
            amount,
            time,
            method: field(self.method).to_string(),
            topup_flag,
        })
    }
}

fn parse_amount(raw: &str) -> std::result::Result<f64, String> {
    let amount: f64 = raw.parse().map_err(|_| "not a number".to_string())?;
    if !amount.is_finite() {
        return Err("amount must be finite".to_string());
    }
    if amount < 0.0 {
        return Err("amount must not be negative".to_string());
    }
    Ok(amount)
}

/// Parse a timestamp into naive UTC.
///
/// Offsets (RFC 3339) are converted to UTC; naive values are taken as UTC;
/// a bare date means midnight.
pub fn parse_time(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    if raw.is_empty() {
        return Err("timestamp is empty".to_string());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_utc());
    }
    for format in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(dt);
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(dt) = date.and_hms_opt(0, 0, 0) {
            return Ok(dt);
        }
    }
    Err("unrecognized timestamp format".to_string())
}

/// Normalize a top-up indicator to 0 or 1.
///
/// Numbers are truthy when non-zero; the usual boolean words are accepted
/// in any case.
pub fn parse_topup_flag(raw: &str) -> std::result::Result<u8, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" => return Ok(1),
        "false" | "f" | "no" | "n" => return Ok(0),
        "" => return Err("flag is empty".to_string()),
        _ => {}
    }
    if let Ok(n) = raw.parse::<i64>() {
        return Ok(u8::from(n != 0));
    }
    match raw.parse::<f64>() {
        Ok(x) if x.is_finite() => Ok(u8::from(x != 0.0)),
        _ => Err("not a boolean or number".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "transaction_id,user_id,amount,time,method,topup_flag\n";

    fn load(body: &str) -> Result<TransactionSet> {
        load_reader(format!("{HEADER}{body}").as_bytes())
    }

    #[test]
    fn test_load_sorts_and_normalizes() {
        let set = load(
            "1,user_1,100.0,2024-01-01 12:05:00,card,True\n\
             2,user_2,250.5,2024-01-01 12:00:00,mobile_money,0\n\
             3,user_1,80,2024-01-01T12:01:00Z,bank_transfer,yes\n",
        )
        .unwrap();

        let ids: Vec<i64> = set.records().iter().map(|t| t.transaction_id).collect();
        assert_eq!(ids, vec![2, 3, 1]);
        let flags: Vec<u8> = set.records().iter().map(|t| t.topup_flag).collect();
        assert_eq!(flags, vec![0, 1, 1]);
        assert_eq!(set.records()[0].method, "mobile_money");
    }

    #[test]
    fn test_empty_input_is_valid() {
        let set = load("").unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_missing_column_is_schema_error() {
        let input = "transaction_id,user_id,amount,time,method\n1,u,1.0,2024-01-01,card\n";
        match load_reader(input.as_bytes()) {
            Err(PipelineError::Schema { missing }) => assert_eq!(missing, vec!["topup_flag"]),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_column_order_and_extras_do_not_matter() {
        let input = "time, note ,topup_flag,method,amount,user_id,transaction_id\n\
                     2024-01-01 00:00:10,hello,1,card,5.5,u1,9\n";
        let set = load_reader(input.as_bytes()).unwrap();
        let tx = &set.records()[0];
        assert_eq!(tx.transaction_id, 9);
        assert_eq!(tx.user_id, "u1");
        assert_eq!(tx.amount, 5.5);
        assert_eq!(tx.topup_flag, 1);
    }

    #[test]
    fn test_non_numeric_amount_is_rejected() {
        let err = load("1,u,abc,2024-01-01 00:00:00,card,0\n").unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidValue { row: 1, column: "amount", .. }
        ));
    }

    #[test]
    fn test_bad_time_is_rejected_on_its_row() {
        let err = load(
            "1,u,1.0,2024-01-01 00:00:00,card,0\n\
             2,u,1.0,yesterday,card,0\n",
        )
        .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::InvalidValue { row: 2, column: "time", .. }
        ));
    }

    #[test]
    fn test_negative_amount_is_rejected() {
        let err = load("1,u,-5,2024-01-01 00:00:00,card,0\n").unwrap_err();
        assert!(matches!(err, PipelineError::InvalidValue { column: "amount", .. }));
    }

    #[test]
    fn test_parse_topup_flag_variants() {
        for raw in ["1", "2", "1.0", "true", "TRUE", "Yes", "y", "t"] {
            assert_eq!(parse_topup_flag(raw), Ok(1), "{raw}");
        }
        for raw in ["0", "0.0", "false", "False", "no", "N", "f"] {
            assert_eq!(parse_topup_flag(raw), Ok(0), "{raw}");
        }
        for raw in ["", "maybe", "NaN"] {
            assert!(parse_topup_flag(raw).is_err(), "{raw}");
        }
    }

    #[test]
    fn test_parse_time_variants() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(parse_time("2024-01-01 12:00:00"), Ok(expected));
        assert_eq!(parse_time("2024-01-01T12:00:00"), Ok(expected));
        assert_eq!(parse_time("2024-01-01T14:00:00+02:00"), Ok(expected));
        assert_eq!(parse_time("2024-01-01 12:00"), Ok(expected));
        assert_eq!(
            parse_time("2024-01-01"),
            Ok(expected - chrono::Duration::hours(12))
        );
        assert!(parse_time("01/01/2024").is_err());
    }
}
