//! Raw → Cleaned: duplicate removal and coercion of the consumed fields.

use super::{RawRecord, Transaction};
use crate::config::ColumnsConfig;
use crate::error::RecordError;
use std::collections::HashSet;

/// Keep the first of each group of rows with identical fields. Returns the
/// surviving rows in input order and the number removed.
pub fn dedupe(records: Vec<RawRecord>) -> (Vec<RawRecord>, usize) {
    let before = records.len();
    let mut seen = HashSet::with_capacity(before);
    let kept: Vec<RawRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.fields.clone()))
        .collect();
    let removed = before - kept.len();
    (kept, removed)
}

/// Coerce a raw row into a typed transaction. Timestamps stay textual and are
/// parsed by the temporal featurizer.
pub fn clean(raw: RawRecord, columns: &ColumnsConfig) -> Result<Transaction, RecordError> {
    let user_id = raw
        .get(&columns.user_id)
        .ok_or(RecordError::MissingEntityId)?
        .to_string();

    let ip_address = raw
        .get(&columns.ip_address)
        .and_then(parse_number)
        .map(|ip| ip.trunc() as i64)
        .ok_or(RecordError::MissingIpAddress)?;

    let amount = raw
        .get(&columns.amount)
        .and_then(parse_number)
        .ok_or(RecordError::MissingAmount)?;

    let signup_time = timestamp_field(&raw, &columns.signup_time)?;
    let purchase_time = timestamp_field(&raw, &columns.purchase_time)?;

    Ok(Transaction {
        row: raw.row,
        user_id,
        signup_time,
        purchase_time,
        amount,
        ip_address,
        attributes: raw.fields,
        country: None,
        temporal: None,
        behavior: None,
    })
}

/// Reject a row whose listed source columns are absent or blank.
pub fn require_fields(record: Transaction, required: &[String]) -> Result<Transaction, RecordError> {
    let missing = required.iter().find(|col| {
        record
            .attributes
            .get(col.as_str())
            .map_or(true, |v| v.trim().is_empty())
    });
    match missing {
        Some(col) => Err(RecordError::MissingField(col.clone())),
        None => Ok(record),
    }
}

fn timestamp_field(raw: &RawRecord, column: &str) -> Result<String, RecordError> {
    raw.get(column)
        .map(str::to_string)
        .ok_or_else(|| RecordError::MalformedTimestamp {
            field: column.to_string(),
            value: String::new(),
        })
}

fn parse_number(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}
