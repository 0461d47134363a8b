//! CSV boundary: transaction rows in, range tables in, enriched rows out.

use crate::error::EnrichError;
use crate::records::{IpRange, RawRecord, Transaction};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

/// Columns appended to every enriched row, in output order.
pub const DERIVED_COLUMNS: [&str; 6] = [
    "country",
    "hour_of_day",
    "day_of_week",
    "hours_since_signup",
    "transaction_count",
    "velocity",
];

#[derive(Debug, Deserialize)]
struct RangeRow {
    lower_bound_ip_address: String,
    upper_bound_ip_address: String,
    country: String,
}

pub fn read_records(path: &Path) -> Result<Vec<RawRecord>, EnrichError> {
    read_records_from(File::open(path)?)
}

/// Read a headered CSV into raw rows. Empty cells are left out of the row.
pub fn read_records_from<R: Read>(reader: R) -> Result<Vec<RawRecord>, EnrichError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers()?.clone();
    let mut out = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let mut raw = RawRecord::new(row);
        for (name, value) in headers.iter().zip(record.iter()) {
            if !value.trim().is_empty() {
                raw.fields.insert(name.to_string(), value.to_string());
            }
        }
        out.push(raw);
    }
    Ok(out)
}

pub fn read_ranges(path: &Path) -> Result<Vec<IpRange>, EnrichError> {
    read_ranges_from(File::open(path)?)
}

/// Read an IP range table. Bounds may be written as floats and are truncated;
/// anything outside the u32 domain is rejected.
pub fn read_ranges_from<R: Read>(reader: R) -> Result<Vec<IpRange>, EnrichError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let mut out = Vec::new();
    for (position, result) in rdr.deserialize::<RangeRow>().enumerate() {
        let row = result?;
        out.push(IpRange {
            lower: parse_bound(position, &row.lower_bound_ip_address)?,
            upper: parse_bound(position, &row.upper_bound_ip_address)?,
            label: row.country,
        });
    }
    Ok(out)
}

fn parse_bound(position: usize, value: &str) -> Result<u32, EnrichError> {
    let invalid = || EnrichError::InvalidBound {
        position,
        value: value.to_string(),
    };
    let v: f64 = value.trim().parse().map_err(|_| invalid())?;
    if !v.is_finite() || v < 0.0 || v.trunc() > u32::MAX as f64 {
        return Err(invalid());
    }
    Ok(v.trunc() as u32)
}

pub fn write_records(path: &Path, records: &[Transaction]) -> Result<(), EnrichError> {
    write_records_to(File::create(path)?, records)
}

/// Write source columns (union over all records, sorted) followed by the
/// derived columns. Unset values are written as empty cells.
pub fn write_records_to<W: Write>(writer: W, records: &[Transaction]) -> Result<(), EnrichError> {
    let source: BTreeSet<&str> = records
        .iter()
        .flat_map(|r| r.attributes.keys().map(String::as_str))
        .filter(|k| !DERIVED_COLUMNS.contains(k))
        .collect();
    let header: Vec<&str> = source.iter().copied().chain(DERIVED_COLUMNS).collect();

    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(&header)?;
    for r in records {
        let row: Vec<String> = header
            .iter()
            .map(|col| r.field(col).unwrap_or_default())
            .collect();
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_rows_and_skips_empty_cells() {
        let data = "user_id,ip_address,source\n1,732758368.79972,SEO\n2,,Ads\n";
        let rows = read_records_from(data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].row, 0);
        assert_eq!(rows[0].get("ip_address"), Some("732758368.79972"));
        assert_eq!(rows[1].get("ip_address"), None);
        assert_eq!(rows[1].get("source"), Some("Ads"));
    }

    #[test]
    fn reads_float_bounds() {
        let data = "lower_bound_ip_address,upper_bound_ip_address,country\n\
                    16777216.0,16777471,Australia\n\
                    16777472.0,16777727.9,China\n";
        let ranges = read_ranges_from(data.as_bytes()).unwrap();
        assert_eq!(ranges[0], IpRange::new(16777216, 16777471, "Australia"));
        assert_eq!(ranges[1], IpRange::new(16777472, 16777727, "China"));
    }

    #[test]
    fn rejects_out_of_domain_bounds() {
        let data = "lower_bound_ip_address,upper_bound_ip_address,country\n\
                    1,2,A\n\
                    -4,9,B\n";
        let err = read_ranges_from(data.as_bytes()).unwrap_err();
        assert!(matches!(err, EnrichError::InvalidBound { position: 1, .. }));

        let data = "lower_bound_ip_address,upper_bound_ip_address,country\n\
                    0,4294967296,C\n";
        assert!(read_ranges_from(data.as_bytes()).is_err());
    }
}
