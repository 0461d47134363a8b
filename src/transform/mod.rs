//! Hand-off to the model: categorical one-hot encoding and standard scaling
//! into a dense matrix.

use crate::config::EncodingConfig;
use crate::error::EnrichError;
use crate::features::UNKNOWN_COUNTRY;
use crate::records::Transaction;
use ndarray::{Array2, Axis};
use std::collections::{BTreeSet, HashMap};
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    /// One row per record, in record order
    pub values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.values.column(idx).to_vec())
    }

    pub fn write_csv(&self, path: &Path) -> Result<(), EnrichError> {
        self.write_csv_to(std::fs::File::create(path)?)
    }

    pub fn write_csv_to<W: Write>(&self, writer: W) -> Result<(), EnrichError> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(&self.columns)?;
        for row in self.values.rows() {
            wtr.write_record(row.iter().map(|v| v.to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }
}

/// Most frequent countries, ties broken by first appearance.
pub fn top_countries(records: &[Transaction], n: usize) -> Vec<String> {
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for (i, r) in records.iter().enumerate() {
        if let Some(c) = r.country.as_deref() {
            tally.entry(c).or_insert((0, i)).0 += 1;
        }
    }
    let mut ranked: Vec<(&str, (usize, usize))> = tally.into_iter().collect();
    ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
    ranked.into_iter().take(n).map(|(c, _)| c.to_string()).collect()
}

/// One-hot encode the categorical columns (first sorted category dropped) and
/// standard-scale the numerical ones. Countries outside the top N become "Other".
pub fn encode_and_scale(records: &[Transaction], config: &EncodingConfig) -> FeatureMatrix {
    let keep: BTreeSet<String> = top_countries(records, config.top_countries)
        .into_iter()
        .collect();
    let category = |r: &Transaction, col: &str| -> String {
        let value = r.field(col).unwrap_or_default();
        if col == "country" && !keep.contains(&value) {
            UNKNOWN_COUNTRY.to_string()
        } else {
            value
        }
    };

    let mut columns = Vec::new();
    let mut blocks: Vec<Vec<f64>> = Vec::new();

    for col in &config.numerical {
        let raw: Vec<f64> = records
            .iter()
            .map(|r| {
                r.field(col)
                    .and_then(|v| v.trim().parse::<f64>().ok())
                    .filter(|v| v.is_finite())
                    .unwrap_or(0.0)
            })
            .collect();
        columns.push(col.clone());
        blocks.push(standardize(raw));
    }

    for col in &config.categorical {
        let values: Vec<String> = records.iter().map(|r| category(r, col)).collect();
        let levels: BTreeSet<&str> = values.iter().map(String::as_str).collect();
        for level in levels.into_iter().skip(1) {
            columns.push(format!("{col}_{level}"));
            blocks.push(
                values
                    .iter()
                    .map(|v| if v == level { 1.0 } else { 0.0 })
                    .collect(),
            );
        }
    }

    let mut values = Array2::zeros((records.len(), columns.len()));
    for (j, block) in blocks.into_iter().enumerate() {
        for (i, v) in block.into_iter().enumerate() {
            values[[i, j]] = v;
        }
    }
    tracing::debug!(
        rows = values.len_of(Axis(0)),
        columns = columns.len(),
        "feature matrix built"
    );
    FeatureMatrix { columns, values }
}

/// (x - mean) / std with population std; constant columns map to 0.
pub fn standardize(mut xs: Vec<f64>) -> Vec<f64> {
    if xs.is_empty() {
        return xs;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let std = (xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n).sqrt();
    for x in xs.iter_mut() {
        *x = if std > 0.0 { (*x - mean) / std } else { 0.0 };
    }
    xs
}
