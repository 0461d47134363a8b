//! Enrichment configuration. Loaded from JSON; every section has defaults.

use crate::error::EnrichError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrichConfig {
    /// Input CSV locations
    pub input: InputConfig,
    /// Output CSV locations
    pub output: OutputConfig,
    /// Column names of the consumed record fields
    pub columns: ColumnsConfig,
    /// Pipeline behavior (failure policy, parallelism, epsilon)
    pub pipeline: PipelineConfig,
    /// Categorical encoding and numerical scaling
    pub encoding: EncodingConfig,
    /// Logging
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Transaction records (headered CSV)
    pub transactions_path: PathBuf,
    /// IP range table: lower_bound_ip_address, upper_bound_ip_address, country
    pub ranges_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Enriched records with all derived fields
    pub records_path: PathBuf,
    /// Encoded and scaled feature matrix; skipped when unset
    pub matrix_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub user_id: String,
    pub signup_time: String,
    pub purchase_time: String,
    pub amount: String,
    pub ip_address: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Drop bad records and account for them in the batch report
    DropAndReport,
    /// Abort the run on the first bad record
    Halt,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub failure_policy: FailurePolicy,
    /// Run per-record stages on the rayon pool
    pub parallel: bool,
    /// Added to hours since signup before dividing the amount
    pub velocity_epsilon: f64,
    /// Remove exact duplicate rows while cleaning
    pub drop_duplicates: bool,
    /// Reject rows with an empty source column that feeds the encoder
    pub drop_incomplete: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Countries outside the N most frequent collapse to "Other"
    pub top_countries: usize,
    pub categorical: Vec<String>,
    pub numerical: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub json: bool,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            transactions_path: PathBuf::from("data/Fraud_Data.csv"),
            ranges_path: PathBuf::from("data/IpAddress_to_Country.csv"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            records_path: PathBuf::from("data/enriched.csv"),
            matrix_path: None,
        }
    }
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            user_id: "user_id".to_string(),
            signup_time: "signup_time".to_string(),
            purchase_time: "purchase_time".to_string(),
            amount: "purchase_value".to_string(),
            ip_address: "ip_address".to_string(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::DropAndReport,
            parallel: true,
            velocity_epsilon: crate::features::VELOCITY_EPSILON,
            drop_duplicates: true,
            drop_incomplete: true,
        }
    }
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            top_countries: 10,
            categorical: ["country", "day_of_week", "source", "browser", "sex"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            numerical: [
                "purchase_value",
                "age",
                "hour_of_day",
                "hours_since_signup",
                "transaction_count",
                "velocity",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl EncodingConfig {
    /// Encoder inputs read straight from the source rows, i.e. excluding the
    /// columns the pipeline derives.
    pub fn source_columns(&self) -> Vec<String> {
        self.categorical
            .iter()
            .chain(&self.numerical)
            .filter(|c| !crate::ingest::DERIVED_COLUMNS.contains(&c.as_str()))
            .cloned()
            .collect()
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: true,
        }
    }
}

impl EnrichConfig {
    /// Load from JSON file if present; otherwise return default.
    /// An unreadable or malformed file also yields the default, with a warning.
    pub fn load(path: &std::path::Path) -> Self {
        match Self::try_load(path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "config not loaded; using defaults");
                Self::default()
            }
        }
    }

    /// Like [`EnrichConfig::load`], but a file that exists and fails to read or
    /// parse is an error rather than a silent fallback.
    pub fn try_load(path: &std::path::Path) -> Result<Self, EnrichError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }
}
