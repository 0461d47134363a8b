//! Error types: fatal run errors and per-record errors collected into the batch report.

use crate::features::PipelineStage;
use serde::Serialize;
use thiserror::Error;

/// Errors that stop a run (or a build) entirely.
#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("invalid range table: range #{position} has lower bound {lower} > upper bound {upper}")]
    InvalidRangeTable { position: usize, lower: u32, upper: u32 },

    #[error("invalid range table: range #{position} bound {value:?} is not an unsigned 32-bit address")]
    InvalidBound { position: usize, value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    #[error("run halted at row {row} during {stage:?}: {source}")]
    Halted {
        row: usize,
        stage: PipelineStage,
        #[source]
        source: RecordError,
    },
}

/// Errors scoped to a single record. Under the default policy these are
/// reported alongside the processed records instead of aborting the run.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum RecordError {
    #[error("malformed timestamp in {field}: {value:?}")]
    MalformedTimestamp { field: String, value: String },

    #[error("missing entity id")]
    MissingEntityId,

    #[error("missing or non-numeric IP address")]
    MissingIpAddress,

    #[error("missing or non-numeric amount")]
    MissingAmount,

    #[error("missing value in column {0}")]
    MissingField(String),

    #[error("required feature {0} not derived yet")]
    MissingFeature(&'static str),

    #[error("entity {0} absent from count map")]
    UnknownEntity(String),
}

impl RecordError {
    /// Short machine-readable kind used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            RecordError::MalformedTimestamp { .. } => "malformed_timestamp",
            RecordError::MissingEntityId => "missing_entity_id",
            RecordError::MissingIpAddress => "missing_ip_address",
            RecordError::MissingAmount => "missing_amount",
            RecordError::MissingField(_) => "missing_field",
            RecordError::MissingFeature(_) => "missing_feature",
            RecordError::UnknownEntity(_) => "unknown_entity",
        }
    }
}
