//! fraud-enrich: prepares transaction records for a fraud classifier.
//!
//! Modular structure:
//! - [`records`] — Raw rows, cleaned transactions, IP ranges; cleaning
//! - [`features`] — Interval index, temporal and behavioral features, pipeline
//! - [`transform`] — One-hot encoding and standard scaling into a matrix
//! - [`ingest`] — CSV input and output
//! - [`logging`] — Structured JSON logging
//! - [`error`] — Fatal and per-record error types

pub mod config;
pub mod error;
pub mod features;
pub mod ingest;
pub mod logging;
pub mod records;
pub mod transform;

pub use config::EnrichConfig;
pub use error::{EnrichError, RecordError};
pub use features::{
    BatchReport, BehavioralAggregator, EnrichmentPipeline, IntervalIndex, PipelineOutput,
    PipelineStage, TemporalFeaturizer,
};
pub use logging::StructuredLogger;
pub use records::{IpRange, RawRecord, Transaction};
pub use transform::{encode_and_scale, FeatureMatrix};
