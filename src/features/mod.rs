//! Record enrichment: IP range lookup, temporal features, per-entity behavior,
//! and the pipeline that runs them in order.

mod behavioral;
mod interval;
mod pipeline;
mod temporal;

pub use behavioral::{BehavioralAggregator, VELOCITY_EPSILON};
pub use interval::{linear_lookup, IntervalIndex, UNKNOWN_COUNTRY};
pub use pipeline::{BatchReport, EnrichmentPipeline, PipelineOutput, PipelineStage, Rejection};
pub use temporal::{day_name, parse_timestamp, TemporalFeaturizer};
