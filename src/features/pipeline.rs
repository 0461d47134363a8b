//! Enrichment pipeline: raw rows → cleaned → IP enriched → time featured →
//! behavior featured → ready for encoding.
//!
//! Every stage is a total pass over the batch. Per-record failures are either
//! collected into the [`BatchReport`] or abort the run, depending on the
//! configured [`FailurePolicy`].

use super::{BehavioralAggregator, IntervalIndex, TemporalFeaturizer};
use crate::config::{ColumnsConfig, FailurePolicy, PipelineConfig};
use crate::error::{EnrichError, RecordError};
use crate::records::{self, RawRecord, Transaction};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Raw,
    Cleaned,
    IpEnriched,
    TimeFeatured,
    BehaviorFeatured,
    ReadyForEncoding,
}

/// A record dropped from the batch, with the stage that rejected it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Rejection {
    pub row: usize,
    pub stage: PipelineStage,
    pub error: RecordError,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub run_id: Uuid,
    /// Last stage reached
    pub stage: PipelineStage,
    pub input_rows: usize,
    pub duplicate_rows: usize,
    pub output_rows: usize,
    pub rejected: Vec<Rejection>,
}

impl BatchReport {
    fn new(input_rows: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            stage: PipelineStage::Raw,
            input_rows,
            duplicate_rows: 0,
            output_rows: 0,
            rejected: Vec::new(),
        }
    }

    /// Every input row is either in the output, a removed duplicate, or rejected.
    pub fn is_balanced(&self) -> bool {
        self.input_rows == self.output_rows + self.duplicate_rows + self.rejected.len()
    }

    pub fn rejected_at(&self, stage: PipelineStage) -> usize {
        self.rejected.iter().filter(|r| r.stage == stage).count()
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub records: Vec<Transaction>,
    pub report: BatchReport,
}

pub struct EnrichmentPipeline {
    config: PipelineConfig,
    columns: ColumnsConfig,
    index: Arc<IntervalIndex>,
    temporal: TemporalFeaturizer,
    /// Source columns that must be non-empty when `drop_incomplete` is set
    required: Vec<String>,
}

impl EnrichmentPipeline {
    pub fn new(config: PipelineConfig, columns: ColumnsConfig, index: Arc<IntervalIndex>) -> Self {
        let temporal = TemporalFeaturizer::new(&columns.signup_time, &columns.purchase_time);
        Self {
            config,
            columns,
            index,
            temporal,
            required: Vec::new(),
        }
    }

    /// Source columns a row must carry to survive cleaning, typically the
    /// encoder inputs ([`crate::config::EncodingConfig::source_columns`]).
    pub fn with_required_fields(mut self, fields: impl IntoIterator<Item = String>) -> Self {
        self.required = fields.into_iter().collect();
        self
    }

    pub fn index(&self) -> &Arc<IntervalIndex> {
        &self.index
    }

    /// Run all stages over the batch.
    pub fn run(&self, raw: Vec<RawRecord>) -> Result<PipelineOutput, EnrichError> {
        let mut report = BatchReport::new(raw.len());
        info!(run_id = %report.run_id, rows = raw.len(), "pipeline run started");

        // Raw → Cleaned
        let raw = if self.config.drop_duplicates {
            let (kept, removed) = records::dedupe(raw);
            report.duplicate_rows = removed;
            kept
        } else {
            raw
        };
        let required: &[String] = if self.config.drop_incomplete {
            &self.required
        } else {
            &[]
        };
        let cleaned = raw.into_iter().map(|r| {
            let row = r.row;
            let outcome = records::clean(r, &self.columns)
                .and_then(|t| records::require_fields(t, required));
            (row, outcome)
        });
        let batch = self.settle(PipelineStage::Cleaned, cleaned, &mut report)?;

        // Cleaned → IpEnriched
        let index = Arc::clone(&self.index);
        let batch = self.apply(PipelineStage::IpEnriched, batch, &mut report, |r| {
            r.country = Some(index.lookup_address(r.ip_address).to_string());
            Ok(())
        })?;

        // IpEnriched → TimeFeatured
        let batch = self.apply(PipelineStage::TimeFeatured, batch, &mut report, |r| {
            self.temporal.derive(r)
        })?;

        // Barrier: counts are taken over every surviving record before any is annotated.
        let aggregator = BehavioralAggregator::count_by_entity(&batch)
            .with_epsilon(self.config.velocity_epsilon);
        debug!(entities = aggregator.entities(), "entity counts built");
        let batch = self.apply(PipelineStage::BehaviorFeatured, batch, &mut report, |r| {
            aggregator.annotate(r)
        })?;

        report.stage = PipelineStage::ReadyForEncoding;
        report.output_rows = batch.len();
        if !report.rejected.is_empty() {
            warn!(
                run_id = %report.run_id,
                rejected = report.rejected.len(),
                "records rejected"
            );
        }
        info!(
            run_id = %report.run_id,
            output = report.output_rows,
            duplicates = report.duplicate_rows,
            "pipeline run complete"
        );
        Ok(PipelineOutput {
            records: batch,
            report,
        })
    }

    /// Apply a per-record step, on the rayon pool when enabled. Order is kept.
    fn apply<F>(
        &self,
        stage: PipelineStage,
        records: Vec<Transaction>,
        report: &mut BatchReport,
        step: F,
    ) -> Result<Vec<Transaction>, EnrichError>
    where
        F: Fn(&mut Transaction) -> Result<(), RecordError> + Sync + Send,
    {
        let run_step = |mut r: Transaction| {
            let row = r.row;
            (row, step(&mut r).map(|_| r))
        };
        let outcomes: Vec<(usize, Result<Transaction, RecordError>)> = if self.config.parallel {
            records.into_par_iter().map(run_step).collect()
        } else {
            records.into_iter().map(run_step).collect()
        };
        self.settle(stage, outcomes, report)
    }

    /// Split outcomes into survivors and rejections according to the failure policy.
    fn settle<T>(
        &self,
        stage: PipelineStage,
        outcomes: impl IntoIterator<Item = (usize, Result<T, RecordError>)>,
        report: &mut BatchReport,
    ) -> Result<Vec<T>, EnrichError> {
        let mut kept = Vec::new();
        for (row, outcome) in outcomes {
            match outcome {
                Ok(t) => kept.push(t),
                Err(error) => {
                    if self.config.failure_policy == FailurePolicy::Halt {
                        return Err(EnrichError::Halted {
                            row,
                            stage,
                            source: error,
                        });
                    }
                    debug!(row, ?stage, kind = error.kind(), "record rejected");
                    report.rejected.push(Rejection { row, stage, error });
                }
            }
        }
        report.stage = stage;
        debug!(?stage, rows = kept.len(), "stage complete");
        Ok(kept)
    }
}
