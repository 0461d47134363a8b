//! Per-entity behavioral statistics, built in two phases.
//!
//! Phase 1 counts records per user over the whole batch; phase 2 joins the
//! count back onto every record and derives velocity. The count is a
//! population statistic: every record of a user sees the same value, including
//! records that happened after it.

use crate::error::RecordError;
use crate::records::{BehaviorFeatures, Transaction};
use std::collections::HashMap;
use tracing::warn;

/// Guards the velocity division when purchase and signup coincide.
pub const VELOCITY_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone)]
pub struct BehavioralAggregator {
    counts: HashMap<String, u64>,
    epsilon: f64,
}

impl BehavioralAggregator {
    /// Phase 1: count records per entity id across the full set.
    pub fn count_by_entity(records: &[Transaction]) -> Self {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for r in records {
            *counts.entry(r.user_id.clone()).or_insert(0) += 1;
        }
        Self {
            counts,
            epsilon: VELOCITY_EPSILON,
        }
    }

    /// Non-positive or non-finite values fall back to [`VELOCITY_EPSILON`].
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        if epsilon.is_finite() && epsilon > 0.0 {
            self.epsilon = epsilon;
        } else {
            warn!(epsilon, fallback = VELOCITY_EPSILON, "invalid velocity epsilon");
            self.epsilon = VELOCITY_EPSILON;
        }
        self
    }

    pub fn counts(&self) -> &HashMap<String, u64> {
        &self.counts
    }

    /// Sum of all counts; equals the number of records counted.
    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn entities(&self) -> usize {
        self.counts.len()
    }

    /// Phase 2: set `transaction_count` and `velocity`. Needs temporal features.
    pub fn annotate(&self, record: &mut Transaction) -> Result<(), RecordError> {
        let hours = record
            .temporal
            .as_ref()
            .map(|t| t.hours_since_signup)
            .ok_or(RecordError::MissingFeature("hours_since_signup"))?;
        let count = *self
            .counts
            .get(&record.user_id)
            .ok_or_else(|| RecordError::UnknownEntity(record.user_id.clone()))?;

        record.behavior = Some(BehaviorFeatures {
            transaction_count: count,
            velocity: record.amount / (hours + self.epsilon),
        });
        Ok(())
    }
}
