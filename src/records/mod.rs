//! Record types: raw CSV rows, cleaned transactions that gain derived
//! fields stage by stage, and IP range table entries.

mod clean;

pub use clean::{clean, dedupe, require_fields};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A row as read from the source, keyed by column name. Empty cells are absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// 0-based position in the input
    pub row: usize,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(row: usize) -> Self {
        Self {
            row,
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Trimmed, non-empty value of a column.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// Cleaned transaction. Derived fields start unset and are filled in by the
/// pipeline stages; nothing is ever removed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub row: usize,
    pub user_id: String,
    pub signup_time: String,
    pub purchase_time: String,
    pub amount: f64,
    /// Integer address; may be negative or exceed u32 in dirty data
    pub ip_address: i64,
    /// Source columns as read, passed through untouched
    pub attributes: BTreeMap<String, String>,
    pub country: Option<String>,
    pub temporal: Option<TemporalFeatures>,
    pub behavior: Option<BehaviorFeatures>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalFeatures {
    pub hour_of_day: u32,
    pub day_of_week: String,
    /// Negative when the event precedes signup; surfaced as-is
    pub hours_since_signup: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorFeatures {
    /// Records sharing this entity id across the whole batch
    pub transaction_count: u64,
    pub velocity: f64,
}

/// Closed interval of addresses mapped to a country label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpRange {
    pub lower: u32,
    pub upper: u32,
    pub label: String,
}

impl IpRange {
    pub fn new(lower: u32, upper: u32, label: impl Into<String>) -> Self {
        Self {
            lower,
            upper,
            label: label.into(),
        }
    }

    pub fn contains(&self, point: u32) -> bool {
        self.lower <= point && point <= self.upper
    }
}

impl Transaction {
    /// Value of a named field, derived or pass-through, rendered as text.
    /// Used by the encoder and the CSV writer so both see the same columns.
    pub fn field(&self, name: &str) -> Option<String> {
        match name {
            "country" => self.country.clone(),
            "hour_of_day" => self.temporal.as_ref().map(|t| t.hour_of_day.to_string()),
            "day_of_week" => self.temporal.as_ref().map(|t| t.day_of_week.clone()),
            "hours_since_signup" => self
                .temporal
                .as_ref()
                .map(|t| t.hours_since_signup.to_string()),
            "transaction_count" => self
                .behavior
                .as_ref()
                .map(|b| b.transaction_count.to_string()),
            "velocity" => self.behavior.as_ref().map(|b| b.velocity.to_string()),
            _ => self.attributes.get(name).cloned(),
        }
    }
}
