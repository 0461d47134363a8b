//! Calendar and elapsed-time features from the signup and purchase timestamps.

use crate::error::RecordError;
use crate::records::{TemporalFeatures, Transaction};
use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc, Weekday,
};

const NAIVE_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const MICROS_PER_HOUR: f64 = 3_600_000_000.0;
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

/// Stateless; holds the column names only for error reporting.
#[derive(Debug, Clone)]
pub struct TemporalFeaturizer {
    signup_field: String,
    purchase_field: String,
}

impl Default for TemporalFeaturizer {
    fn default() -> Self {
        Self::new("signup_time", "purchase_time")
    }
}

impl TemporalFeaturizer {
    pub fn new(signup_field: impl Into<String>, purchase_field: impl Into<String>) -> Self {
        Self {
            signup_field: signup_field.into(),
            purchase_field: purchase_field.into(),
        }
    }

    /// Set `hour_of_day`, `day_of_week` and `hours_since_signup` on the record.
    /// A purchase before signup gives a negative elapsed time, left uncorrected.
    pub fn derive(&self, record: &mut Transaction) -> Result<(), RecordError> {
        let features = self.compute(&record.signup_time, &record.purchase_time)?;
        record.temporal = Some(features);
        Ok(())
    }

    pub fn compute(&self, signup: &str, purchase: &str) -> Result<TemporalFeatures, RecordError> {
        let signup_at = parse_timestamp(signup).ok_or_else(|| RecordError::MalformedTimestamp {
            field: self.signup_field.clone(),
            value: signup.to_string(),
        })?;
        let purchase_at =
            parse_timestamp(purchase).ok_or_else(|| RecordError::MalformedTimestamp {
                field: self.purchase_field.clone(),
                value: purchase.to_string(),
            })?;

        // Calendar fields use the wall clock of the purchase's own offset;
        // elapsed time compares absolute instants.
        Ok(TemporalFeatures {
            hour_of_day: purchase_at.hour(),
            day_of_week: day_name(purchase_at.weekday()).to_string(),
            hours_since_signup: hours(purchase_at - signup_at),
        })
    }
}

fn hours(elapsed: TimeDelta) -> f64 {
    match elapsed.num_microseconds() {
        Some(us) => us as f64 / MICROS_PER_HOUR,
        None => elapsed.num_milliseconds() as f64 / MILLIS_PER_HOUR,
    }
}

/// Parse the timestamp forms found in transaction exports. Offsets are kept;
/// naive values are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt);
    }
    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })?;
    Some(DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc).into())
}

pub fn day_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn tx(signup: &str, purchase: &str) -> Transaction {
        Transaction {
            row: 0,
            user_id: "u1".into(),
            signup_time: signup.into(),
            purchase_time: purchase.into(),
            amount: 10.0,
            ip_address: 0,
            attributes: BTreeMap::new(),
            country: None,
            temporal: None,
            behavior: None,
        }
    }

    #[test]
    fn derives_calendar_and_elapsed() {
        let mut t = tx("2015-02-24 22:55:49", "2015-04-18 02:47:11");
        TemporalFeaturizer::default().derive(&mut t).unwrap();
        let f = t.temporal.unwrap();
        assert_eq!(f.hour_of_day, 2);
        assert_eq!(f.day_of_week, "Saturday");
        let expected = (52.0 * 24.0 * 3600.0 + 3.0 * 3600.0 + 51.0 * 60.0 + 22.0) / 3600.0;
        assert!((f.hours_since_signup - expected).abs() < 1e-9);
    }

    #[test]
    fn purchase_before_signup_is_negative() {
        let f = TemporalFeaturizer::default()
            .compute("2015-01-02 00:00:00", "2015-01-01 12:00:00")
            .unwrap();
        assert_eq!(f.hours_since_signup, -12.0);
    }

    #[test]
    fn accepts_rfc3339_and_date_only() {
        let f = TemporalFeaturizer::default()
            .compute("2015-01-01", "2015-01-01T03:30:00+01:00")
            .unwrap();
        assert_eq!(f.hour_of_day, 3);
        assert_eq!(f.day_of_week, "Thursday");
        assert_eq!(f.hours_since_signup, 2.5);
    }

    #[test]
    fn offset_timestamps_keep_local_wall_clock() {
        let f = TemporalFeaturizer::default()
            .compute("2015-01-01T00:00:00+09:00", "2015-01-01T03:30:00+09:00")
            .unwrap();
        assert_eq!(f.hour_of_day, 3);
        assert_eq!(f.day_of_week, "Thursday");
        assert_eq!(f.hours_since_signup, 3.5);

        // Same instant written in two offsets: no elapsed time.
        let f = TemporalFeaturizer::default()
            .compute("2015-01-01T09:00:00+09:00", "2015-01-01T00:00:00Z")
            .unwrap();
        assert_eq!(f.hours_since_signup, 0.0);
        assert_eq!(f.hour_of_day, 0);
    }

    #[test]
    fn keeps_microsecond_precision() {
        let f = TemporalFeaturizer::default()
            .compute("2015-01-01 00:00:00", "2015-01-01 00:00:00.000360")
            .unwrap();
        assert!(f.hours_since_signup > 0.0);
        assert!((f.hours_since_signup - 1e-7).abs() < 1e-15);
    }

    #[test]
    fn malformed_timestamp_names_the_field() {
        let err = TemporalFeaturizer::default()
            .compute("2015-01-01 00:00:00", "yesterday")
            .unwrap_err();
        assert_eq!(
            err,
            RecordError::MalformedTimestamp {
                field: "purchase_time".into(),
                value: "yesterday".into()
            }
        );
    }

    #[test]
    fn derive_is_idempotent() {
        let mut t = tx("2015-02-24 22:55:49", "2015-04-18 02:47:11");
        let featurizer = TemporalFeaturizer::default();
        featurizer.derive(&mut t).unwrap();
        let first = t.clone();
        featurizer.derive(&mut t).unwrap();
        assert_eq!(t, first);
    }
}
