//! Record - The sleep session entity
//!
//! A `SleepRecord` is an immutable value from the store's point of view:
//! changes are modelled as delete + insert, or as an upsert on the same id.

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One monitored sleep session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepRecord {
    /// Primary key; 0 means "let the store assign one"
    pub id: i64,
    /// When the session was recorded
    pub date: DateTime<Utc>,
    /// Total sleep duration in hours
    pub duration: f32,
    /// Quality score as a percentage
    pub quality: i32,
    /// Representative heart rate (bpm)
    pub heart_rate: i32,
    /// Steps counted during the monitored period
    pub step_count: i32,
    /// Deep sleep in hours
    pub deep_sleep_duration: f32,
    /// Light sleep in hours
    pub light_sleep_duration: f32,
    /// REM sleep in hours
    pub rem_sleep_duration: f32,
}

impl SleepRecord {
    /// Create an unsaved record with the given date and duration
    #[must_use]
    pub fn new(date: DateTime<Utc>, duration: f32) -> Self {
        Self {
            id: 0,
            date,
            duration,
            quality: 0,
            heart_rate: 0,
            step_count: 0,
            deep_sleep_duration: 0.0,
            light_sleep_duration: 0.0,
            rem_sleep_duration: 0.0,
        }
    }

    /// Set the primary key
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = id;
        self
    }

    /// Set quality, heart rate and step count
    #[must_use]
    pub fn with_vitals(mut self, quality: i32, heart_rate: i32, step_count: i32) -> Self {
        self.quality = quality;
        self.heart_rate = heart_rate;
        self.step_count = step_count;
        self
    }

    /// Set the per-stage durations (hours)
    #[must_use]
    pub fn with_stages(mut self, deep: f32, light: f32, rem: f32) -> Self {
        self.deep_sleep_duration = deep;
        self.light_sleep_duration = light;
        self.rem_sleep_duration = rem;
        self
    }

    /// Whether the store has yet to assign an id
    #[must_use]
    pub fn is_unsaved(&self) -> bool {
        self.id == 0
    }
}

/// Rough quality score (0-100) from heart rate, movement and duration.
#[must_use]
pub fn estimate_quality(heart_rate: i32, step_count: i32, duration_hours: f32) -> i32 {
    let mut quality = 100;

    if heart_rate > 100 {
        quality -= 20;
    } else if heart_rate > 80 {
        quality -= 10;
    } else if heart_rate < 50 {
        quality -= 15;
    }

    // movement during sleep
    if step_count > 100 {
        quality -= 15;
    } else if step_count > 50 {
        quality -= 10;
    }

    if duration_hours < 6.0 {
        quality -= 20;
    } else if duration_hours < 7.0 {
        quality -= 10;
    } else if duration_hours > 9.0 {
        quality -= 5;
    }

    quality.clamp(0, 100)
}

/// Encode a date as epoch milliseconds
#[must_use]
pub fn date_to_millis(date: DateTime<Utc>) -> i64 {
    date.timestamp_millis()
}

/// Decode a stored epoch-millisecond value, rejecting null or out-of-range values
pub fn millis_to_date(millis: Option<i64>) -> Result<DateTime<Utc>> {
    let millis = millis.ok_or_else(|| {
        Error::DataIntegrity("expected non-null date but was null".to_string())
    })?;

    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        Error::DataIntegrity(format!("stored date {millis} is not a valid timestamp"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_builder() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 7, 0, 0).unwrap();
        let record = SleepRecord::new(date, 7.5)
            .with_vitals(85, 58, 12)
            .with_stages(1.5, 4.0, 2.0);

        assert!(record.is_unsaved());
        assert_eq!(record.quality, 85);
        assert_eq!(record.heart_rate, 58);
        assert_eq!(record.step_count, 12);
        assert_eq!(record.rem_sleep_duration, 2.0);

        let saved = record.with_id(9);
        assert!(!saved.is_unsaved());
    }

    #[test]
    fn test_estimate_quality() {
        assert_eq!(estimate_quality(60, 10, 8.0), 100);
        assert_eq!(estimate_quality(90, 10, 8.0), 90);
        assert_eq!(estimate_quality(110, 120, 5.0), 45);
        assert_eq!(estimate_quality(45, 60, 9.5), 70);
        assert_eq!(estimate_quality(60, 0, 6.5), 90);
    }

    #[test]
    fn test_date_millis_conversion() {
        let date = Utc.with_ymd_and_hms(2024, 1, 3, 6, 30, 0).unwrap();
        let millis = date_to_millis(date);
        assert_eq!(millis, 1_704_263_400_000);
        assert_eq!(millis_to_date(Some(millis)).unwrap(), date);
    }

    #[test]
    fn test_null_date_is_integrity_error() {
        let err = millis_to_date(None).unwrap_err();
        assert!(err.is_corruption());
        assert!(err.to_string().contains("expected non-null date but was null"));
    }

    #[test]
    fn test_out_of_range_date_is_integrity_error() {
        let err = millis_to_date(Some(i64::MAX)).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_serde_field_names() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let json = serde_json::to_value(SleepRecord::new(date, 8.0)).unwrap();
        assert_eq!(json["heart_rate"], 0);
        assert_eq!(json["duration"], 8.0);
    }
}
