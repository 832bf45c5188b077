//! Input sanitization
//!
//! Malformed values never fail a sync. They are clamped to the nearest valid
//! value (or dropped, for samples with no sensible nearest value) and each
//! adjustment is reported as a [`ValidationIssue`].

use tracing::debug;

use crate::types::{DailySnapshot, IssueCode, SleepRecord, ValidationIssue};

/// Highest sleep score on the 0-100 scale
const MAX_SLEEP_SCORE: f64 = 100.0;

/// Cleans up one source's snapshot before merging
pub struct Sanitizer;

impl Sanitizer {
    /// Return a sanitized copy of `snapshot` plus the issues raised
    pub fn sanitize(
        source_id: &str,
        snapshot: &DailySnapshot,
    ) -> (DailySnapshot, Vec<ValidationIssue>) {
        let mut issues = Vec::new();
        let mut clean = snapshot.clone();

        if clean.steps < 0 {
            issues.push(ValidationIssue::warning(
                IssueCode::ClampedValue,
                format!("{source_id}: negative step count {} clamped to 0", clean.steps),
            ));
            clean.steps = 0;
        }

        if let Some(hr) = clean.heart_rate {
            if !hr.is_finite() || hr < 0.0 {
                issues.push(ValidationIssue::warning(
                    IssueCode::ClampedValue,
                    format!("{source_id}: invalid reported heart rate {hr} discarded"),
                ));
                clean.heart_rate = None;
            }
        }

        let before = clean.heart_rate_readings.len();
        clean
            .heart_rate_readings
            .retain(|r| r.value.is_finite() && r.value > 0.0);
        let dropped = before - clean.heart_rate_readings.len();
        if dropped > 0 {
            issues.push(ValidationIssue::warning(
                IssueCode::DroppedReading,
                format!("{source_id}: dropped {dropped} heart rate reading(s) with invalid values"),
            ));
        }

        // Readings inherit the snapshot's source
        for reading in &mut clean.heart_rate_readings {
            if reading.source_id != source_id {
                reading.source_id = source_id.to_string();
            }
        }

        clean.sleep = sanitize_sleep(source_id, &clean.sleep, &mut issues);

        if !issues.is_empty() {
            debug!(source = source_id, adjustments = issues.len(), "sanitized snapshot");
        }

        (clean, issues)
    }
}

fn sanitize_sleep(
    source_id: &str,
    sleep: &SleepRecord,
    issues: &mut Vec<ValidationIssue>,
) -> SleepRecord {
    let mut clamp_minutes = |field: &str, value: f64| -> f64 {
        if value.is_finite() && value >= 0.0 {
            return value;
        }
        issues.push(ValidationIssue::warning(
            IssueCode::ClampedValue,
            format!("{source_id}: invalid sleep {field} {value} clamped to 0"),
        ));
        0.0
    };

    let mut clean = SleepRecord {
        total_minutes: clamp_minutes("total_minutes", sleep.total_minutes),
        deep_minutes: clamp_minutes("deep_minutes", sleep.deep_minutes),
        light_minutes: clamp_minutes("light_minutes", sleep.light_minutes),
        rem_minutes: clamp_minutes("rem_minutes", sleep.rem_minutes),
        awake_minutes: clamp_minutes("awake_minutes", sleep.awake_minutes),
        score: sleep.score,
    };

    let score = if sleep.score.is_finite() {
        sleep.score.clamp(0.0, MAX_SLEEP_SCORE)
    } else {
        0.0
    };
    if score != sleep.score {
        issues.push(ValidationIssue::warning(
            IssueCode::ClampedValue,
            format!("{source_id}: sleep score {} clamped to {score}", sleep.score),
        ));
    }
    clean.score = score;

    clean
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimestampedReading;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, 0).unwrap()
    }

    fn snapshot() -> DailySnapshot {
        let captured_at = at(23, 0);
        DailySnapshot {
            steps: 8500,
            heart_rate: Some(68.0),
            heart_rate_readings: vec![
                TimestampedReading::new(at(9, 0), 70.0, "garmin"),
                TimestampedReading::new(at(9, 5), 72.0, "garmin"),
            ],
            sleep: SleepRecord {
                total_minutes: 420.0,
                deep_minutes: 90.0,
                light_minutes: 210.0,
                rem_minutes: 90.0,
                awake_minutes: 30.0,
                score: 82.0,
            },
            captured_at,
        }
    }

    #[test]
    fn test_valid_snapshot_untouched() {
        let input = snapshot();
        let (clean, issues) = Sanitizer::sanitize("garmin", &input);

        assert!(issues.is_empty());
        assert_eq!(clean.steps, input.steps);
        assert_eq!(clean.heart_rate_readings, input.heart_rate_readings);
        assert_eq!(clean.sleep, input.sleep);
    }

    #[test]
    fn test_negative_steps_clamped() {
        let mut input = snapshot();
        input.steps = -40;

        let (clean, issues) = Sanitizer::sanitize("phone", &input);
        assert_eq!(clean.steps, 0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::ClampedValue);
        assert!(issues[0].message.contains("phone"));
    }

    #[test]
    fn test_invalid_readings_dropped() {
        let mut input = snapshot();
        input.heart_rate_readings[0].value = f64::NAN;
        input.heart_rate_readings.push(TimestampedReading::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 10, 0).unwrap(),
            -3.0,
            "garmin",
        ));

        let (clean, issues) = Sanitizer::sanitize("garmin", &input);
        assert_eq!(clean.heart_rate_readings.len(), 1);
        assert_eq!(clean.heart_rate_readings[0].value, 72.0);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, IssueCode::DroppedReading);
    }

    #[test]
    fn test_sleep_clamping() {
        let mut input = snapshot();
        input.sleep.deep_minutes = -10.0;
        input.sleep.score = 140.0;

        let (clean, issues) = Sanitizer::sanitize("oura", &input);
        assert_eq!(clean.sleep.deep_minutes, 0.0);
        assert_eq!(clean.sleep.score, 100.0);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_readings_take_snapshot_source() {
        let mut input = snapshot();
        input.heart_rate_readings[0].source_id = "phone".to_string();
        input.heart_rate_readings[1].source_id = String::new();

        let (clean, _) = Sanitizer::sanitize("garmin", &input);
        assert!(clean.heart_rate_readings.iter().all(|r| r.source_id == "garmin"));
    }
}
