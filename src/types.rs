//! Core types for the fusion engine
//!
//! This module defines what flows in (per-source daily snapshots, workouts)
//! and what flows out (one merged snapshot plus its validation issues).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Static trust information for one data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Source identifier (e.g. "apple_watch", "phone")
    pub id: String,
    /// Human readable name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Priority, higher = more trusted
    pub priority: i32,
    /// Confidence weight in [0, 1]
    pub reliability: f64,
}

impl SourceDescriptor {
    pub fn new(id: &str, name: &str, priority: i32, reliability: f64) -> Self {
        Self {
            id: id.to_string(),
            name: Some(name.to_string()),
            priority,
            reliability,
        }
    }
}

/// A single timestamped sample (one heart-rate reading)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimestampedReading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    /// Always replaced by the snapshot key during sanitization
    #[serde(default)]
    pub source_id: String,
}

impl TimestampedReading {
    pub fn new(timestamp: DateTime<Utc>, value: f64, source_id: &str) -> Self {
        Self {
            timestamp,
            value,
            source_id: source_id.to_string(),
        }
    }
}

/// One night of sleep as reported by a single source
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepRecord {
    pub total_minutes: f64,
    pub deep_minutes: f64,
    pub light_minutes: f64,
    pub rem_minutes: f64,
    pub awake_minutes: f64,
    /// Sleep score (0-100)
    pub score: f64,
}

impl SleepRecord {
    /// Sum of all stage durations
    pub fn stage_total(&self) -> f64 {
        self.deep_minutes + self.light_minutes + self.rem_minutes + self.awake_minutes
    }
}

/// One source's view of a single day, as received from the sync caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailySnapshot {
    /// Total steps for the day. Signed so malformed (negative) input can be
    /// clamped and reported instead of rejected.
    #[serde(default)]
    pub steps: i64,
    /// Source-reported average heart rate, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(default)]
    pub heart_rate_readings: Vec<TimestampedReading>,
    #[serde(default)]
    pub sleep: SleepRecord,
    pub captured_at: DateTime<Utc>,
}

/// An actively recorded workout (e.g. a Strava activity)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSession {
    pub id: String,
    pub source_id: String,
    pub start: DateTime<Utc>,
    pub elapsed_seconds: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_heart_rate: Option<f64>,
}

/// Full input contract for one fusion call
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionRequest {
    /// Source id -> that source's snapshot for the day
    pub snapshots: BTreeMap<String, DailySnapshot>,
    #[serde(default)]
    pub workouts: Vec<WorkoutSession>,
    /// Overrides the heart-rate bucket width for this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window_override_ms: Option<i64>,
}

impl FusionRequest {
    pub fn from_snapshots(snapshots: BTreeMap<String, DailySnapshot>) -> Self {
        Self {
            snapshots,
            ..Default::default()
        }
    }
}

/// Severity of a validation issue. Issues never block output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
}

/// Machine-readable issue classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    StepDiscrepancy,
    SleepDiscrepancy,
    ImplausibleStepCount,
    ImplausibleHeartRate,
    ImplausibleSleepDuration,
    InconsistentSleepStages,
    ClampedValue,
    DroppedReading,
    IgnoredWorkout,
    InvalidWindowOverride,
}

impl IssueCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCode::StepDiscrepancy => "step_discrepancy",
            IssueCode::SleepDiscrepancy => "sleep_discrepancy",
            IssueCode::ImplausibleStepCount => "implausible_step_count",
            IssueCode::ImplausibleHeartRate => "implausible_heart_rate",
            IssueCode::ImplausibleSleepDuration => "implausible_sleep_duration",
            IssueCode::InconsistentSleepStages => "inconsistent_sleep_stages",
            IssueCode::ClampedValue => "clamped_value",
            IssueCode::DroppedReading => "dropped_reading",
            IssueCode::IgnoredWorkout => "ignored_workout",
            IssueCode::InvalidWindowOverride => "invalid_window_override",
        }
    }
}

/// Informational finding attached to a merged snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub code: IssueCode,
    pub message: String,
    pub severity: Severity,
}

impl ValidationIssue {
    pub fn warning(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: Severity::Warning,
        }
    }

    pub fn info(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            severity: Severity::Info,
        }
    }
}

/// The authoritative, deduplicated record for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergedSnapshot {
    pub steps: u64,
    /// Mean heart rate (bpm)
    pub heart_rate: u32,
    /// Chronological, unique timestamps
    pub heart_rate_readings: Vec<TimestampedReading>,
    pub sleep: SleepRecord,
    /// Time of the fusion call
    pub merged_at: DateTime<Utc>,
    pub issues: Vec<ValidationIssue>,
    /// Contributing sources, most trusted first
    #[serde(default)]
    pub sources: Vec<String>,
    pub fusion_id: Uuid,
}

impl MergedSnapshot {
    /// All-zero snapshot returned when there is nothing to merge
    pub fn empty(merged_at: DateTime<Utc>) -> Self {
        Self {
            steps: 0,
            heart_rate: 0,
            heart_rate_readings: Vec::new(),
            sleep: SleepRecord::default(),
            merged_at,
            issues: Vec::new(),
            sources: Vec::new(),
            fusion_id: Uuid::new_v4(),
        }
    }

    pub fn has_issue(&self, code: IssueCode) -> bool {
        self.issues.iter().any(|issue| issue.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_from_minimal_json() {
        let json = r#"{"captured_at": "2024-01-15T23:00:00Z"}"#;
        let snapshot: DailySnapshot = serde_json::from_str(json).unwrap();

        assert_eq!(snapshot.steps, 0);
        assert!(snapshot.heart_rate.is_none());
        assert!(snapshot.heart_rate_readings.is_empty());
        assert_eq!(snapshot.sleep, SleepRecord::default());
    }

    #[test]
    fn test_issue_code_serialization() {
        let issue = ValidationIssue::warning(IssueCode::ImplausibleStepCount, "too many");
        let value = serde_json::to_value(&issue).unwrap();

        assert_eq!(value["code"], "implausible_step_count");
        assert_eq!(value["severity"], "warning");
        assert_eq!(IssueCode::ImplausibleStepCount.as_str(), "implausible_step_count");
    }

    #[test]
    fn test_stage_total() {
        let sleep = SleepRecord {
            total_minutes: 420.0,
            deep_minutes: 90.0,
            light_minutes: 210.0,
            rem_minutes: 90.0,
            awake_minutes: 30.0,
            score: 80.0,
        };
        assert_eq!(sleep.stage_total(), 420.0);
    }
}
