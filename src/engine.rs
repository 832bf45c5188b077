//! Fusion orchestration
//!
//! This module provides the public API of the engine. It turns
//! `{source id -> daily snapshot}` into one merged snapshot:
//!
//! 1. Sanitizer - clamp or drop malformed values
//! 2. ScalarMerger - steps
//! 3. SeriesMerger + WorkoutOverlay - heart-rate series
//! 4. SleepMerger - nightly sleep
//! 5. Validator - plausibility checks on the assembled result
//!
//! The engine is synchronous and keeps no state between calls beyond the
//! immutable registry and configuration, so one instance can serve many
//! concurrent fusions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::bucket::TimeBucketer;
use crate::config::FusionConfig;
use crate::error::FusionError;
use crate::merge::{
    series_mean, ScalarMerger, ScalarSample, SeriesMerger, SleepMerger, WorkoutOverlay,
};
use crate::registry::SourceRegistry;
use crate::sanitizer::Sanitizer;
use crate::types::{
    DailySnapshot, FusionRequest, IssueCode, MergedSnapshot, SleepRecord, TimestampedReading,
    ValidationIssue, WorkoutSession,
};
use crate::validator::Validator;

/// Merge a JSON-encoded [`FusionRequest`] with the built-in registry and
/// default configuration, returning the merged snapshot as JSON.
///
/// # Example
/// ```ignore
/// let merged = merge_sources_json(r#"{"snapshots": {...}}"#.to_string())?;
/// ```
pub fn merge_sources_json(raw_json: String) -> Result<String, FusionError> {
    FusionEngine::default().merge_json(&raw_json)
}

/// Deterministic multi-source fusion engine
#[derive(Debug, Clone)]
pub struct FusionEngine {
    registry: SourceRegistry,
    config: FusionConfig,
    series_bucketer: TimeBucketer,
    workout_bucketer: TimeBucketer,
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self {
            registry: SourceRegistry::default(),
            config: FusionConfig::default(),
            series_bucketer: TimeBucketer::default(),
            workout_bucketer: TimeBucketer::per_minute(),
        }
    }
}

impl FusionEngine {
    /// Create an engine with a custom registry and configuration
    pub fn new(registry: SourceRegistry, config: FusionConfig) -> Result<Self, FusionError> {
        config.validate()?;
        let series_bucketer = TimeBucketer::new(config.series_window_ms)?;
        let workout_bucketer = TimeBucketer::new(config.workout_window_ms)?;

        Ok(Self {
            registry,
            config,
            series_bucketer,
            workout_bucketer,
        })
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    /// Merge one day's snapshots, keyed by source id
    pub fn merge(&self, snapshots: &BTreeMap<String, DailySnapshot>) -> MergedSnapshot {
        self.fuse(snapshots, &[], None, Utc::now())
    }

    /// Merge a full request (snapshots, workouts, window override)
    pub fn merge_request(&self, request: &FusionRequest) -> MergedSnapshot {
        self.merge_request_at(request, Utc::now())
    }

    /// Like [`merge_request`](Self::merge_request) with an explicit `merged_at`
    pub fn merge_request_at(&self, request: &FusionRequest, now: DateTime<Utc>) -> MergedSnapshot {
        self.fuse(
            &request.snapshots,
            &request.workouts,
            request.window_override_ms,
            now,
        )
    }

    /// Parse a JSON request, merge it and serialize the result
    pub fn merge_json(&self, raw_json: &str) -> Result<String, FusionError> {
        let request: FusionRequest = serde_json::from_str(raw_json)
            .map_err(|e| FusionError::ParseError(e.to_string()))?;
        let merged = self.merge_request(&request);
        Ok(serde_json::to_string(&merged)?)
    }

    fn fuse(
        &self,
        snapshots: &BTreeMap<String, DailySnapshot>,
        workouts: &[WorkoutSession],
        window_override_ms: Option<i64>,
        now: DateTime<Utc>,
    ) -> MergedSnapshot {
        if snapshots.is_empty() && workouts.is_empty() {
            return MergedSnapshot::empty(now);
        }

        let mut issues = Vec::new();
        let mut sources: Vec<(String, DailySnapshot)> = Vec::with_capacity(snapshots.len());
        for (source_id, snapshot) in snapshots {
            let (clean, sanitize_issues) = Sanitizer::sanitize(source_id, snapshot);
            issues.extend(sanitize_issues);
            sources.push((source_id.clone(), clean));
        }

        // Most trusted first; ties keep source id order
        sources.sort_by_key(|(id, _)| std::cmp::Reverse(self.registry.priority_of(id)));

        let series_bucketer = self.series_bucketer_for(window_override_ms, &mut issues);

        let mut merged = match sources.as_slice() {
            [(source_id, snapshot)] if workouts.is_empty() => {
                pass_through(source_id, snapshot, now)
            }
            _ => self.merge_sources(&sources, workouts, series_bucketer, now, &mut issues),
        };

        let validation = Validator::new(&self.config.limits).validate(&merged);
        issues.extend(validation);
        merged.issues = issues;

        debug!(
            sources = merged.sources.len(),
            workouts = workouts.len(),
            readings = merged.heart_rate_readings.len(),
            issues = merged.issues.len(),
            "fusion complete"
        );

        merged
    }

    fn series_bucketer_for(
        &self,
        window_override_ms: Option<i64>,
        issues: &mut Vec<ValidationIssue>,
    ) -> TimeBucketer {
        match window_override_ms.map(TimeBucketer::new) {
            None => self.series_bucketer,
            Some(Ok(bucketer)) => bucketer,
            Some(Err(e)) => {
                issues.push(ValidationIssue::info(
                    IssueCode::InvalidWindowOverride,
                    format!(
                        "{e}; using the configured {} ms window",
                        self.series_bucketer.window_ms()
                    ),
                ));
                self.series_bucketer
            }
        }
    }

    fn merge_sources(
        &self,
        sources: &[(String, DailySnapshot)],
        workouts: &[WorkoutSession],
        series_bucketer: TimeBucketer,
        now: DateTime<Utc>,
        issues: &mut Vec<ValidationIssue>,
    ) -> MergedSnapshot {
        // Steps
        let samples: Vec<ScalarSample> = sources
            .iter()
            .map(|(id, s)| ScalarSample::new(s.steps as f64, id, s.captured_at))
            .collect();
        let steps_merger =
            ScalarMerger::steps(&self.registry, self.config.steps_discrepancy_threshold);
        let steps = match steps_merger.merge(&samples) {
            Some(merged) => {
                issues.extend(merged.issues);
                merged.value.max(0.0) as u64
            }
            None => 0,
        };

        // Heart rate
        let readings: Vec<TimestampedReading> = sources
            .iter()
            .flat_map(|(_, s)| s.heart_rate_readings.iter().cloned())
            .collect();
        let series = SeriesMerger::new(&self.registry, series_bucketer, self.config.series_policy)
            .merge(&readings);
        let (series, workout_issues) =
            WorkoutOverlay::new(&self.registry, self.workout_bucketer).apply(&series, workouts);
        issues.extend(workout_issues);

        let heart_rate = series_mean(&series)
            .or_else(|| sources.iter().find_map(|(_, s)| s.heart_rate))
            .map(to_bpm)
            .unwrap_or(0);

        // Sleep: sources without a recorded night do not take part
        let nights: Vec<(String, SleepRecord)> = sources
            .iter()
            .filter(|(_, s)| has_sleep(&s.sleep))
            .map(|(id, s)| (id.clone(), s.sleep))
            .collect();
        let sleep = match SleepMerger::new(&self.registry, self.config.sleep_discrepancy_threshold)
            .merge(&nights)
        {
            Some(merged) => {
                issues.extend(merged.issues);
                merged.record
            }
            None => SleepRecord::default(),
        };

        MergedSnapshot {
            steps,
            heart_rate,
            heart_rate_readings: series,
            sleep,
            merged_at: now,
            issues: Vec::new(),
            sources: sources.iter().map(|(id, _)| id.clone()).collect(),
            fusion_id: Uuid::new_v4(),
        }
    }
}

/// Single source: its data is returned as-is, ordered chronologically with
/// repeated timestamps collapsed to the first reading
fn pass_through(source_id: &str, snapshot: &DailySnapshot, now: DateTime<Utc>) -> MergedSnapshot {
    let mut readings = snapshot.heart_rate_readings.clone();
    readings.sort_by_key(|r| r.timestamp);
    readings.dedup_by_key(|r| r.timestamp);

    let heart_rate = snapshot
        .heart_rate
        .or_else(|| series_mean(&readings))
        .map(to_bpm)
        .unwrap_or(0);

    MergedSnapshot {
        steps: snapshot.steps.max(0) as u64,
        heart_rate,
        heart_rate_readings: readings,
        sleep: snapshot.sleep,
        merged_at: now,
        issues: Vec::new(),
        sources: vec![source_id.to_string()],
        fusion_id: Uuid::new_v4(),
    }
}

fn has_sleep(sleep: &SleepRecord) -> bool {
    sleep.total_minutes > 0.0 || sleep.stage_total() > 0.0
}

fn to_bpm(value: f64) -> u32 {
    value.round().clamp(0.0, u32::MAX as f64) as u32
}
