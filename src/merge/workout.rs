//! Active-recording overlay
//!
//! A recorded workout takes precedence over ambient sampling for its duration.
//! Each workout is expanded into one reading per elapsed minute at the
//! workout's average heart rate, then laid over the merged series with the
//! priority-wins policy.

use chrono::Duration;
use tracing::debug;

use crate::bucket::TimeBucketer;
use crate::registry::SourceRegistry;
use crate::resolver::{ConflictResolver, ResolutionPolicy};
use crate::types::{IssueCode, TimestampedReading, ValidationIssue, WorkoutSession};

const SECONDS_PER_SAMPLE: i64 = 60;

/// Longest workout expanded into readings
const MAX_WORKOUT_SECONDS: i64 = 24 * 60 * 60;

pub struct WorkoutOverlay<'a> {
    resolver: ConflictResolver<'a>,
    bucketer: TimeBucketer,
}

impl<'a> WorkoutOverlay<'a> {
    pub fn new(registry: &'a SourceRegistry, bucketer: TimeBucketer) -> Self {
        Self {
            resolver: ConflictResolver::new(registry),
            bucketer,
        }
    }

    /// Per-minute readings for a workout, or `None` if it carries no usable
    /// heart rate or duration. Durations past one day are capped at one day.
    pub fn expand(workout: &WorkoutSession) -> Option<Vec<TimestampedReading>> {
        let heart_rate = workout
            .average_heart_rate
            .filter(|hr| hr.is_finite() && *hr > 0.0)?;
        if workout.elapsed_seconds <= 0 {
            return None;
        }

        let elapsed = workout.elapsed_seconds.min(MAX_WORKOUT_SECONDS);
        let samples = (elapsed + SECONDS_PER_SAMPLE - 1) / SECONDS_PER_SAMPLE;
        (0..samples)
            .map(|i| {
                let offset = Duration::seconds(i * SECONDS_PER_SAMPLE);
                workout
                    .start
                    .checked_add_signed(offset)
                    .map(|timestamp| TimestampedReading {
                        timestamp,
                        value: heart_rate,
                        source_id: workout.source_id.clone(),
                    })
            })
            .collect()
    }

    /// Lay workouts over `series`, returning the new series and any issues
    pub fn apply(
        &self,
        series: &[TimestampedReading],
        workouts: &[WorkoutSession],
    ) -> (Vec<TimestampedReading>, Vec<ValidationIssue>) {
        let mut issues = Vec::new();
        let mut recorded = Vec::new();

        for workout in workouts {
            if workout.elapsed_seconds > MAX_WORKOUT_SECONDS {
                issues.push(ValidationIssue::warning(
                    IssueCode::ClampedValue,
                    format!(
                        "workout {} from {}: elapsed {} s clamped to {} s",
                        workout.id, workout.source_id, workout.elapsed_seconds, MAX_WORKOUT_SECONDS
                    ),
                ));
            }

            match Self::expand(workout) {
                Some(readings) => recorded.extend(readings),
                None => issues.push(ValidationIssue::info(
                    IssueCode::IgnoredWorkout,
                    format!(
                        "workout {} from {} has no usable heart rate or duration",
                        workout.id, workout.source_id
                    ),
                )),
            }
        }

        if recorded.is_empty() {
            return (series.to_vec(), issues);
        }

        let mut combined = series.to_vec();
        combined.extend(recorded);

        let mut overlaid: Vec<TimestampedReading> = self
            .bucketer
            .bucket(&combined)
            .values()
            .filter_map(|bucket| self.resolver.resolve(bucket, ResolutionPolicy::PriorityWins))
            .collect();
        overlaid.sort_by_key(|r| r.timestamp);

        debug!(
            workouts = workouts.len(),
            readings = overlaid.len(),
            "applied workout overlay"
        );

        (overlaid, issues)
    }
}
