//! Post-merge plausibility checks
//!
//! Checks are independent and additive. They describe the merged snapshot;
//! none of them changes or blocks it.

use crate::config::ValidationLimits;
use crate::types::{IssueCode, MergedSnapshot, ValidationIssue};

pub struct Validator<'a> {
    limits: &'a ValidationLimits,
}

impl<'a> Validator<'a> {
    pub fn new(limits: &'a ValidationLimits) -> Self {
        Self { limits }
    }

    pub fn validate(&self, snapshot: &MergedSnapshot) -> Vec<ValidationIssue> {
        let limits = self.limits;
        let mut issues = Vec::new();

        if snapshot.steps > limits.max_steps {
            issues.push(ValidationIssue::warning(
                IssueCode::ImplausibleStepCount,
                format!("implausible step count: {}", snapshot.steps),
            ));
        }

        let hr = snapshot.heart_rate;
        if hr != 0 && (hr < limits.min_heart_rate || hr > limits.max_heart_rate) {
            issues.push(ValidationIssue::warning(
                IssueCode::ImplausibleHeartRate,
                format!("implausible heart rate: {hr} bpm"),
            ));
        }

        let sleep = &snapshot.sleep;
        let total = sleep.total_minutes;
        if total > limits.max_sleep_minutes || (total > 0.0 && total < limits.min_sleep_minutes) {
            issues.push(ValidationIssue::warning(
                IssueCode::ImplausibleSleepDuration,
                format!(
                    "implausible sleep duration: {total} min ({:.1} h)",
                    total / 60.0
                ),
            ));
        }

        let stage_total = sleep.stage_total();
        if (stage_total - total).abs() > limits.sleep_stage_tolerance_minutes {
            issues.push(ValidationIssue::warning(
                IssueCode::InconsistentSleepStages,
                format!(
                    "inconsistent sleep stage totals: \
                     stages sum to {stage_total} min, total is {total} min"
                ),
            ));
        }

        issues
    }
}
