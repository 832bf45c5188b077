//! Daily scalar merging (steps and similar totals)

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::registry::SourceRegistry;
use crate::resolver::weighted_average;
use crate::types::{IssueCode, ValidationIssue};

/// One source's value for a daily total
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarSample {
    pub value: f64,
    pub source_id: String,
    pub timestamp: DateTime<Utc>,
}

impl ScalarSample {
    pub fn new(value: f64, source_id: &str, timestamp: DateTime<Utc>) -> Self {
        Self {
            value,
            source_id: source_id.to_string(),
            timestamp,
        }
    }
}

/// Result of merging one daily total
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarMerge {
    pub value: f64,
    pub issues: Vec<ValidationIssue>,
}

/// Merges one daily total across sources with discrepancy detection.
///
/// The authoritative value is the reliability-weighted average, rounded to
/// whole units. The top-priority source is compared against the mean of the
/// others; a relative difference above the threshold is reported but does not
/// change the result.
pub struct ScalarMerger<'a> {
    registry: &'a SourceRegistry,
    metric: &'static str,
    code: IssueCode,
    threshold: f64,
}

impl<'a> ScalarMerger<'a> {
    pub fn new(
        registry: &'a SourceRegistry,
        metric: &'static str,
        code: IssueCode,
        threshold: f64,
    ) -> Self {
        Self {
            registry,
            metric,
            code,
            threshold,
        }
    }

    /// Merger for daily step totals
    pub fn steps(registry: &'a SourceRegistry, threshold: f64) -> Self {
        Self::new(registry, "steps", IssueCode::StepDiscrepancy, threshold)
    }

    /// Merge samples; `None` when there is nothing to merge
    pub fn merge(&self, samples: &[ScalarSample]) -> Option<ScalarMerge> {
        match samples {
            [] => None,
            [only] => Some(ScalarMerge {
                value: only.value,
                issues: Vec::new(),
            }),
            _ => Some(self.merge_many(samples)),
        }
    }

    fn merge_many(&self, samples: &[ScalarSample]) -> ScalarMerge {
        let mut ordered: Vec<&ScalarSample> = samples.iter().collect();
        ordered.sort_by_key(|s| std::cmp::Reverse(self.registry.priority_of(&s.source_id)));

        let primary = ordered[0];
        let others = &ordered[1..];
        let others_mean = others.iter().map(|s| s.value).sum::<f64>() / others.len() as f64;
        let difference = relative_difference(primary.value, others_mean);

        let mut issues = Vec::new();
        if difference > self.threshold {
            let breakdown = ordered
                .iter()
                .map(|s| format!("{}={}", s.source_id, s.value))
                .collect::<Vec<_>>()
                .join(", ");

            warn!(
                metric = self.metric,
                primary_source = %primary.source_id,
                primary = primary.value,
                others_mean,
                difference,
                "significant discrepancy between sources"
            );

            issues.push(ValidationIssue::warning(
                self.code,
                format!(
                    "{} discrepancy of {:.1}% between {} ({}) and other sources (mean {:.1}): {}",
                    self.metric,
                    difference * 100.0,
                    primary.source_id,
                    primary.value,
                    others_mean,
                    breakdown
                ),
            ));
        }

        let points: Vec<(f64, f64)> = ordered
            .iter()
            .map(|s| (s.value, self.registry.reliability_of(&s.source_id)))
            .collect();
        let value = weighted_average(&points).unwrap_or(primary.value).round();

        ScalarMerge { value, issues }
    }
}

/// `|primary - other| / primary`; any difference from a zero primary counts as total
pub(crate) fn relative_difference(primary: f64, other: f64) -> f64 {
    let delta = (primary - other).abs();
    if primary == 0.0 {
        if delta == 0.0 {
            0.0
        } else {
            f64::INFINITY
        }
    } else {
        delta / primary.abs()
    }
}
