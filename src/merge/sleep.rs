//! Nightly sleep record merging

use tracing::warn;

use crate::merge::scalar::relative_difference;
use crate::registry::SourceRegistry;
use crate::types::{IssueCode, SleepRecord, ValidationIssue};

/// Result of merging sleep records
#[derive(Debug, Clone, PartialEq)]
pub struct SleepMerge {
    pub record: SleepRecord,
    pub source_id: String,
    pub issues: Vec<ValidationIssue>,
}

/// Picks the most reliable source's record whole.
///
/// Sleep is one record per source per night and is never split into buckets
/// or mixed across sources.
pub struct SleepMerger<'a> {
    registry: &'a SourceRegistry,
    threshold: f64,
}

impl<'a> SleepMerger<'a> {
    pub fn new(registry: &'a SourceRegistry, threshold: f64) -> Self {
        Self {
            registry,
            threshold,
        }
    }

    /// Merge `(source_id, record)` pairs; `None` when there are none
    pub fn merge(&self, records: &[(String, SleepRecord)]) -> Option<SleepMerge> {
        let mut ordered: Vec<&(String, SleepRecord)> = records.iter().collect();
        // Stable: equally reliable sources keep input order
        ordered.sort_by(|a, b| {
            self.registry
                .reliability_of(&b.0)
                .total_cmp(&self.registry.reliability_of(&a.0))
        });

        let (best_source, best) = ordered.first().map(|(s, r)| (s.clone(), *r))?;

        let mut issues = Vec::new();
        if ordered.len() > 1 {
            let mean_total =
                ordered.iter().map(|(_, r)| r.total_minutes).sum::<f64>() / ordered.len() as f64;
            let difference = relative_difference(best.total_minutes, mean_total);

            if difference > self.threshold {
                warn!(
                    primary_source = %best_source,
                    primary_total = best.total_minutes,
                    mean_total,
                    difference,
                    "significant sleep discrepancy between sources"
                );

                let breakdown = ordered
                    .iter()
                    .map(|(s, r)| format!("{}={}", s, r.total_minutes))
                    .collect::<Vec<_>>()
                    .join(", ");
                issues.push(ValidationIssue::warning(
                    IssueCode::SleepDiscrepancy,
                    format!(
                        "sleep total from {} ({} min) deviates {:.1}% \
                         from the mean of all sources ({:.1} min): {}",
                        best_source,
                        best.total_minutes,
                        difference * 100.0,
                        mean_total,
                        breakdown
                    ),
                ));
            }
        }

        Some(SleepMerge {
            record: best,
            source_id: best_source,
            issues,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn night(total: f64) -> SleepRecord {
        SleepRecord {
            total_minutes: total,
            deep_minutes: total * 0.2,
            light_minutes: total * 0.5,
            rem_minutes: total * 0.2,
            awake_minutes: total * 0.1,
            score: 80.0,
        }
    }

    #[test]
    fn test_most_reliable_record_wins_whole() {
        let registry = SourceRegistry::default();
        let merger = SleepMerger::new(&registry, 0.3);
        let wearable = SleepRecord {
            score: 88.0,
            ..night(420.0)
        };

        let merged = merger
            .merge(&[
                ("phone".to_string(), night(300.0)),
                ("apple_watch".to_string(), wearable),
            ])
            .unwrap();

        assert_eq!(merged.record, wearable);
        assert_eq!(merged.source_id, "apple_watch");
        // mean = 360, |420 - 360| / 420 = 14.3%
        assert!(merged.issues.is_empty());
    }

    #[test]
    fn test_boundary_is_not_flagged() {
        let registry = SourceRegistry::default();
        let merger = SleepMerger::new(&registry, 0.3);

        // mean = 280, |400 - 280| / 400 = exactly 30%
        let merged = merger
            .merge(&[
                ("apple_watch".to_string(), night(400.0)),
                ("phone".to_string(), night(160.0)),
            ])
            .unwrap();
        assert!(merged.issues.is_empty());
    }

    #[test]
    fn test_large_discrepancy_flagged() {
        let registry = SourceRegistry::default();
        let merger = SleepMerger::new(&registry, 0.3);

        // mean = 270, |400 - 270| / 400 = 32.5%
        let merged = merger
            .merge(&[
                ("apple_watch".to_string(), night(400.0)),
                ("phone".to_string(), night(140.0)),
            ])
            .unwrap();

        assert_eq!(merged.record.total_minutes, 400.0);
        assert_eq!(merged.issues.len(), 1);
        assert_eq!(merged.issues[0].code, IssueCode::SleepDiscrepancy);
        assert!(merged.issues[0].message.contains("phone=140"));
    }

    #[test]
    fn test_empty_and_single() {
        let registry = SourceRegistry::default();
        let merger = SleepMerger::new(&registry, 0.3);

        assert!(merger.merge(&[]).is_none());
        let merged = merger.merge(&[("oura".to_string(), night(450.0))]).unwrap();
        assert_eq!(merged.record, night(450.0));
        assert!(merged.issues.is_empty());
    }
}
