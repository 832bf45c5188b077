//! Bucket conflict resolution
//!
//! Two policies, chosen per call:
//! - **Priority wins**: the reading from the most authoritative source (lowest
//!   rank) is kept verbatim. Used where the choice is a regime switch, such as
//!   a recorded workout taking over from ambient sampling.
//! - **Weighted average**: `Σ(value × reliability) / Σ(reliability)`, rounded
//!   to whole units. Used where sources are measuring the same thing with noise.
//!
//! Either way a bucket collapses to exactly one reading, stamped with the
//! representative reading's original timestamp rather than the bucket boundary.

use serde::{Deserialize, Serialize};

use crate::registry::SourceRegistry;
use crate::types::TimestampedReading;

/// Conflict policy for a bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionPolicy {
    PriorityWins,
    #[default]
    WeightedAverage,
}

/// Reliability-weighted mean of `(value, weight)` pairs.
///
/// Falls back to the plain mean when every weight is zero; `None` for no input.
pub fn weighted_average(points: &[(f64, f64)]) -> Option<f64> {
    if points.is_empty() {
        return None;
    }

    let total_weight: f64 = points.iter().map(|(_, w)| w).sum();
    if total_weight > 0.0 {
        Some(points.iter().map(|(v, w)| v * w).sum::<f64>() / total_weight)
    } else {
        Some(points.iter().map(|(v, _)| v).sum::<f64>() / points.len() as f64)
    }
}

/// Collapses the readings of one bucket into a single reading
pub struct ConflictResolver<'a> {
    registry: &'a SourceRegistry,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(registry: &'a SourceRegistry) -> Self {
        Self { registry }
    }

    /// Resolve a bucket; `None` only for an empty bucket
    pub fn resolve(
        &self,
        readings: &[TimestampedReading],
        policy: ResolutionPolicy,
    ) -> Option<TimestampedReading> {
        match policy {
            ResolutionPolicy::PriorityWins => self.highest_priority(readings).cloned(),
            ResolutionPolicy::WeightedAverage => self.weighted(readings),
        }
    }

    /// Lowest rank wins; ties go to the first reading seen
    fn highest_priority<'r>(
        &self,
        readings: &'r [TimestampedReading],
    ) -> Option<&'r TimestampedReading> {
        let mut winner: Option<(&TimestampedReading, usize)> = None;
        for reading in readings {
            let rank = self.registry.rank_of(&reading.source_id);
            match winner {
                Some((_, best)) if rank >= best => {}
                _ => winner = Some((reading, rank)),
            }
        }
        winner.map(|(reading, _)| reading)
    }

    fn weighted(&self, readings: &[TimestampedReading]) -> Option<TimestampedReading> {
        let mut representative: Option<(&TimestampedReading, f64)> = None;
        let mut points = Vec::with_capacity(readings.len());

        for reading in readings {
            let reliability = self.registry.reliability_of(&reading.source_id);
            points.push((reading.value, reliability));
            match representative {
                Some((_, best)) if reliability <= best => {}
                _ => representative = Some((reading, reliability)),
            }
        }

        let (representative, _) = representative?;
        let value = weighted_average(&points)?.round();

        Some(TimestampedReading {
            timestamp: representative.timestamp,
            value,
            source_id: representative.source_id.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn reading(sec: u32, value: f64, source: &str) -> TimestampedReading {
        TimestampedReading::new(
            Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, sec).unwrap(),
            value,
            source,
        )
    }

    #[test]
    fn test_empty_bucket() {
        let registry = SourceRegistry::default();
        let resolver = ConflictResolver::new(&registry);

        assert!(resolver.resolve(&[], ResolutionPolicy::PriorityWins).is_none());
        assert!(resolver.resolve(&[], ResolutionPolicy::WeightedAverage).is_none());
    }

    #[test]
    fn test_weighted_average_scenario() {
        let registry = SourceRegistry::default();
        let resolver = ConflictResolver::new(&registry);
        let bucket = vec![reading(0, 72.0, "apple_watch"), reading(20, 80.0, "phone")];

        let merged = resolver
            .resolve(&bucket, ResolutionPolicy::WeightedAverage)
            .unwrap();

        // (72 * 0.95 + 80 * 0.75) / 1.70 = 75.53
        assert_eq!(merged.value, 76.0);
        // Timestamp comes from the most reliable reading, not the bucket boundary
        assert_eq!(merged.timestamp, bucket[0].timestamp);
        assert_eq!(merged.source_id, "apple_watch");
    }

    #[test]
    fn test_weighted_representative_is_most_reliable() {
        let registry = SourceRegistry::default();
        let resolver = ConflictResolver::new(&registry);
        let bucket = vec![reading(0, 70.0, "phone"), reading(30, 70.0, "garmin")];

        let merged = resolver
            .resolve(&bucket, ResolutionPolicy::WeightedAverage)
            .unwrap();
        assert_eq!(merged.source_id, "garmin");
        assert_eq!(merged.timestamp, bucket[1].timestamp);
    }

    #[test]
    fn test_priority_wins_picks_most_authoritative() {
        let registry = SourceRegistry::default();
        let resolver = ConflictResolver::new(&registry);
        let bucket = vec![
            reading(0, 64.0, "phone"),
            reading(10, 70.0, "apple_watch"),
            reading(20, 140.0, "strava"),
        ];

        let merged = resolver
            .resolve(&bucket, ResolutionPolicy::PriorityWins)
            .unwrap();
        assert_eq!(merged, bucket[2]);
    }

    #[test]
    fn test_priority_ties_keep_first_seen() {
        let registry = SourceRegistry::default();
        let resolver = ConflictResolver::new(&registry);
        let bucket = vec![reading(0, 61.0, "oura"), reading(5, 66.0, "whoop")];

        let merged = resolver
            .resolve(&bucket, ResolutionPolicy::PriorityWins)
            .unwrap();
        assert_eq!(merged.source_id, "oura");
        assert_eq!(merged.value, 61.0);
    }

    #[test]
    fn test_weighted_average_zero_weights() {
        assert_eq!(weighted_average(&[(10.0, 0.0), (20.0, 0.0)]), Some(15.0));
        assert_eq!(weighted_average(&[]), None);
    }
}
