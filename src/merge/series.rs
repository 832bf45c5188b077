//! Time-series merging (heart rate)

use tracing::debug;

use crate::bucket::TimeBucketer;
use crate::registry::SourceRegistry;
use crate::resolver::{ConflictResolver, ResolutionPolicy};
use crate::types::TimestampedReading;

/// Merges readings from all sources into one reading per bucket.
///
/// Heart rate defaults to the weighted-average policy so sensor noise is
/// averaged out rather than hard-switched between sources.
pub struct SeriesMerger<'a> {
    resolver: ConflictResolver<'a>,
    bucketer: TimeBucketer,
    policy: ResolutionPolicy,
}

impl<'a> SeriesMerger<'a> {
    pub fn new(
        registry: &'a SourceRegistry,
        bucketer: TimeBucketer,
        policy: ResolutionPolicy,
    ) -> Self {
        Self {
            resolver: ConflictResolver::new(registry),
            bucketer,
            policy,
        }
    }

    /// Merge readings into a chronological series with one reading per bucket
    pub fn merge(&self, readings: &[TimestampedReading]) -> Vec<TimestampedReading> {
        if readings.is_empty() {
            return Vec::new();
        }

        let buckets = self.bucketer.bucket(readings);
        let mut merged: Vec<TimestampedReading> = buckets
            .values()
            .filter_map(|bucket| self.resolver.resolve(bucket, self.policy))
            .collect();

        // Representatives stay inside their buckets, so this only settles
        // ordering within equal timestamps
        merged.sort_by_key(|r| r.timestamp);

        debug!(
            input = readings.len(),
            buckets = merged.len(),
            window_ms = self.bucketer.window_ms(),
            "merged series"
        );

        merged
    }
}

/// Arithmetic mean of a merged series, rounded to whole units
pub fn series_mean(series: &[TimestampedReading]) -> Option<f64> {
    if series.is_empty() {
        return None;
    }
    Some((series.iter().map(|r| r.value).sum::<f64>() / series.len() as f64).round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    fn five_minute(registry: &SourceRegistry) -> SeriesMerger<'_> {
        SeriesMerger::new(
            registry,
            TimeBucketer::new(5 * 60 * 1000).unwrap(),
            ResolutionPolicy::WeightedAverage,
        )
    }

    #[test]
    fn test_overlapping_sources_collapse_per_bucket() {
        let registry = SourceRegistry::default();
        let readings = vec![
            TimestampedReading::new(at(9, 0, 0), 72.0, "apple_watch"),
            TimestampedReading::new(at(9, 5, 0), 74.0, "apple_watch"),
            TimestampedReading::new(at(9, 0, 30), 80.0, "phone"),
            TimestampedReading::new(at(9, 6, 0), 74.0, "phone"),
        ];

        let merged = five_minute(&registry).merge(&readings);

        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].value, 76.0);
        assert_eq!(merged[0].timestamp, at(9, 0, 0));
        assert_eq!(merged[1].value, 74.0);
        assert_eq!(merged[1].timestamp, at(9, 5, 0));
    }

    #[test]
    fn test_output_is_chronological() {
        let registry = SourceRegistry::default();
        let readings = vec![
            TimestampedReading::new(at(12, 0, 0), 90.0, "garmin"),
            TimestampedReading::new(at(7, 0, 0), 60.0, "phone"),
            TimestampedReading::new(at(9, 30, 0), 70.0, "garmin"),
        ];

        let merged = five_minute(&registry).merge(&readings);
        let times: Vec<_> = merged.iter().map(|r| r.timestamp).collect();
        assert_eq!(times, vec![at(7, 0, 0), at(9, 30, 0), at(12, 0, 0)]);
    }

    #[test]
    fn test_merging_merged_series_is_stable() {
        let registry = SourceRegistry::default();
        let readings = vec![
            TimestampedReading::new(at(9, 0, 0), 72.0, "apple_watch"),
            TimestampedReading::new(at(9, 1, 0), 80.0, "phone"),
            TimestampedReading::new(at(9, 7, 0), 66.0, "phone"),
        ];

        let merger = five_minute(&registry);
        let once = merger.merge(&readings);
        let twice = merger.merge(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_priority_policy() {
        let registry = SourceRegistry::default();
        let merger = SeriesMerger::new(
            &registry,
            TimeBucketer::new(60_000).unwrap(),
            ResolutionPolicy::PriorityWins,
        );
        let readings = vec![
            TimestampedReading::new(at(9, 0, 5), 80.0, "phone"),
            TimestampedReading::new(at(9, 0, 40), 72.0, "apple_watch"),
        ];

        let merged = merger.merge(&readings);
        assert_eq!(merged, vec![readings[1].clone()]);
    }

    #[test]
    fn test_series_mean() {
        let series = vec![
            TimestampedReading::new(at(9, 0, 0), 70.0, "garmin"),
            TimestampedReading::new(at(9, 5, 0), 75.0, "garmin"),
        ];
        assert_eq!(series_mean(&series), Some(73.0));
        assert_eq!(series_mean(&[]), None);
    }
}
