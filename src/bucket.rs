//! Fixed-width time bucketing
//!
//! Every merger windows its readings through [`TimeBucketer`], so all metrics
//! share one definition of "the same instant".

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::{DEFAULT_SERIES_WINDOW_MS, DEFAULT_WORKOUT_WINDOW_MS};
use crate::error::FusionError;

/// Anything carrying a UTC timestamp can be bucketed
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for crate::types::TimestampedReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// Partitions readings into windows starting at
/// `floor(timestamp_ms / window_ms) * window_ms`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeBucketer {
    window_ms: i64,
}

impl Default for TimeBucketer {
    fn default() -> Self {
        Self {
            window_ms: DEFAULT_SERIES_WINDOW_MS,
        }
    }
}

impl TimeBucketer {
    /// One-minute windows
    pub const fn per_minute() -> Self {
        Self {
            window_ms: DEFAULT_WORKOUT_WINDOW_MS,
        }
    }

    /// Create a bucketer; the window must be strictly positive
    pub fn new(window_ms: i64) -> Result<Self, FusionError> {
        if window_ms <= 0 {
            return Err(FusionError::InvalidWindow(window_ms));
        }
        Ok(Self { window_ms })
    }

    pub fn from_duration(window: Duration) -> Result<Self, FusionError> {
        let window_ms = i64::try_from(window.as_millis()).unwrap_or(i64::MAX);
        Self::new(window_ms)
    }

    pub fn window_ms(&self) -> i64 {
        self.window_ms
    }

    /// Start of the bucket containing `timestamp`, in epoch milliseconds
    pub fn bucket_start(&self, timestamp: DateTime<Utc>) -> i64 {
        timestamp.timestamp_millis().div_euclid(self.window_ms) * self.window_ms
    }

    /// Group items by bucket start. Buckets iterate in ascending order and
    /// items inside a bucket keep their input order.
    pub fn bucket<T: Timestamped + Clone>(&self, items: &[T]) -> BTreeMap<i64, Vec<T>> {
        let mut buckets: BTreeMap<i64, Vec<T>> = BTreeMap::new();
        for item in items {
            buckets
                .entry(self.bucket_start(item.timestamp()))
                .or_default()
                .push(item.clone());
        }
        buckets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TimestampedReading;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, h, m, s).unwrap()
    }

    #[test]
    fn test_rejects_non_positive_window() {
        assert!(matches!(TimeBucketer::new(0), Err(FusionError::InvalidWindow(0))));
        assert!(TimeBucketer::new(-5).is_err());
        assert!(TimeBucketer::from_duration(Duration::ZERO).is_err());
    }

    #[test]
    fn test_bucket_start_floors_to_window() {
        let bucketer = TimeBucketer::new(5 * 60 * 1000).unwrap();
        let start = bucketer.bucket_start(at(8, 0, 0));

        assert_eq!(bucketer.bucket_start(at(8, 4, 59)), start);
        assert_eq!(bucketer.bucket_start(at(8, 5, 0)), start + 300_000);
    }

    #[test]
    fn test_default_windows() {
        assert_eq!(TimeBucketer::default().window_ms(), 300_000);
        assert_eq!(TimeBucketer::per_minute().window_ms(), 60_000);
    }

    #[test]
    fn test_bucket_start_before_epoch() {
        let bucketer = TimeBucketer::new(60_000).unwrap();
        let ts = Utc.timestamp_millis_opt(-1).unwrap();
        assert_eq!(bucketer.bucket_start(ts), -60_000);
    }

    #[test]
    fn test_same_timestamp_different_sources_share_bucket() {
        let bucketer = TimeBucketer::new(60_000).unwrap();
        let readings = vec![
            TimestampedReading::new(at(9, 0, 10), 72.0, "apple_watch"),
            TimestampedReading::new(at(9, 0, 10), 80.0, "phone"),
            TimestampedReading::new(at(9, 1, 0), 75.0, "phone"),
        ];

        let buckets = bucketer.bucket(&readings);
        assert_eq!(buckets.len(), 2);

        let first = buckets.values().next().unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].source_id, "apple_watch");
        assert_eq!(first[1].source_id, "phone");
    }

    #[test]
    fn test_buckets_are_ordered() {
        let bucketer = TimeBucketer::from_duration(Duration::from_secs(60)).unwrap();
        let readings = vec![
            TimestampedReading::new(at(10, 0, 0), 70.0, "phone"),
            TimestampedReading::new(at(9, 0, 0), 60.0, "phone"),
        ];

        let starts: Vec<i64> = bucketer.bucket(&readings).keys().copied().collect();
        assert!(starts[0] < starts[1]);
    }
}
