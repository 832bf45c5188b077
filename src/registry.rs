//! Source trust registry
//!
//! A single immutable table that answers "how much do we trust this source?".
//! Every merger consults it; nothing else hard-codes trust levels.
//!
//! Convention: `priority` is higher = more trusted. The derived *rank* is the
//! dense 1-based position of a priority among the table's distinct priorities,
//! so rank 1 is the most authoritative source.

use std::collections::{HashMap, HashSet};

use crate::error::FusionError;
use crate::types::SourceDescriptor;

/// Priority assumed for sources missing from the table
pub const DEFAULT_PRIORITY: i32 = 50;

/// Reliability assumed for sources missing from the table
pub const DEFAULT_RELIABILITY: f64 = 0.5;

fn builtin_sources() -> Vec<SourceDescriptor> {
    vec![
        // Active recordings own the workout window
        SourceDescriptor::new("strava", "Strava", 110, 0.90),
        SourceDescriptor::new("workout", "Workout Recording", 110, 0.90),
        SourceDescriptor::new("apple_watch", "Apple Watch", 100, 0.95),
        SourceDescriptor::new("garmin", "Garmin", 95, 0.93),
        SourceDescriptor::new("whoop", "Whoop", 90, 0.92),
        SourceDescriptor::new("oura", "Oura Ring", 90, 0.92),
        SourceDescriptor::new("fitbit", "Fitbit", 85, 0.90),
        SourceDescriptor::new("healthkit", "Apple HealthKit", 80, 0.88),
        SourceDescriptor::new("health_connect", "Google Health Connect", 80, 0.88),
        SourceDescriptor::new("phone", "Phone Sensors", 60, 0.75),
        SourceDescriptor::new("manual", "Manual Entry", 50, 0.70),
    ]
}

/// Immutable source id -> (priority, reliability) table
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    sources: Vec<SourceDescriptor>,
    index: HashMap<String, usize>,
    /// Distinct priorities (including the default), descending
    tiers: Vec<i32>,
}

impl Default for SourceRegistry {
    fn default() -> Self {
        Self::build(builtin_sources())
    }
}

impl SourceRegistry {
    /// Create a registry from descriptors, rejecting malformed tables
    pub fn new(sources: Vec<SourceDescriptor>) -> Result<Self, FusionError> {
        let mut seen = HashSet::new();
        for source in &sources {
            if source.id.trim().is_empty() {
                return Err(FusionError::InvalidRegistry(
                    "source id must not be empty".to_string(),
                ));
            }
            if !source.reliability.is_finite() || !(0.0..=1.0).contains(&source.reliability) {
                return Err(FusionError::InvalidRegistry(format!(
                    "reliability for {} must be within [0, 1], got {}",
                    source.id, source.reliability
                )));
            }
            if !seen.insert(source.id.as_str()) {
                return Err(FusionError::InvalidRegistry(format!(
                    "duplicate source id: {}",
                    source.id
                )));
            }
        }

        Ok(Self::build(sources))
    }

    /// Load a registry from a JSON array of descriptors
    pub fn from_json(json: &str) -> Result<Self, FusionError> {
        let sources: Vec<SourceDescriptor> = serde_json::from_str(json)?;
        Self::new(sources)
    }

    fn build(sources: Vec<SourceDescriptor>) -> Self {
        let index = sources
            .iter()
            .enumerate()
            .map(|(i, s)| (s.id.clone(), i))
            .collect();

        // Unknown sources form their own tier at the default priority
        let mut tiers: Vec<i32> = sources.iter().map(|s| s.priority).collect();
        tiers.push(DEFAULT_PRIORITY);
        tiers.sort_unstable_by(|a, b| b.cmp(a));
        tiers.dedup();

        Self {
            sources,
            index,
            tiers,
        }
    }

    pub fn descriptor(&self, source_id: &str) -> Option<&SourceDescriptor> {
        self.index.get(source_id).map(|&i| &self.sources[i])
    }

    pub fn is_known(&self, source_id: &str) -> bool {
        self.index.contains_key(source_id)
    }

    /// Priority of a source, [`DEFAULT_PRIORITY`] when unknown
    pub fn priority_of(&self, source_id: &str) -> i32 {
        self.descriptor(source_id)
            .map(|s| s.priority)
            .unwrap_or(DEFAULT_PRIORITY)
    }

    /// Reliability of a source, [`DEFAULT_RELIABILITY`] when unknown
    pub fn reliability_of(&self, source_id: &str) -> f64 {
        self.descriptor(source_id)
            .map(|s| s.reliability)
            .unwrap_or(DEFAULT_RELIABILITY)
    }

    /// Dense rank of a source's priority (1 = most authoritative)
    pub fn rank_of(&self, source_id: &str) -> usize {
        let priority = self.priority_of(source_id);
        1 + self.tiers.iter().take_while(|&&p| p > priority).count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceDescriptor> {
        self.sources.iter()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
