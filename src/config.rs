//! Engine configuration
//!
//! Every field has a default, so a partial JSON document (or `{}`) is a
//! valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::FusionError;
use crate::resolver::ResolutionPolicy;

/// Default heart-rate bucket width (5 minutes)
pub const DEFAULT_SERIES_WINDOW_MS: i64 = 5 * 60 * 1000;

/// Default workout overlay bucket width (1 minute)
pub const DEFAULT_WORKOUT_WINDOW_MS: i64 = 60 * 1000;

/// Relative difference above which step counts are flagged
pub const DEFAULT_STEPS_DISCREPANCY_THRESHOLD: f64 = 0.2;

/// Relative difference above which sleep totals are flagged
pub const DEFAULT_SLEEP_DISCREPANCY_THRESHOLD: f64 = 0.3;

/// Plausibility limits applied after merging
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationLimits {
    pub max_steps: u64,
    pub min_heart_rate: u32,
    pub max_heart_rate: u32,
    pub max_sleep_minutes: f64,
    pub min_sleep_minutes: f64,
    pub sleep_stage_tolerance_minutes: f64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_steps: 100_000,
            min_heart_rate: 30,
            max_heart_rate: 220,
            max_sleep_minutes: 900.0,
            min_sleep_minutes: 120.0,
            sleep_stage_tolerance_minutes: 30.0,
        }
    }
}

/// Configuration for [`FusionEngine`](crate::engine::FusionEngine)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub series_window_ms: i64,
    pub workout_window_ms: i64,
    pub series_policy: ResolutionPolicy,
    pub steps_discrepancy_threshold: f64,
    pub sleep_discrepancy_threshold: f64,
    pub limits: ValidationLimits,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            series_window_ms: DEFAULT_SERIES_WINDOW_MS,
            workout_window_ms: DEFAULT_WORKOUT_WINDOW_MS,
            series_policy: ResolutionPolicy::WeightedAverage,
            steps_discrepancy_threshold: DEFAULT_STEPS_DISCREPANCY_THRESHOLD,
            sleep_discrepancy_threshold: DEFAULT_SLEEP_DISCREPANCY_THRESHOLD,
            limits: ValidationLimits::default(),
        }
    }
}

impl FusionConfig {
    /// Load and validate configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, FusionError> {
        let config: FusionConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, FusionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), FusionError> {
        if self.series_window_ms <= 0 {
            return Err(FusionError::InvalidWindow(self.series_window_ms));
        }
        if self.workout_window_ms <= 0 {
            return Err(FusionError::InvalidWindow(self.workout_window_ms));
        }

        for (name, threshold) in [
            ("steps_discrepancy_threshold", self.steps_discrepancy_threshold),
            ("sleep_discrepancy_threshold", self.sleep_discrepancy_threshold),
        ] {
            if !threshold.is_finite() || threshold < 0.0 {
                return Err(FusionError::InvalidConfig(format!(
                    "{name} must be a non-negative number, got {threshold}"
                )));
            }
        }

        let limits = &self.limits;
        if limits.min_heart_rate >= limits.max_heart_rate {
            return Err(FusionError::InvalidConfig(format!(
                "heart rate limits are inverted ({} >= {})",
                limits.min_heart_rate, limits.max_heart_rate
            )));
        }
        if !(limits.min_sleep_minutes < limits.max_sleep_minutes) {
            return Err(FusionError::InvalidConfig(format!(
                "sleep limits are inverted ({} >= {})",
                limits.min_sleep_minutes, limits.max_sleep_minutes
            )));
        }
        if !limits.sleep_stage_tolerance_minutes.is_finite()
            || limits.sleep_stage_tolerance_minutes < 0.0
        {
            return Err(FusionError::InvalidConfig(
                "sleep_stage_tolerance_minutes must be a non-negative number".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_empty_json_yields_defaults() {
        let config = FusionConfig::from_json("{}").unwrap();
        assert_eq!(config, FusionConfig::default());
        assert_eq!(config.series_window_ms, 300_000);
        assert_eq!(config.series_policy, ResolutionPolicy::WeightedAverage);
    }

    #[test]
    fn test_partial_override() {
        let config = FusionConfig::from_json(
            r#"{"series_policy": "priority_wins", "limits": {"max_steps": 60000}}"#,
        )
        .unwrap();

        assert_eq!(config.series_policy, ResolutionPolicy::PriorityWins);
        assert_eq!(config.limits.max_steps, 60_000);
        assert_eq!(config.limits.max_heart_rate, 220);
        assert_eq!(config.steps_discrepancy_threshold, 0.2);
    }

    #[test]
    fn test_zero_window_rejected() {
        let result = FusionConfig::from_json(r#"{"series_window_ms": 0}"#);
        assert!(matches!(result, Err(FusionError::InvalidWindow(0))));
    }

    #[test]
    fn test_inverted_limits_rejected() {
        let mut config = FusionConfig::default();
        config.limits.min_heart_rate = 250;
        assert!(matches!(
            config.validate(),
            Err(FusionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_roundtrip_json() {
        let config = FusionConfig::default();
        let json = config.to_json().unwrap();
        assert_eq!(FusionConfig::from_json(&json).unwrap(), config);
    }
}
