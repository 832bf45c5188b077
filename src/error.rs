//! Error types for health fusion
//!
//! Merging never fails: anomalies in the data surface as
//! [`ValidationIssue`](crate::types::ValidationIssue)s on the merged snapshot.
//! These errors only come from construction (config, registry) and from the
//! JSON boundary.

use thiserror::Error;

/// Errors raised outside of the merge itself
#[derive(Debug, Error)]
pub enum FusionError {
    #[error("Failed to parse fusion request: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid source registry: {0}")]
    InvalidRegistry(String),

    #[error("Invalid bucket window: {0} ms")]
    InvalidWindow(i64),
}
