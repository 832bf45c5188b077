//! Health Fusion - Deterministic multi-source fusion of daily health telemetry
//!
//! Wearables, phone sensors, workout apps and manual entry all report
//! overlapping data for the same day. Fusion turns them into one
//! authoritative, deduplicated record through a deterministic pipeline:
//! sanitization → per-metric merging (steps, heart-rate series, sleep)
//! → plausibility validation.
//!
//! ## Modules
//!
//! - **Registry**: Static source trust table (priority, reliability)
//! - **Bucketing & Resolution**: Time windows and per-bucket conflict policies
//! - **Mergers**: Scalar totals, time series, sleep, workout overlay
//! - **Engine**: Orchestration and the JSON entry point

pub mod bucket;
pub mod config;
pub mod engine;
pub mod error;
pub mod merge;
pub mod registry;
pub mod resolver;
pub mod sanitizer;
pub mod types;
pub mod validator;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use bucket::TimeBucketer;
pub use config::{FusionConfig, ValidationLimits};
pub use engine::{merge_sources_json, FusionEngine};
pub use error::FusionError;
pub use registry::SourceRegistry;
pub use resolver::{ConflictResolver, ResolutionPolicy};
pub use types::{
    DailySnapshot, FusionRequest, IssueCode, MergedSnapshot, Severity, SleepRecord,
    SourceDescriptor, TimestampedReading, ValidationIssue, WorkoutSession,
};

/// Engine version embedded in CLI and FFI output
pub const FUSION_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name
pub const PRODUCER_NAME: &str = "health-fusion";
