//! Per-metric mergers
//!
//! Each merger handles one kind of metric and reports discrepancies as
//! [`ValidationIssue`](crate::types::ValidationIssue)s alongside its result.

mod scalar;
mod series;
mod sleep;
mod workout;

pub use scalar::{ScalarMerge, ScalarMerger, ScalarSample};
pub use series::{series_mean, SeriesMerger};
pub use sleep::{SleepMerge, SleepMerger};
pub use workout::WorkoutOverlay;
