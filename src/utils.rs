//! Numeric and statistical helpers shared by the pipeline stages.

pub mod numeric;
pub mod stats;

pub use numeric::{clamp, finite_or, safe_ratio};
pub use stats::{median, median_absolute_deviation, median_or};
