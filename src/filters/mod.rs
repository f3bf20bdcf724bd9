//! Signal filtering algorithms for smoothing per-frame metrics.
//!
//! Every tracked scalar is smoothed by its own filter instance. Filters hold
//! their last output when the raw metric is unavailable on a frame.

/// Exponential smoothing with separate rise and fall rates
pub mod asymmetric_ema;

pub use asymmetric_ema::AsymmetricEmaFilter;

/// Trait for single-channel metric filters
pub trait ScalarFilter: Send + Sync {
    /// Feed a new target value and return the filtered value
    fn apply(&mut self, target: f64) -> f64;

    /// Current filtered value without advancing the filter
    fn value(&self) -> f64;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;

    /// Feed `target` when present, otherwise hold the current value
    fn apply_or_hold(&mut self, target: Option<f64>) -> f64 {
        match target {
            Some(t) => self.apply(t),
            None => self.value(),
        }
    }
}
