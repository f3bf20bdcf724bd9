use super::ScalarFilter;
use crate::{
    constants::{SMOOTHING_ALPHA_MAX, SMOOTHING_ALPHA_MIN},
    utils::{clamp, finite_or},
};

/// Exponential smoothing with independent rise and fall rates
///
/// `value += (target - value) * alpha`, where `alpha` is the rise rate when the
/// target is above the current value and the fall rate otherwise.
#[derive(Debug, Clone, PartialEq)]
pub struct AsymmetricEmaFilter {
    initial: f64,
    value: f64,
    alpha_rise: f64,
    alpha_fall: f64,
}

impl AsymmetricEmaFilter {
    /// Create a filter starting at `initial`
    ///
    /// Rates are clamped into `[0.01, 1]`; a non-finite initial value starts at 0.
    #[must_use]
    pub fn new(initial: f64, alpha_rise: f64, alpha_fall: f64) -> Self {
        let initial = finite_or(initial, 0.0);
        Self {
            initial,
            value: initial,
            alpha_rise: clamp(alpha_rise, SMOOTHING_ALPHA_MIN, SMOOTHING_ALPHA_MAX),
            alpha_fall: clamp(alpha_fall, SMOOTHING_ALPHA_MIN, SMOOTHING_ALPHA_MAX),
        }
    }

    /// Effective rise rate
    #[must_use]
    pub const fn alpha_rise(&self) -> f64 {
        self.alpha_rise
    }

    /// Effective fall rate
    #[must_use]
    pub const fn alpha_fall(&self) -> f64 {
        self.alpha_fall
    }
}

impl ScalarFilter for AsymmetricEmaFilter {
    fn apply(&mut self, target: f64) -> f64 {
        if !target.is_finite() {
            return self.value;
        }

        let alpha = if target > self.value {
            self.alpha_rise
        } else {
            self.alpha_fall
        };
        self.value += (target - self.value) * alpha;
        self.value
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn reset(&mut self) {
        self.value = self.initial;
    }

    fn name(&self) -> &str {
        "AsymmetricEmaFilter"
    }
}
