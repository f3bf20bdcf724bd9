//! Total numeric helpers: nothing here panics or lets NaN escape.

/// Return `value` when finite, otherwise `fallback`
#[inline]
#[must_use]
pub fn finite_or(value: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        fallback
    }
}

/// Clamp without panicking
///
/// Unlike [`f64::clamp`] this never panics: NaN maps to `min` and an inverted
/// range collapses onto `max`.
#[inline]
#[must_use]
pub fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() {
        return min;
    }
    value.max(min).min(max)
}

/// Divide by `divisor`, never by less than `floor`
#[inline]
#[must_use]
pub fn safe_ratio(numerator: f64, divisor: f64, floor: f64) -> f64 {
    numerator / finite_or(divisor, floor).max(floor)
}
