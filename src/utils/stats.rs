//! Robust order statistics over sample buffers.

/// Median of `values`, or `None` for an empty slice
///
/// Even-length inputs average the two middle values.
#[must_use]
pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let len = sorted.len();
    let mid = len / 2;
    if len % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

/// Median of `values`, or `fallback` for an empty slice
#[must_use]
pub fn median_or(values: &[f64], fallback: f64) -> f64 {
    median(values).unwrap_or(fallback)
}

/// Median absolute deviation of `values` around `pivot`
///
/// A non-finite or absent pivot falls back to the sample median. Empty input
/// yields `fallback`.
#[must_use]
pub fn median_absolute_deviation(values: &[f64], pivot: Option<f64>, fallback: f64) -> f64 {
    if values.is_empty() {
        return fallback;
    }

    let center = match pivot {
        Some(p) if p.is_finite() => p,
        _ => median_or(values, 0.0),
    };

    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median_or(&deviations, fallback)
}
