//! Shared numeric helpers.
//!
//! Every helper returns `0.0` for degenerate input (empty slices, zero
//! denominators, non-finite intermediates) instead of `NaN` or infinity.

/// Arithmetic mean. Empty input yields `0.0`.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    finite_or_zero(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population variance (divides by `n`, not `n - 1`).
pub fn population_variance(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    finite_or_zero(sum_sq / values.len() as f64).max(0.0)
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    population_variance(values).sqrt()
}

/// `numerator / denominator`, or `0.0` when the denominator is zero.
pub fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    finite_or_zero(numerator / denominator)
}

/// Percentage change from `first` to `last`: `(last - first) / first * 100`.
///
/// A zero baseline yields `0.0` by convention.
pub fn growth_percent(first: f64, last: f64) -> f64 {
    safe_ratio(last - first, first) * 100.0
}

/// Normalise non-negative weights to percentages summing to 100.
///
/// All-zero (or empty) input yields all zeros.
pub fn percent_shares(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().map(|w| w.max(0.0)).sum();
    weights
        .iter()
        .map(|w| safe_ratio(w.max(0.0), total) * 100.0)
        .collect()
}

fn finite_or_zero(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
