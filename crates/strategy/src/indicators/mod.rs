//! Pure indicator functions over oldest-first price series.
//!
//! Every function returns a vector the same length as its input so strategy
//! code can index from the end without offset bookkeeping.

pub mod bollinger;
pub mod derivative;
pub mod ema;
pub mod sma;

pub use bollinger::{bollinger_bands, BollingerBands};
pub use derivative::fixed_step_derivative;
pub use ema::exponential_moving_average;
pub use sma::simple_moving_average;

/// Arithmetic mean; `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Population standard deviation (divide by N); `None` for an empty slice.
pub fn population_std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    Some(var.sqrt())
}

#[cfg(test)]
pub(crate) const EPSILON: f64 = 1e-9;

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < EPSILON,
        "assert_approx failed: actual={actual}, expected={expected}"
    );
}
