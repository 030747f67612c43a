use common::{Error, Result};

/// Exponentially weighted moving average.
///
/// Weights are `exp(linspace(-1, 0, window))` normalised to sum to 1 and
/// applied as a full convolution truncated to the input length, so
/// `out[i] = sum_k series[i - k] * weights[k]`.
///
/// Warm-up policy: entries `0..window` are overwritten with the value at
/// index `window`, flattening the start-up ramp instead of leaving the biased
/// partial sums in place. This requires `window < series.len()`.
pub fn exponential_moving_average(series: &[f64], window: usize) -> Result<Vec<f64>> {
    let n = series.len();
    if window == 0 || window >= n {
        return Err(Error::InvalidWindow { window, len: n });
    }

    let weights = weights(window);
    let mut out: Vec<f64> = (0..n)
        .map(|i| {
            weights
                .iter()
                .enumerate()
                .take(i + 1)
                .map(|(k, w)| series[i - k] * w)
                .sum::<f64>()
        })
        .collect();

    let settled = out[window];
    out[..window].fill(settled);
    Ok(out)
}

fn weights(window: usize) -> Vec<f64> {
    let raw: Vec<f64> = if window == 1 {
        vec![(-1.0f64).exp()]
    } else {
        let step = 1.0 / (window - 1) as f64;
        (0..window).map(|k| (-1.0 + k as f64 * step).exp()).collect()
    };
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}
