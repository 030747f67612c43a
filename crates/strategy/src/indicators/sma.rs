use common::{Error, Result};

/// Trailing simple moving average.
///
/// Warm-up policy: the first `window - 1` entries have no full window behind
/// them and are backfilled with the first complete average, so the output is
/// the input's length and has no gaps. Derivatives taken over this vector
/// read as flat through the warm-up region.
pub fn simple_moving_average(series: &[f64], window: usize) -> Result<Vec<f64>> {
    let n = series.len();
    if window == 0 || window > n {
        return Err(Error::InvalidWindow { window, len: n });
    }

    // Every window is summed independently, never as a running total.
    let full: Vec<f64> = series
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect();

    let mut out = vec![full[0]; window - 1];
    out.extend(full);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn sma_5_basic() {
        let series = [10.0, 11.0, 12.0, 13.0, 14.0, 15.0, 16.0];
        let result = simple_moving_average(&series, 5).unwrap();

        assert_eq!(result.len(), 7);
        // SMA[4] = mean(10..=14) = 12, repeated backward over the warm-up
        for value in &result[..5] {
            assert_approx(*value, 12.0);
        }
        assert_approx(result[5], 13.0);
        assert_approx(result[6], 14.0);
    }

    #[test]
    fn sma_1_is_the_series() {
        let series = [100.0, 200.0, 300.0];
        let result = simple_moving_average(&series, 1).unwrap();
        assert_eq!(result, series.to_vec());
    }

    #[test]
    fn large_value_leaving_the_window_does_not_skew_later_averages() {
        let result = simple_moving_average(&[1e17, 1.0, 3.0], 2).unwrap();
        assert_eq!(result[2], 2.0);

        let result = simple_moving_average(&[1e16, 1.0, 1.0], 1).unwrap();
        assert_eq!(result, vec![1e16, 1.0, 1.0]);
    }

    #[test]
    fn window_equal_to_length_is_flat_mean() {
        let result = simple_moving_average(&[1.0, 2.0, 3.0, 6.0], 4).unwrap();
        assert!(result.iter().all(|&v| (v - 3.0).abs() < 1e-12));
    }

    #[test]
    fn window_longer_than_series_fails() {
        let err = simple_moving_average(&[1.0, 2.0], 3).unwrap_err();
        assert!(matches!(err, Error::InvalidWindow { window: 3, len: 2 }));
    }

    #[test]
    fn zero_window_fails() {
        assert!(matches!(
            simple_moving_average(&[1.0, 2.0], 0),
            Err(Error::InvalidWindow { .. })
        ));
    }
}
