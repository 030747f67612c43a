//! Bollinger bands: rolling mean +/- k sample standard deviations of close.
//!
//! Unlike the moving averages, warm-up entries are left missing (`None`);
//! consumers must tolerate gaps at the start of these vectors.

use common::{round_dp, Error, Result};

/// Average, upper and lower band, each rounded to 3 decimals.
#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    pub window: usize,
    pub average: Vec<Option<f64>>,
    pub upper: Vec<Option<f64>>,
    pub lower: Vec<Option<f64>>,
}

impl BollingerBands {
    /// Latest `(average, upper, lower)`, if all three are defined.
    pub fn last(&self) -> Option<(f64, f64, f64)> {
        Some((
            (*self.average.last()?)?,
            (*self.upper.last()?)?,
            (*self.lower.last()?)?,
        ))
    }
}

/// Trailing window, sample standard deviation (n - 1 denominator). With
/// `window == 1` the deviation is undefined, so only the average is filled.
///
/// Rounding goes through `round_dp`, which rounds ties away from zero, not to even.
pub fn bollinger_bands(closes: &[f64], window: usize, num_std_dev: f64) -> Result<BollingerBands> {
    let n = closes.len();
    if window == 0 || window > n {
        return Err(Error::InvalidWindow { window, len: n });
    }

    let mut average = vec![None; n];
    let mut upper = vec![None; n];
    let mut lower = vec![None; n];

    for i in (window - 1)..n {
        let slice = &closes[i + 1 - window..=i];
        let mean = slice.iter().sum::<f64>() / window as f64;
        average[i] = Some(round_dp(mean, 3));

        if window > 1 {
            let var = slice.iter().map(|c| (c - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
            let band = num_std_dev * var.sqrt();
            upper[i] = Some(round_dp(mean + band, 3));
            lower[i] = Some(round_dp(mean - band, 3));
        }
    }

    Ok(BollingerBands {
        window,
        average,
        upper,
        lower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn warm_up_entries_are_missing() {
        let bands = bollinger_bands(&[1.0, 2.0, 3.0, 4.0, 5.0], 3, 2.0).unwrap();
        assert_eq!(bands.average.len(), 5);
        assert!(bands.average[..2].iter().all(Option::is_none));
        assert!(bands.upper[..2].iter().all(Option::is_none));
        assert!(bands.average[2..].iter().all(Option::is_some));
    }

    #[test]
    fn bands_use_sample_std_dev() {
        // window [3, 4, 5]: mean 4, sample sd 1
        let bands = bollinger_bands(&[1.0, 2.0, 3.0, 4.0, 5.0], 3, 2.0).unwrap();
        let (avg, up, low) = bands.last().unwrap();
        assert_approx(avg, 4.0);
        assert_approx(up, 6.0);
        assert_approx(low, 2.0);
    }

    #[test]
    fn values_are_rounded_to_three_decimals() {
        let bands = bollinger_bands(&[1.0, 1.0, 2.0], 3, 2.0).unwrap();
        // mean 4/3
        assert_eq!(bands.average[2], Some(1.333));
    }

    #[test]
    fn unit_window_has_no_bands() {
        let bands = bollinger_bands(&[1.0, 2.0], 1, 2.0).unwrap();
        assert_eq!(bands.average, vec![Some(1.0), Some(2.0)]);
        assert!(bands.upper.iter().all(Option::is_none));
        assert!(bands.last().is_none());
    }

    #[test]
    fn oversized_window_fails() {
        assert!(matches!(
            bollinger_bands(&[1.0, 2.0], 5, 2.0),
            Err(Error::InvalidWindow { window: 5, len: 2 })
        ));
    }
}
