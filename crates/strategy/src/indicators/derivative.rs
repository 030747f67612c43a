use common::{Error, Result};

/// Fixed-step first difference: `out[i] = (series[i] - series[i-1]) / step`.
///
/// The output has the input's length. Element 0 has no predecessor, so it is
/// backfilled with element 1 rather than left undefined.
pub fn fixed_step_derivative(series: &[f64], step: f64) -> Result<Vec<f64>> {
    if step == 0.0 || !step.is_finite() {
        return Err(Error::InvalidStep(step));
    }
    if series.len() < 2 {
        return Err(Error::InsufficientData {
            required: 2,
            actual: series.len(),
        });
    }

    let mut out = Vec::with_capacity(series.len());
    out.push(0.0);
    out.extend(series.windows(2).map(|w| (w[1] - w[0]) / step));
    out[0] = out[1];
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::assert_approx;

    #[test]
    fn constant_series_has_zero_derivative() {
        let d = fixed_step_derivative(&[7.5; 12], 1.0).unwrap();
        assert_eq!(d.len(), 12);
        assert!(d.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn first_element_is_backfilled() {
        let d = fixed_step_derivative(&[1.0, 4.0, 9.0, 16.0], 1.0).unwrap();
        assert_eq!(d, vec![3.0, 3.0, 5.0, 7.0]);
        assert_eq!(d[0], d[1]);
    }

    #[test]
    fn step_scales_the_difference() {
        let d = fixed_step_derivative(&[0.0, 1.0, 3.0], 0.5).unwrap();
        assert_approx(d[1], 2.0);
        assert_approx(d[2], 4.0);
    }

    #[test]
    fn two_samples_is_the_minimum() {
        let d = fixed_step_derivative(&[10.0, 12.0], 1.0).unwrap();
        assert_eq!(d, vec![2.0, 2.0]);

        let err = fixed_step_derivative(&[10.0], 1.0).unwrap_err();
        assert!(matches!(err, Error::InsufficientData { required: 2, actual: 1 }));
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(
            fixed_step_derivative(&[1.0, 2.0], 0.0),
            Err(Error::InvalidStep(_))
        ));
    }
}
