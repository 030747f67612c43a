use proptest::prelude::*;
use strategy::indicators::{
    bollinger_bands, exponential_moving_average, fixed_step_derivative, simple_moving_average,
};

fn series_and_window() -> impl Strategy<Value = (Vec<f64>, usize)> {
    prop::collection::vec(0.01f64..100_000.0, 2..200).prop_flat_map(|series| {
        let len = series.len();
        (Just(series), 1..=len)
    })
}

proptest! {
    /// SMA keeps the input length and ends on the mean of the last window.
    #[test]
    fn sma_length_and_last_value((series, window) in series_and_window()) {
        let sma = simple_moving_average(&series, window).unwrap();
        prop_assert_eq!(sma.len(), series.len());

        let tail = &series[series.len() - window..];
        let expected = tail.iter().sum::<f64>() / window as f64;
        let scale = series.iter().cloned().fold(1.0, f64::max);
        let last = *sma.last().unwrap();
        prop_assert!((last - expected).abs() <= 1e-9 * scale);
    }

    /// The warm-up region repeats the first full average.
    #[test]
    fn sma_backfills_warm_up((series, window) in series_and_window()) {
        let sma = simple_moving_average(&series, window).unwrap();
        let first = sma[window - 1];
        prop_assert!(sma[..window].iter().all(|&v| v == first));
    }

    #[test]
    fn sma_rejects_windows_past_the_end(series in prop::collection::vec(-1e3f64..1e3, 0..50)) {
        prop_assert!(simple_moving_average(&series, series.len() + 1).is_err());
    }

    #[test]
    fn derivative_backfill_and_length(series in prop::collection::vec(-1e6f64..1e6, 2..200)) {
        let d = fixed_step_derivative(&series, 1.0).unwrap();
        prop_assert_eq!(d.len(), series.len());
        prop_assert_eq!(d[0], d[1]);
    }

    #[test]
    fn derivative_of_constant_is_zero(value in -1e6f64..1e6, len in 2usize..200) {
        let d = fixed_step_derivative(&vec![value; len], 1.0).unwrap();
        prop_assert!(d.iter().all(|&v| v == 0.0));
    }

    /// EMA output stays within the input's range and the warm-up is flat.
    #[test]
    fn ema_is_bounded_and_flat_at_start((series, window) in series_and_window()) {
        prop_assume!(window < series.len());
        let ema = exponential_moving_average(&series, window).unwrap();
        prop_assert_eq!(ema.len(), series.len());

        let lo = series.iter().cloned().fold(f64::INFINITY, f64::min);
        let hi = series.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        for &v in &ema[window..] {
            prop_assert!(v >= lo - 1e-6 && v <= hi + 1e-6);
        }
        prop_assert!(ema[..window].iter().all(|&v| v == ema[window]));
    }

    /// Bands bracket the average wherever they are defined.
    #[test]
    fn bollinger_bands_bracket_average((series, window) in series_and_window()) {
        let bands = bollinger_bands(&series, window, 2.0).unwrap();
        prop_assert_eq!(bands.average.len(), series.len());
        for i in 0..series.len() {
            prop_assert_eq!(bands.average[i].is_some(), i + 1 >= window);
            if let (Some(a), Some(u), Some(l)) = (bands.average[i], bands.upper[i], bands.lower[i]) {
                prop_assert!(l <= a && a <= u);
            }
        }
    }
}
