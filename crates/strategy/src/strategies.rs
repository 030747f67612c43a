use tracing::warn;

use common::{Error, Result, StrategyDecision};

use crate::config::SizingConfig;
use crate::indicators::{mean, population_std_dev};
use crate::series::SeriesStore;
use crate::Strategy;

/// Known strategy ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    SmaGoldenCross,
    DerivativePrediction,
    VarianceAnomalyTrigger,
    VolumeWeightedVarianceAnomalyTrigger,
}

impl StrategyKind {
    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            0 => Some(StrategyKind::SmaGoldenCross),
            1 => Some(StrategyKind::DerivativePrediction),
            2 => Some(StrategyKind::VarianceAnomalyTrigger),
            3 => Some(StrategyKind::VolumeWeightedVarianceAnomalyTrigger),
            _ => None,
        }
    }

    pub fn id(self) -> u32 {
        match self {
            StrategyKind::SmaGoldenCross => 0,
            StrategyKind::DerivativePrediction => 1,
            StrategyKind::VarianceAnomalyTrigger => 2,
            StrategyKind::VolumeWeightedVarianceAnomalyTrigger => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            StrategyKind::SmaGoldenCross => "SMA Golden Cross",
            StrategyKind::DerivativePrediction => "Derivative Prediction",
            StrategyKind::VarianceAnomalyTrigger => "Variance Anomaly Trigger",
            StrategyKind::VolumeWeightedVarianceAnomalyTrigger => {
                "Volume Weighted Variance Anomaly Trigger"
            }
        }
    }
}

/// Build the strategy for an id. Unknown ids get a no-op strategy.
pub fn build_strategy(id: u32, sizing: SizingConfig) -> Box<dyn Strategy> {
    match StrategyKind::from_id(id) {
        Some(StrategyKind::SmaGoldenCross) => Box::new(SmaGoldenCross { sizing }),
        Some(StrategyKind::DerivativePrediction) => Box::new(DerivativePrediction),
        Some(StrategyKind::VarianceAnomalyTrigger) => Box::new(VarianceAnomalyTrigger { sizing }),
        Some(StrategyKind::VolumeWeightedVarianceAnomalyTrigger) => {
            Box::new(VolumeWeightedVarianceAnomalyTrigger { sizing })
        }
        None => Box::new(UnknownStrategy { id }),
    }
}

/// Quantity worth `usd` at `price`, or `fallback` when the price cannot size a trade.
fn usd_size(usd: f64, price: f64, fallback: f64) -> f64 {
    if price.is_finite() && price > 0.0 {
        usd / price
    } else {
        fallback
    }
}

/// Buy when fast > medium > slow SMA, sell when fast <= medium <= slow.
/// Both bids sit at the medium SMA.
pub struct SmaGoldenCross {
    sizing: SizingConfig,
}

impl Strategy for SmaGoldenCross {
    fn id(&self) -> u32 {
        StrategyKind::SmaGoldenCross.id()
    }

    fn name(&self) -> &str {
        StrategyKind::SmaGoldenCross.name()
    }

    fn evaluate(&self, store: &SeriesStore, _current_price: f64) -> Result<StrategyDecision> {
        let sma = store.sma()?;
        let (fast, medium, slow) = match (sma.latest(0), sma.latest(1), sma.latest(2)) {
            (Some(f), Some(m), Some(s)) => (f, m, s),
            _ => {
                return Err(Error::Config(format!(
                    "{} needs three SMA windows, {} configured",
                    self.name(),
                    sma.len()
                )))
            }
        };

        let price = medium;
        let usd = self.sizing.nominal_usd_per_trade;
        Ok(StrategyDecision {
            buy_signal: fast > medium && medium > slow,
            sell_signal: fast <= medium && medium <= slow,
            buy_price: price,
            sell_price: price,
            buy_size: usd_size(usd, price, self.sizing.nominal_buy),
            sell_size: usd_size(usd, price, self.sizing.nominal_sell),
        })
    }
}

/// Placeholder for a derivative-extrapolation strategy; never signals.
pub struct DerivativePrediction;

impl Strategy for DerivativePrediction {
    fn id(&self) -> u32 {
        StrategyKind::DerivativePrediction.id()
    }

    fn name(&self) -> &str {
        StrategyKind::DerivativePrediction.name()
    }

    fn evaluate(&self, _store: &SeriesStore, _current_price: f64) -> Result<StrategyDecision> {
        Ok(StrategyDecision::none())
    }
}

/// Always bids three candle-range deviations either side of the live price,
/// hoping to catch outsized fluctuations.
pub struct VarianceAnomalyTrigger {
    sizing: SizingConfig,
}

impl Strategy for VarianceAnomalyTrigger {
    fn id(&self) -> u32 {
        StrategyKind::VarianceAnomalyTrigger.id()
    }

    fn name(&self) -> &str {
        StrategyKind::VarianceAnomalyTrigger.name()
    }

    fn evaluate(&self, store: &SeriesStore, current_price: f64) -> Result<StrategyDecision> {
        let ranges: Vec<f64> = store
            .high()
            .iter()
            .zip(store.low())
            .map(|(h, l)| h - l)
            .collect();
        let sigma = population_std_dev(&ranges).ok_or(Error::EmptyInput)?;
        Ok(anomaly_bids(current_price, sigma, 1.0, 1.0, &self.sizing))
    }
}

/// Like `VarianceAnomalyTrigger`, but candle ranges are weighted by relative
/// volume and the bids are centred on the fastest SMA instead of the ticker.
pub struct VolumeWeightedVarianceAnomalyTrigger {
    sizing: SizingConfig,
}

impl Strategy for VolumeWeightedVarianceAnomalyTrigger {
    fn id(&self) -> u32 {
        StrategyKind::VolumeWeightedVarianceAnomalyTrigger.id()
    }

    fn name(&self) -> &str {
        StrategyKind::VolumeWeightedVarianceAnomalyTrigger.name()
    }

    fn evaluate(&self, store: &SeriesStore, _current_price: f64) -> Result<StrategyDecision> {
        let center = store
            .sma()?
            .latest(0)
            .ok_or_else(|| Error::Config(format!("{} needs an SMA window", self.name())))?;

        let mean_volume = mean(store.volume()).ok_or(Error::EmptyInput)?;
        if !mean_volume.is_finite() || mean_volume <= 0.0 {
            return Err(Error::DataUnavailable(format!(
                "{}: no traded volume in the candle window",
                store.pair()
            )));
        }

        let weighted: Vec<f64> = store
            .high()
            .iter()
            .zip(store.low())
            .zip(store.volume())
            .map(|((h, l), v)| (h - l) * (v / mean_volume))
            .collect();
        let sigma = population_std_dev(&weighted).ok_or(Error::EmptyInput)?;
        Ok(anomaly_bids(center, sigma, 3.0, 10.0, &self.sizing))
    }
}

/// Bids at `center -/+ 3 sigma`, sized at `usd_scale` times the per-trade USD
/// amount. `nominal_scale` applies to the nominal fallback size.
fn anomaly_bids(
    center: f64,
    sigma: f64,
    usd_scale: f64,
    nominal_scale: f64,
    sizing: &SizingConfig,
) -> StrategyDecision {
    let buy_price = center - 3.0 * sigma;
    let sell_price = center + 3.0 * sigma;
    let usd = usd_scale * sizing.nominal_usd_per_trade;
    StrategyDecision {
        buy_signal: true,
        sell_signal: true,
        buy_price,
        sell_price,
        buy_size: usd_size(usd, buy_price, nominal_scale * sizing.nominal_buy),
        sell_size: usd_size(usd, sell_price, nominal_scale * sizing.nominal_sell),
    }
}

/// Stand-in for an id with no implementation. Never signals, never fails.
pub struct UnknownStrategy {
    id: u32,
}

impl Strategy for UnknownStrategy {
    fn id(&self) -> u32 {
        self.id
    }

    fn name(&self) -> &str {
        "Invalid Strategy"
    }

    fn evaluate(&self, store: &SeriesStore, _current_price: f64) -> Result<StrategyDecision> {
        warn!(pair = %store.pair(), strategy_id = self.id, "Invalid strategy id, no signal");
        Ok(StrategyDecision::none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::tests::candles_from_closes;
    use chrono::{TimeZone, Utc};
    use common::Candle;

    const EPS: f64 = 1e-9;

    fn store_with_closes(closes: &[f64], windows: &[usize]) -> SeriesStore {
        let mut store = SeriesStore::new("BTCUSDT");
        store.ingest(&candles_from_closes(closes)).unwrap();
        let boll = *windows.last().unwrap();
        store.analyze_sma(windows, boll, 2.0).unwrap();
        store
    }

    /// Newest-first candles with fixed close and the given high-low ranges/volumes.
    fn ranged_candles(close: f64, ranges: &[f64], volumes: &[f64]) -> Vec<Candle> {
        let mut candles: Vec<Candle> = ranges
            .iter()
            .zip(volumes)
            .enumerate()
            .map(|(i, (&range, &volume))| Candle {
                timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
                open: close,
                high: close + range,
                low: close,
                close,
                volume,
            })
            .collect();
        candles.reverse();
        candles
    }

    // population sd of these is exactly 2
    const RANGES: [f64; 8] = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];

    #[test]
    fn golden_cross_buys_on_rising_stack() {
        // SMA(1)=110, SMA(2)=105, SMA(3)=100
        let store = store_with_closes(&[90.0, 100.0, 110.0], &[1, 2, 3]);
        let strategy = build_strategy(0, SizingConfig::default());
        let d = strategy.evaluate(&store, 111.0).unwrap();

        assert!(d.buy_signal);
        assert!(!d.sell_signal);
        assert!((d.buy_price - 105.0).abs() < EPS);
        assert!((d.sell_price - 105.0).abs() < EPS);
        assert!((d.buy_size - 25.0 / 105.0).abs() < EPS);
    }

    #[test]
    fn golden_cross_sells_on_falling_stack() {
        // SMA(1)=90, SMA(2)=95, SMA(3)=100
        let store = store_with_closes(&[110.0, 100.0, 90.0], &[1, 2, 3]);
        let d = build_strategy(0, SizingConfig::default())
            .evaluate(&store, 90.0)
            .unwrap();
        assert!(!d.buy_signal);
        assert!(d.sell_signal);
        assert!((d.sell_price - 95.0).abs() < EPS);
    }

    #[test]
    fn golden_cross_flat_stack_sells_only() {
        let store = store_with_closes(&[5.0, 5.0, 5.0], &[1, 2, 3]);
        let d = build_strategy(0, SizingConfig::default())
            .evaluate(&store, 5.0)
            .unwrap();
        assert!(!d.buy_signal);
        assert!(d.sell_signal);
    }

    #[test]
    fn golden_cross_single_equal_pair_signals_nothing() {
        // SMA(1)=10, SMA(2)=10, SMA(3)=8
        let store = store_with_closes(&[4.0, 10.0, 10.0], &[1, 2, 3]);
        let d = build_strategy(0, SizingConfig::default())
            .evaluate(&store, 10.0)
            .unwrap();
        assert!(!d.buy_signal);
        assert!(!d.sell_signal);
    }

    #[test]
    fn golden_cross_needs_three_windows() {
        let store = store_with_closes(&[1.0, 2.0, 3.0], &[1, 2]);
        let err = build_strategy(0, SizingConfig::default())
            .evaluate(&store, 3.0)
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn golden_cross_reads_fresh_indicators_only() {
        let mut store = SeriesStore::new("BTCUSDT");
        store.ingest(&candles_from_closes(&[1.0, 2.0, 3.0])).unwrap();
        let err = build_strategy(0, SizingConfig::default())
            .evaluate(&store, 3.0)
            .unwrap_err();
        assert!(matches!(err, Error::StaleIndicators(_)));
    }

    #[test]
    fn derivative_prediction_never_signals() {
        let store = store_with_closes(&[1.0, 2.0, 3.0], &[1, 2, 3]);
        let d = build_strategy(1, SizingConfig::default())
            .evaluate(&store, 3.0)
            .unwrap();
        assert_eq!(d, StrategyDecision::none());
    }

    #[test]
    fn variance_trigger_brackets_current_price() {
        let mut store = SeriesStore::new("BTCUSDT");
        store.ingest(&ranged_candles(50.0, &RANGES, &[1.0; 8])).unwrap();
        let d = build_strategy(2, SizingConfig::default())
            .evaluate(&store, 100.0)
            .unwrap();

        assert!(d.buy_signal && d.sell_signal);
        assert!((d.buy_price - 94.0).abs() < EPS);
        assert!((d.sell_price - 106.0).abs() < EPS);
        assert!((d.buy_size - 25.0 / 94.0).abs() < EPS);
        assert!((d.sell_size - 25.0 / 106.0).abs() < EPS);
    }

    #[test]
    fn volume_weighted_trigger_centres_on_fast_sma() {
        let mut store = SeriesStore::new("BTCUSDT");
        // equal volumes → weights of 1, same sigma as the plain trigger
        store.ingest(&ranged_candles(50.0, &RANGES, &[3.0; 8])).unwrap();
        store.analyze_sma(&[1, 2, 4], 4, 2.0).unwrap();
        let d = build_strategy(3, SizingConfig::default())
            .evaluate(&store, 100.0)
            .unwrap();

        assert!(d.buy_signal && d.sell_signal);
        assert!((d.buy_price - 44.0).abs() < EPS);
        assert!((d.sell_price - 56.0).abs() < EPS);
        assert!((d.buy_size - 75.0 / 44.0).abs() < EPS);
        assert!((d.sell_size - 75.0 / 56.0).abs() < EPS);
    }

    #[test]
    fn volume_weighting_scales_ranges() {
        let mut store = SeriesStore::new("BTCUSDT");
        // Newest candle carries all the volume: weights are [0, 0, 0, 4] oldest-first.
        store
            .ingest(&ranged_candles(100.0, &[1.0, 1.0, 1.0, 1.0], &[0.0, 0.0, 0.0, 8.0]))
            .unwrap();
        store.analyze_sma(&[1], 1, 2.0).unwrap();
        let d = build_strategy(3, SizingConfig::default())
            .evaluate(&store, 100.0)
            .unwrap();
        // weighted ranges [0, 0, 0, 4]: mean 1, variance 3
        let sigma = 3.0f64.sqrt();
        assert!((d.buy_price - (100.0 - 3.0 * sigma)).abs() < EPS);
    }

    #[test]
    fn volume_weighted_trigger_needs_volume() {
        let mut store = SeriesStore::new("BTCUSDT");
        store.ingest(&ranged_candles(10.0, &[1.0, 2.0], &[0.0, 0.0])).unwrap();
        store.analyze_sma(&[1], 1, 2.0).unwrap();
        let err = build_strategy(3, SizingConfig::default())
            .evaluate(&store, 10.0)
            .unwrap_err();
        assert!(matches!(err, Error::DataUnavailable(_)));
    }

    #[test]
    fn non_positive_bid_falls_back_to_nominal_size() {
        let mut store = SeriesStore::new("BTCUSDT");
        store.ingest(&ranged_candles(1.0, &RANGES, &[1.0; 8])).unwrap();
        // 1 - 3*2 < 0
        let d = build_strategy(2, SizingConfig::default())
            .evaluate(&store, 1.0)
            .unwrap();
        assert!(d.buy_price < 0.0);
        assert!((d.buy_size - 0.01).abs() < EPS);
    }

    #[test]
    fn unknown_id_is_a_no_op() {
        let store = store_with_closes(&[1.0, 2.0, 3.0], &[1, 2, 3]);
        let strategy = build_strategy(99, SizingConfig::default());
        assert_eq!(strategy.id(), 99);
        assert_eq!(strategy.evaluate(&store, 3.0).unwrap(), StrategyDecision::none());
    }

    #[test]
    fn kind_ids_round_trip() {
        for id in 0..4 {
            assert_eq!(StrategyKind::from_id(id).unwrap().id(), id);
        }
        assert!(StrategyKind::from_id(4).is_none());
    }
}
