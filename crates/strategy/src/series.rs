use chrono::{DateTime, Utc};
use tracing::debug;

use common::{Candle, Error, Result};

use crate::indicators::{
    bollinger_bands, exponential_moving_average, fixed_step_derivative, simple_moving_average,
    BollingerBands,
};

/// A moving-average family: one vector per window plus its first and second
/// fixed-step derivatives, all the length of the close series.
#[derive(Debug, Clone, PartialEq)]
pub struct MovingAverageSet {
    pub windows: Vec<usize>,
    pub values: Vec<Vec<f64>>,
    pub first_derivative: Vec<Vec<f64>>,
    pub second_derivative: Vec<Vec<f64>>,
}

impl MovingAverageSet {
    fn compute<F>(closes: &[f64], windows: &[usize], average: F) -> Result<Self>
    where
        F: Fn(&[f64], usize) -> Result<Vec<f64>>,
    {
        let mut set = MovingAverageSet {
            windows: windows.to_vec(),
            values: Vec::with_capacity(windows.len()),
            first_derivative: Vec::with_capacity(windows.len()),
            second_derivative: Vec::with_capacity(windows.len()),
        };
        for &window in windows {
            let values = average(closes, window)?;
            let first = fixed_step_derivative(&values, 1.0)?;
            let second = fixed_step_derivative(&first, 1.0)?;
            set.values.push(values);
            set.first_derivative.push(first);
            set.second_derivative.push(second);
        }
        Ok(set)
    }

    /// Most recent value of the average at position `index` in `windows`.
    pub fn latest(&self, index: usize) -> Option<f64> {
        self.values.get(index)?.last().copied()
    }

    pub fn len(&self) -> usize {
        self.windows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

/// Derived data for the currently ingested candles. Every field is `None`
/// until the matching `analyze_*` call has run after the latest ingest.
#[derive(Debug, Clone, Default)]
pub struct IndicatorSet {
    sma: Option<MovingAverageSet>,
    ema: Option<MovingAverageSet>,
    bollinger: Option<BollingerBands>,
}

/// OHLCV field selector for `SeriesStore::price_derivatives`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceField {
    Open,
    High,
    Low,
    Close,
}

/// First and second fixed-step derivatives of one price field.
#[derive(Debug, Clone, PartialEq)]
pub struct Derivatives {
    pub first: Vec<f64>,
    pub second: Vec<f64>,
}

/// Time-aligned OHLCV vectors and derived indicators for one instrument.
///
/// All value vectors share the length of `time` and are replaced wholesale
/// on each `ingest`, which also discards previously computed indicators.
#[derive(Debug, Clone)]
pub struct SeriesStore {
    pair: String,
    time: Vec<DateTime<Utc>>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    current_price: Option<f64>,
    indicators: IndicatorSet,
}

impl SeriesStore {
    pub fn new(pair: impl Into<String>) -> Self {
        Self {
            pair: pair.into(),
            time: Vec::new(),
            open: Vec::new(),
            high: Vec::new(),
            low: Vec::new(),
            close: Vec::new(),
            volume: Vec::new(),
            current_price: None,
            indicators: IndicatorSet::default(),
        }
    }

    /// Replace the series from a newest-first candle batch, storing it oldest-first.
    pub fn ingest(&mut self, candles: &[Candle]) -> Result<()> {
        if candles.is_empty() {
            return Err(Error::EmptyInput);
        }

        let n = candles.len();
        let mut time = Vec::with_capacity(n);
        let mut open = Vec::with_capacity(n);
        let mut high = Vec::with_capacity(n);
        let mut low = Vec::with_capacity(n);
        let mut close = Vec::with_capacity(n);
        let mut volume = Vec::with_capacity(n);

        for c in candles.iter().rev() {
            time.push(c.timestamp);
            open.push(c.open);
            high.push(c.high);
            low.push(c.low);
            close.push(c.close);
            volume.push(c.volume);
        }

        self.time = time;
        self.open = open;
        self.high = high;
        self.low = low;
        self.close = close;
        self.volume = volume;
        self.indicators = IndicatorSet::default();

        debug!(pair = %self.pair, candles = n, "Ingested candle batch");
        Ok(())
    }

    pub fn set_current_price(&mut self, price: f64) {
        self.current_price = Some(price);
    }

    /// Compute SMAs, their derivatives and the Bollinger bands on close.
    pub fn analyze_sma(
        &mut self,
        windows: &[usize],
        bollinger_window: usize,
        num_std_dev: f64,
    ) -> Result<()> {
        self.ensure_ingested()?;
        let sma = MovingAverageSet::compute(&self.close, windows, simple_moving_average)?;
        let bands = bollinger_bands(&self.close, bollinger_window, num_std_dev)?;
        self.indicators.sma = Some(sma);
        self.indicators.bollinger = Some(bands);
        Ok(())
    }

    /// Compute EMAs and their derivatives on close.
    pub fn analyze_ema(&mut self, windows: &[usize]) -> Result<()> {
        self.ensure_ingested()?;
        let ema = MovingAverageSet::compute(&self.close, windows, exponential_moving_average)?;
        self.indicators.ema = Some(ema);
        Ok(())
    }

    /// First and second derivatives of a raw price field.
    pub fn price_derivatives(&self, field: PriceField) -> Result<Derivatives> {
        let series = match field {
            PriceField::Open => &self.open,
            PriceField::High => &self.high,
            PriceField::Low => &self.low,
            PriceField::Close => &self.close,
        };
        let first = fixed_step_derivative(series, 1.0)?;
        let second = fixed_step_derivative(&first, 1.0)?;
        Ok(Derivatives { first, second })
    }

    pub fn sma(&self) -> Result<&MovingAverageSet> {
        self.indicators
            .sma
            .as_ref()
            .ok_or(Error::StaleIndicators("SMA"))
    }

    pub fn ema(&self) -> Result<&MovingAverageSet> {
        self.indicators
            .ema
            .as_ref()
            .ok_or(Error::StaleIndicators("EMA"))
    }

    pub fn bollinger(&self) -> Result<&BollingerBands> {
        self.indicators
            .bollinger
            .as_ref()
            .ok_or(Error::StaleIndicators("Bollinger bands"))
    }

    fn ensure_ingested(&self) -> Result<()> {
        if self.close.is_empty() {
            return Err(Error::EmptyInput);
        }
        Ok(())
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn current_price(&self) -> Option<f64> {
        self.current_price
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn time(&self) -> &[DateTime<Utc>] {
        &self.time
    }

    pub fn open(&self) -> &[f64] {
        &self.open
    }

    pub fn high(&self) -> &[f64] {
        &self.high
    }

    pub fn low(&self) -> &[f64] {
        &self.low
    }

    pub fn close(&self) -> &[f64] {
        &self.close
    }

    pub fn volume(&self) -> &[f64] {
        &self.volume
    }
}
