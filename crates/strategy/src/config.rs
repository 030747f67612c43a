use serde::{Deserialize, Serialize};

use common::{Error, Result};

/// Top-level trader config file (TOML).
///
/// Example `config/trader.toml`:
/// ```toml
/// active_strategies = [0, 2, 3]
/// sma_windows = [5, 10, 20]
/// bollinger = { sma_index = 2 }
///
/// [[instrument]]
/// pair = "BTCUSDT"
/// trading_enabled = true
///
/// [sizing]
/// nominal_usd_per_trade = 25.0
///
/// [polling]
/// interval_secs = 300
/// granularity_secs = 3600
/// candle_window = 100
/// ```
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TraderConfig {
    #[serde(rename = "instrument")]
    pub instruments: Vec<InstrumentConfig>,
    /// Strategy ids evaluated for every instrument, in this order.
    #[serde(default = "default_active_strategies")]
    pub active_strategies: Vec<u32>,
    #[serde(default = "default_sma_windows")]
    pub sma_windows: Vec<usize>,
    /// Leave empty to skip EMA analysis.
    #[serde(default = "default_ema_windows")]
    pub ema_windows: Vec<usize>,
    #[serde(default)]
    pub bollinger: BollingerWindow,
    #[serde(default = "default_bollinger_std_dev")]
    pub bollinger_std_dev: f64,
    #[serde(default)]
    pub sizing: SizingConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    /// Minimum distance from the live price for limit orders.
    #[serde(default = "default_price_margin")]
    pub price_margin: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InstrumentConfig {
    /// Trading pair, e.g. "BTCUSDT".
    pub pair: String,
    /// When false, decisions are computed and logged but never posted.
    #[serde(default)]
    pub trading_enabled: bool,
}

/// Which window the Bollinger bands use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BollingerWindow {
    /// The SMA window at this position of `sma_windows`.
    SmaIndex { sma_index: usize },
    /// A window length independent of the SMA set.
    Fixed { window: usize },
}

impl Default for BollingerWindow {
    fn default() -> Self {
        BollingerWindow::SmaIndex { sma_index: 2 }
    }
}

impl BollingerWindow {
    pub fn resolve(&self, sma_windows: &[usize]) -> Result<usize> {
        match *self {
            BollingerWindow::Fixed { window } => Ok(window),
            BollingerWindow::SmaIndex { sma_index } => {
                sma_windows.get(sma_index).copied().ok_or_else(|| {
                    Error::Config(format!(
                        "bollinger.sma_index {sma_index} is out of range for {} SMA windows",
                        sma_windows.len()
                    ))
                })
            }
        }
    }
}

/// Trade sizing constants shared by all strategies.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SizingConfig {
    pub nominal_usd_per_trade: f64,
    pub nominal_buy: f64,
    pub nominal_sell: f64,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            nominal_usd_per_trade: 25.0,
            nominal_buy: 0.01,
            nominal_sell: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    pub interval_secs: u64,
    pub granularity_secs: u64,
    /// Candles requested per instrument; fewer disables trading for the cycle.
    pub candle_window: usize,
    pub candle_retries: u32,
    pub candle_retry_delay_ms: u64,
    /// Consecutive failed cycles before the loop gives up.
    pub max_failed_cycles: u32,
    pub failure_backoff_secs: u64,
    /// Stop after this many cycles; run until interrupted when unset.
    pub max_iterations: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            granularity_secs: 3600,
            candle_window: 100,
            candle_retries: 10,
            candle_retry_delay_ms: 500,
            max_failed_cycles: 10,
            failure_backoff_secs: 5,
            max_iterations: None,
        }
    }
}

fn default_active_strategies() -> Vec<u32> {
    vec![0, 2, 3]
}

fn default_sma_windows() -> Vec<usize> {
    vec![5, 10, 20]
}

fn default_ema_windows() -> Vec<usize> {
    vec![2, 3, 12, 26]
}

fn default_bollinger_std_dev() -> f64 {
    2.0
}

fn default_price_margin() -> f64 {
    0.10
}

impl TraderConfig {
    /// Load and validate a TOML file.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read trader config at '{path}': {e}"))
        })?;
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("Invalid trader config at '{path}': {e}")))
    }

    pub fn parse(content: &str) -> Result<Self> {
        let cfg: TraderConfig =
            toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.instruments.is_empty() {
            return Err(Error::Config("at least one [[instrument]] is required".into()));
        }
        if self.sma_windows.is_empty() {
            return Err(Error::Config("sma_windows must not be empty".into()));
        }
        if self.sma_windows.iter().chain(&self.ema_windows).any(|&w| w == 0) {
            return Err(Error::Config("moving average windows must be positive".into()));
        }
        let boll = self.bollinger.resolve(&self.sma_windows)?;
        if boll == 0 {
            return Err(Error::Config("bollinger window must be positive".into()));
        }
        let s = &self.sizing;
        if [s.nominal_usd_per_trade, s.nominal_buy, s.nominal_sell]
            .iter()
            .any(|v| !v.is_finite() || *v <= 0.0)
        {
            return Err(Error::Config("sizing constants must be positive".into()));
        }
        if !self.price_margin.is_finite() || self.price_margin < 0.0 {
            return Err(Error::Config("price_margin must be non-negative".into()));
        }
        if self.polling.candle_window == 0 {
            return Err(Error::Config("polling.candle_window must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[instrument]]
        pair = "BTCUSDT"
    "#;

    #[test]
    fn defaults_follow_reference_setup() {
        let cfg = TraderConfig::parse(MINIMAL).unwrap();
        assert_eq!(cfg.active_strategies, vec![0, 2, 3]);
        assert_eq!(cfg.sma_windows, vec![5, 10, 20]);
        assert_eq!(cfg.ema_windows, vec![2, 3, 12, 26]);
        assert_eq!(cfg.bollinger.resolve(&cfg.sma_windows).unwrap(), 20);
        assert_eq!(cfg.sizing, SizingConfig::default());
        assert_eq!(cfg.polling.granularity_secs, 3600);
        assert!(!cfg.instruments[0].trading_enabled);
        assert!((cfg.price_margin - 0.10).abs() < 1e-12);
    }

    #[test]
    fn fixed_bollinger_window_is_independent() {
        let cfg = TraderConfig::parse(
            r#"
            sma_windows = [3, 7]
            bollinger = { window = 14 }

            [[instrument]]
            pair = "ETHUSDT"
            trading_enabled = true
            "#,
        )
        .unwrap();
        assert_eq!(cfg.bollinger, BollingerWindow::Fixed { window: 14 });
        assert_eq!(cfg.bollinger.resolve(&cfg.sma_windows).unwrap(), 14);
    }

    #[test]
    fn sma_index_out_of_range_is_rejected() {
        let err = TraderConfig::parse(
            r#"
            sma_windows = [3, 7]

            [[instrument]]
            pair = "ETHUSDT"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(msg) if msg.contains("sma_index")));
    }

    #[test]
    fn missing_instruments_are_rejected() {
        assert!(TraderConfig::parse("instrument = []").is_err());
    }

    #[test]
    fn non_positive_sizing_is_rejected() {
        let err = TraderConfig::parse(
            r#"
            [[instrument]]
            pair = "BTCUSDT"

            [sizing]
            nominal_usd_per_trade = 0.0
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
