use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One OHLCV candlestick sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Side of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "BUY"),
            OrderSide::Sell => write!(f, "SELL"),
        }
    }
}

/// A limit order to be submitted to the exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub pair: String,
    pub side: OrderSide,
    pub quantity: f64,
    pub price: f64,
}

impl Order {
    pub fn limit(pair: impl Into<String>, side: OrderSide, quantity: f64, price: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            pair: pair.into(),
            side,
            quantity,
            price,
        }
    }

    /// Quote-currency value of the order.
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// Exchange acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderAck {
    Accepted { order_id: String },
    Rejected { reason: String },
}

/// One asset balance on the account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balance {
    pub asset: String,
    pub free: f64,
    pub locked: f64,
}

impl Balance {
    pub fn total(&self) -> f64 {
        self.free + self.locked
    }
}

/// Output of evaluating one strategy against one instrument.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StrategyDecision {
    pub buy_signal: bool,
    pub sell_signal: bool,
    pub buy_price: f64,
    pub sell_price: f64,
    pub buy_size: f64,
    pub sell_size: f64,
}

impl StrategyDecision {
    /// No signal on either side, all prices and sizes zero.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn has_signal(&self) -> bool {
        self.buy_signal || self.sell_signal
    }
}

/// What happened to one side of a dispatched decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderOutcome {
    Accepted { order_id: String },
    /// The gateway declined or failed. Logged, never retried within the cycle.
    Rejected { reason: String },
    /// Trading is disabled for the instrument; nothing was posted.
    TradingInactive,
}

/// A priced and sized order together with its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReport {
    pub side: OrderSide,
    pub price: f64,
    pub size: f64,
    pub outcome: OrderOutcome,
}

/// Result of dispatching one `StrategyDecision`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderResult {
    NoSignal,
    Dispatched {
        buy: Option<OrderReport>,
        sell: Option<OrderReport>,
    },
}

impl OrderResult {
    pub fn reports(&self) -> impl Iterator<Item = &OrderReport> {
        let (buy, sell) = match self {
            OrderResult::NoSignal => (None, None),
            OrderResult::Dispatched { buy, sell } => (buy.as_ref(), sell.as_ref()),
        };
        buy.into_iter().chain(sell)
    }
}

/// Whether the bot is running against the real exchange or simulating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradingMode {
    Live,
    Paper,
}

impl std::fmt::Display for TradingMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingMode::Live => write!(f, "live"),
            TradingMode::Paper => write!(f, "paper"),
        }
    }
}

/// Round half away from zero to `decimals` places.
pub fn round_dp(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
