use async_trait::async_trait;

use crate::{Balance, Candle, Order, OrderAck, Result};

/// Abstraction over the exchange connection.
///
/// `BinanceClient` implements this for live trading.
/// `PaperGateway` implements this for simulation.
///
/// Only the `OrderDispatcher` in `crates/engine` submits orders; the
/// strategy layer never sees a gateway.
#[async_trait]
pub trait ExchangeGateway: Send + Sync {
    /// Fetch up to `count` candles of `granularity_secs` width, newest first.
    async fn candles(&self, pair: &str, granularity_secs: u64, count: usize)
        -> Result<Vec<Candle>>;

    /// Get the latest traded price for a trading pair.
    async fn current_price(&self, pair: &str) -> Result<f64>;

    /// Submit a limit order. An exchange-side refusal is an `Ok(OrderAck::Rejected)`;
    /// `Err` is reserved for transport and decoding failures.
    async fn submit_order(&self, order: &Order) -> Result<OrderAck>;

    /// Account balances, used for the startup portfolio report.
    async fn balances(&self) -> Result<Vec<Balance>>;
}
