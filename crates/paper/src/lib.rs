use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use common::{
    Balance, Candle, Error, ExchangeGateway, Order, OrderAck, OrderSide, Result,
};

/// Quote assets recognised when splitting a pair symbol, longest first.
const QUOTE_ASSETS: [&str; 6] = ["USDT", "USDC", "BUSD", "USD", "EUR", "BTC"];

/// Split "BTCUSDT" into ("BTC", "USDT").
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    QUOTE_ASSETS.iter().find_map(|quote| {
        pair.strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base, *quote))
    })
}

/// Simulated exchange gateway for paper trading.
///
/// Market data comes from an upstream gateway when one is attached, otherwise
/// from fixtures loaded with `set_candles` / `update_price`. Orders never
/// leave the process: each one is accepted and settled immediately against an
/// in-memory balance ledger, or rejected when the ledger cannot cover it.
pub struct PaperGateway {
    market_data: Option<Arc<dyn ExchangeGateway>>,
    /// Free balance per asset.
    balances: Arc<RwLock<HashMap<String, f64>>>,
    /// Newest-first candles per pair.
    candles: Arc<RwLock<HashMap<String, Vec<Candle>>>>,
    /// Latest known price per pair.
    prices: Arc<RwLock<HashMap<String, f64>>>,
    /// Every order submitted, accepted or not.
    submitted: Arc<RwLock<Vec<Order>>>,
}

impl PaperGateway {
    /// Start with `quote_balance` USDT and no other holdings.
    pub fn new(quote_balance: f64) -> Self {
        info!(balance = quote_balance, "PaperGateway initialized");
        let mut balances = HashMap::new();
        balances.insert("USDT".to_string(), quote_balance);
        Self {
            market_data: None,
            balances: Arc::new(RwLock::new(balances)),
            candles: Arc::new(RwLock::new(HashMap::new())),
            prices: Arc::new(RwLock::new(HashMap::new())),
            submitted: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Read candles and tickers from `upstream` instead of local fixtures.
    pub fn with_market_data(mut self, upstream: Arc<dyn ExchangeGateway>) -> Self {
        self.market_data = Some(upstream);
        self
    }

    /// Load fixture candles for a pair, newest first.
    pub async fn set_candles(&self, pair: &str, candles: Vec<Candle>) {
        self.candles.write().await.insert(pair.to_string(), candles);
    }

    /// Update the fixture price for a pair.
    pub async fn update_price(&self, pair: &str, price: f64) {
        self.prices.write().await.insert(pair.to_string(), price);
    }

    pub async fn set_holdings(&self, asset: &str, quantity: f64) {
        self.balances.write().await.insert(asset.to_string(), quantity);
    }

    pub async fn holdings(&self, asset: &str) -> f64 {
        self.balances.read().await.get(asset).copied().unwrap_or(0.0)
    }

    pub async fn submitted_orders(&self) -> Vec<Order> {
        self.submitted.read().await.clone()
    }

    fn settle(balances: &mut HashMap<String, f64>, order: &Order) -> OrderAck {
        if !(order.price.is_finite() && order.price > 0.0)
            || !(order.quantity.is_finite() && order.quantity > 0.0)
        {
            return OrderAck::Rejected {
                reason: format!(
                    "Invalid price {} or size {}",
                    order.price, order.quantity
                ),
            };
        }
        let Some((base, quote)) = split_pair(&order.pair) else {
            return OrderAck::Rejected {
                reason: format!("Unknown product '{}'", order.pair),
            };
        };

        let (debit_asset, debit, credit_asset, credit) = match order.side {
            OrderSide::Buy => (quote, order.notional(), base, order.quantity),
            OrderSide::Sell => (base, order.quantity, quote, order.notional()),
        };

        let available = balances.get(debit_asset).copied().unwrap_or(0.0);
        if available < debit {
            return OrderAck::Rejected {
                reason: format!("Insufficient funds: need {debit} {debit_asset}, have {available}"),
            };
        }

        *balances.entry(debit_asset.to_string()).or_default() -= debit;
        *balances.entry(credit_asset.to_string()).or_default() += credit;
        OrderAck::Accepted {
            order_id: order.id.clone(),
        }
    }
}

#[async_trait]
impl ExchangeGateway for PaperGateway {
    async fn candles(
        &self,
        pair: &str,
        granularity_secs: u64,
        count: usize,
    ) -> Result<Vec<Candle>> {
        if let Some(upstream) = &self.market_data {
            return upstream.candles(pair, granularity_secs, count).await;
        }
        self.candles
            .read()
            .await
            .get(pair)
            .map(|c| c.iter().take(count).copied().collect::<Vec<_>>())
            .ok_or_else(|| Error::DataUnavailable(format!("No paper candles loaded for {pair}")))
    }

    async fn current_price(&self, pair: &str) -> Result<f64> {
        if let Some(upstream) = &self.market_data {
            return upstream.current_price(pair).await;
        }
        self.prices
            .read()
            .await
            .get(pair)
            .copied()
            .ok_or_else(|| Error::DataUnavailable(format!("No price available for {pair}")))
    }

    async fn submit_order(&self, order: &Order) -> Result<OrderAck> {
        self.submitted.write().await.push(order.clone());

        let ack = Self::settle(&mut *self.balances.write().await, order);
        debug!(
            pair = %order.pair,
            side = %order.side,
            price = order.price,
            qty = order.quantity,
            ack = ?ack,
            "Paper order settled"
        );
        Ok(ack)
    }

    async fn balances(&self) -> Result<Vec<Balance>> {
        let mut balances: Vec<Balance> = self
            .balances
            .read()
            .await
            .iter()
            .map(|(asset, &free)| Balance {
                asset: asset.clone(),
                free,
                locked: 0.0,
            })
            .collect();
        balances.sort_by(|a, b| a.asset.cmp(&b.asset));
        Ok(balances)
    }
}
