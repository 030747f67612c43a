use std::sync::Arc;

use tracing::{error, info, warn};

use common::{
    round_dp, ExchangeGateway, Order, OrderAck, OrderOutcome, OrderReport, OrderResult, OrderSide,
    StrategyDecision,
};

/// Turns strategy decisions into limit orders and submits them.
///
/// This is the ONLY component that calls `ExchangeGateway::submit_order`.
/// Gateway failures are reported inside the `OrderResult`, never returned as
/// errors, and never retried within a cycle.
pub struct OrderDispatcher {
    client: Arc<dyn ExchangeGateway>,
    price_margin: f64,
}

impl OrderDispatcher {
    /// Bids stay at least this far below (asks above) the live price.
    pub const DEFAULT_PRICE_MARGIN: f64 = 0.10;

    pub fn new(client: Arc<dyn ExchangeGateway>, price_margin: f64) -> Self {
        Self {
            client,
            price_margin,
        }
    }

    /// Limit price for a buy: never closer than the margin under the live price.
    pub fn buy_price(&self, decision_price: f64, current_price: f64) -> f64 {
        round_dp(
            (current_price - self.price_margin).min(round_dp(decision_price, 2)),
            2,
        )
    }

    /// Limit price for a sell: never closer than the margin over the live price.
    pub fn sell_price(&self, decision_price: f64, current_price: f64) -> f64 {
        round_dp(
            (current_price + self.price_margin).max(round_dp(decision_price, 2)),
            2,
        )
    }

    /// Price, size and (when `trading_enabled`) submit both sides of a decision.
    /// Buy and sell are handled independently and may both be posted.
    pub async fn dispatch(
        &self,
        decision: &StrategyDecision,
        pair: &str,
        current_price: f64,
        trading_enabled: bool,
    ) -> OrderResult {
        if !decision.has_signal() {
            info!(pair = %pair, "No trade signals calculated");
            return OrderResult::NoSignal;
        }

        let buy = if decision.buy_signal {
            let price = self.buy_price(decision.buy_price, current_price);
            let size = round_dp(decision.buy_size, 6);
            Some(self.place(pair, OrderSide::Buy, price, size, trading_enabled).await)
        } else {
            None
        };

        let sell = if decision.sell_signal {
            let price = self.sell_price(decision.sell_price, current_price);
            let size = round_dp(decision.sell_size, 6);
            Some(self.place(pair, OrderSide::Sell, price, size, trading_enabled).await)
        } else {
            None
        };

        OrderResult::Dispatched { buy, sell }
    }

    async fn place(
        &self,
        pair: &str,
        side: OrderSide,
        price: f64,
        size: f64,
        trading_enabled: bool,
    ) -> OrderReport {
        info!(pair = %pair, side = %side, price, size, "Order computed");

        let outcome = if !trading_enabled {
            warn!(pair = %pair, side = %side, "Trading is inactive, order not posted");
            OrderOutcome::TradingInactive
        } else {
            let order = Order::limit(pair, side, size, price);
            match self.client.submit_order(&order).await {
                Ok(OrderAck::Accepted { order_id }) => {
                    info!(pair = %pair, side = %side, order_id = %order_id, "Order accepted");
                    OrderOutcome::Accepted { order_id }
                }
                Ok(OrderAck::Rejected { reason }) => {
                    warn!(pair = %pair, side = %side, reason = %reason, "Order rejected");
                    OrderOutcome::Rejected { reason }
                }
                Err(e) => {
                    error!(pair = %pair, side = %side, error = %e, "Order submission failed");
                    OrderOutcome::Rejected {
                        reason: e.to_string(),
                    }
                }
            }
        };

        OrderReport {
            side,
            price,
            size,
            outcome,
        }
    }
}
