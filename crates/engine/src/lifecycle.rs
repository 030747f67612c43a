use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use common::{Candle, Error, ExchangeGateway, OrderResult, Result};
use strategy::{
    Evaluation, InstrumentConfig, PriceField, SeriesStore, StrategyRegistry, TraderConfig,
};

use crate::dispatcher::OrderDispatcher;

/// What one instrument produced in one cycle.
#[derive(Debug, Clone)]
pub struct InstrumentReport {
    pub pair: String,
    pub current_price: f64,
    /// False when disabled in config or when the candle batch came back short.
    pub trading_enabled: bool,
    /// Latest first and second derivative of close, when the batch has two or more candles.
    pub close_trend: Option<(f64, f64)>,
    pub orders: Vec<(Evaluation, OrderResult)>,
}

/// Outcome of one polling cycle across all instruments.
#[derive(Debug, Default)]
pub struct CycleReport {
    pub completed: Vec<InstrumentReport>,
    pub failed: Vec<(String, Error)>,
}

impl CycleReport {
    /// A cycle fails only when no instrument made it through the pipeline.
    pub fn is_failure(&self) -> bool {
        self.completed.is_empty() && !self.failed.is_empty()
    }
}

/// The polling loop: one full fetch → ingest → analyze → evaluate → dispatch
/// pass per instrument per cycle, instruments processed in config order.
pub struct Trader {
    config: TraderConfig,
    client: Arc<dyn ExchangeGateway>,
    registry: StrategyRegistry,
    dispatcher: OrderDispatcher,
}

impl Trader {
    pub fn new(config: TraderConfig, client: Arc<dyn ExchangeGateway>) -> Self {
        let registry = StrategyRegistry::from_config(&config.active_strategies, config.sizing);
        let dispatcher = OrderDispatcher::new(client.clone(), config.price_margin);
        Self {
            config,
            client,
            registry,
            dispatcher,
        }
    }

    /// Run cycles until `shutdown` resolves, `max_iterations` is reached, or
    /// `max_failed_cycles` consecutive cycles fail.
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let polling = self.config.polling;
        let mut failed_cycles = 0u32;
        let mut iteration = 0u64;

        info!(
            instruments = self.config.instruments.len(),
            strategies = self.registry.len(),
            interval_secs = polling.interval_secs,
            "Trader running"
        );

        loop {
            iteration += 1;
            let report = self.run_cycle(iteration).await;

            let pause = if report.is_failure() {
                failed_cycles += 1;
                error!(
                    iteration,
                    failed_cycles,
                    limit = polling.max_failed_cycles,
                    "Cycle failed for every instrument"
                );
                if failed_cycles >= polling.max_failed_cycles {
                    return Err(Error::Other(format!(
                        "Exceeded failure limit: {failed_cycles} consecutive failed cycles"
                    )));
                }
                Duration::from_secs(polling.failure_backoff_secs)
            } else {
                failed_cycles = 0;
                Duration::from_secs(polling.interval_secs)
            };

            if polling.max_iterations.is_some_and(|max| iteration >= max) {
                info!(iteration, "Reached iteration limit");
                return Ok(());
            }

            tokio::select! {
                _ = tokio::time::sleep(pause) => {}
                _ = &mut shutdown => {
                    info!("Shutdown requested, trader stopping");
                    return Ok(());
                }
            }
        }
    }

    /// Run the pipeline once for every configured instrument.
    pub async fn run_cycle(&self, iteration: u64) -> CycleReport {
        info!(iteration, "Starting cycle");
        let mut report = CycleReport::default();

        for instrument in &self.config.instruments {
            match self.run_instrument(instrument).await {
                Ok(r) => report.completed.push(r),
                Err(e) => {
                    if e.is_data_shortage() {
                        warn!(pair = %instrument.pair, error = %e, "Skipping instrument this cycle");
                    } else {
                        error!(pair = %instrument.pair, error = %e, "Instrument pipeline aborted");
                    }
                    report.failed.push((instrument.pair.clone(), e));
                }
            }
        }
        report
    }

    async fn run_instrument(&self, instrument: &InstrumentConfig) -> Result<InstrumentReport> {
        let pair = instrument.pair.as_str();
        info!(pair = %pair, "Analyzing");

        let current_price = self.client.current_price(pair).await?;
        info!(pair = %pair, price = current_price, "Current price");

        let (candles, complete) = self.fetch_candles(pair).await?;

        let mut store = SeriesStore::new(pair);
        store.ingest(&candles)?;
        store.set_current_price(current_price);

        let cfg = &self.config;
        let bollinger_window = cfg.bollinger.resolve(&cfg.sma_windows)?;
        store.analyze_sma(&cfg.sma_windows, bollinger_window, cfg.bollinger_std_dev)?;
        if !cfg.ema_windows.is_empty() {
            store.analyze_ema(&cfg.ema_windows)?;
        }

        let close_trend = store
            .price_derivatives(PriceField::Close)
            .ok()
            .and_then(|d| Some((*d.first.last()?, *d.second.last()?)));
        if let Some((slope, curvature)) = close_trend {
            debug!(pair = %pair, slope, curvature, "Close derivatives");
        }

        let evaluations = self.registry.evaluate_all(&store)?;
        let trading_enabled = instrument.trading_enabled && complete;

        let mut orders = Vec::with_capacity(evaluations.len());
        for evaluation in evaluations {
            info!(pair = %pair, strategy = %evaluation.strategy, "Dispatching decision");
            let result = self
                .dispatcher
                .dispatch(&evaluation.decision, pair, current_price, trading_enabled)
                .await;
            orders.push((evaluation, result));
        }

        Ok(InstrumentReport {
            pair: pair.to_string(),
            current_price,
            trading_enabled,
            close_trend,
            orders,
        })
    }

    /// Fetch a full candle window, retrying a bounded number of times.
    ///
    /// Returns the batch and whether it was complete. A short batch is still
    /// usable for analysis, but trading is disabled for the cycle.
    async fn fetch_candles(&self, pair: &str) -> Result<(Vec<Candle>, bool)> {
        let polling = &self.config.polling;
        let wanted = polling.candle_window;
        let attempts = polling.candle_retries.max(1);
        let mut best: Vec<Candle> = Vec::new();
        let mut last_error = None;

        for attempt in 1..=attempts {
            match self
                .client
                .candles(pair, polling.granularity_secs, wanted)
                .await
            {
                Ok(candles) if candles.len() >= wanted => return Ok((candles, true)),
                Ok(candles) => {
                    warn!(pair = %pair, attempt, received = candles.len(), wanted, "Short candle batch");
                    if candles.len() > best.len() {
                        best = candles;
                    }
                }
                Err(e) => {
                    warn!(pair = %pair, attempt, error = %e, "Candle request failed");
                    last_error = Some(e);
                }
            }
            if attempt < attempts {
                tokio::time::sleep(Duration::from_millis(polling.candle_retry_delay_ms)).await;
            }
        }

        if best.is_empty() {
            return Err(match last_error {
                Some(e) => Error::DataUnavailable(format!("{pair}: {e}")),
                None => Error::EmptyInput,
            });
        }
        error!(
            pair = %pair,
            received = best.len(),
            wanted,
            "Received data of incorrect length, inactivating trades"
        );
        Ok((best, false))
    }
}

/// Log every balance with its USDT value and the portfolio total.
/// Assets without a USDT market are logged without a value.
pub async fn report_portfolio(client: &dyn ExchangeGateway) -> Result<f64> {
    let balances = client.balances().await?;
    let mut total = 0.0;

    for balance in &balances {
        let price = if balance.asset == "USDT" {
            Some(1.0)
        } else {
            client
                .current_price(&format!("{}USDT", balance.asset))
                .await
                .ok()
        };
        match price {
            Some(p) => {
                let value = p * balance.total();
                total += value;
                info!(
                    asset = %balance.asset,
                    free = balance.free,
                    locked = balance.locked,
                    price = p,
                    value_usdt = value,
                    "Wallet"
                );
            }
            None => warn!(asset = %balance.asset, total = balance.total(), "Wallet has no USDT price"),
        }
    }

    info!(total_usdt = total, "Portfolio value");
    Ok(total)
}
