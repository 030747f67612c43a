use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use common::{Config, ExchangeGateway, TradingMode};
use engine::{report_portfolio, BinanceClient, Trader};
use paper::PaperGateway;
use strategy::TraderConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── Logging ──────────────────────────────────────────────────────────────
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Config ────────────────────────────────────────────────────────────────
    let cfg = Config::from_env().context("Failed to load environment config")?;
    info!(mode = %cfg.trading_mode, "Candlebot starting");

    let trader_cfg = TraderConfig::load(&cfg.trader_config_path)?;
    info!(
        path = %cfg.trader_config_path,
        instruments = trader_cfg.instruments.len(),
        strategies = ?trader_cfg.active_strategies,
        "Trader config loaded"
    );

    // ── Exchange gateway (chosen by TRADING_MODE) ────────────────────────────
    let binance = BinanceClient::new(&cfg.binance_api_key, &cfg.binance_secret)?;
    let gateway: Arc<dyn ExchangeGateway> = match cfg.trading_mode {
        TradingMode::Live => {
            info!("Live trading mode, orders go to Binance");
            Arc::new(binance)
        }
        TradingMode::Paper => {
            info!(
                balance = cfg.paper_quote_balance,
                "Paper trading mode, live market data with simulated fills"
            );
            Arc::new(PaperGateway::new(cfg.paper_quote_balance).with_market_data(Arc::new(binance)))
        }
    };

    if let Err(e) = report_portfolio(gateway.as_ref()).await {
        warn!(error = %e, "Could not read account balances");
    }

    // ── Trader loop ───────────────────────────────────────────────────────────
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    };
    Trader::new(trader_cfg, gateway).run(shutdown).await?;

    info!("Candlebot stopped");
    Ok(())
}
