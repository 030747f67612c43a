use crate::{Error, Result, TradingMode};

/// Process-level configuration loaded from environment variables at startup.
///
/// Strategy and polling parameters live in the TOML file pointed to by
/// `trader_config_path`; only credentials and the trading mode come from here.
#[derive(Debug, Clone)]
pub struct Config {
    // Exchange credentials (live mode only)
    pub binance_api_key: String,
    pub binance_secret: String,

    // Trading
    pub trading_mode: TradingMode,
    pub paper_quote_balance: f64,

    // Trader config file path
    pub trader_config_path: String,
}

impl Config {
    /// Load configuration from environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv(); // ignore error if .env not present
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                Error::Config(format!(
                    "Required environment variable '{key}' is not set. Check your .env file."
                ))
            })
        };

        let trading_mode = match required("TRADING_MODE")?.to_lowercase().as_str() {
            "paper" => TradingMode::Paper,
            "live" => TradingMode::Live,
            other => {
                return Err(Error::Config(format!(
                    "TRADING_MODE must be 'paper' or 'live', got: '{other}'"
                )))
            }
        };

        // Paper trading reads public market data only.
        let (binance_api_key, binance_secret) = match trading_mode {
            TradingMode::Live => (required("BINANCE_API_KEY")?, required("BINANCE_SECRET")?),
            TradingMode::Paper => (
                lookup("BINANCE_API_KEY").unwrap_or_default(),
                lookup("BINANCE_SECRET").unwrap_or_default(),
            ),
        };

        let paper_quote_balance = match lookup("PAPER_QUOTE_BALANCE") {
            Some(raw) => raw.trim().parse::<f64>().map_err(|_| {
                Error::Config(format!("PAPER_QUOTE_BALANCE is not a number: '{raw}'"))
            })?,
            None => 10_000.0,
        };

        Ok(Config {
            binance_api_key,
            binance_secret,
            trading_mode,
            paper_quote_balance,
            trader_config_path: lookup("TRADER_CONFIG_PATH")
                .unwrap_or_else(|| "config/trader.toml".to_string()),
        })
    }
}
