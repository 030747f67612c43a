use tracing::{debug, info};

use common::{Error, Result, StrategyDecision};

use crate::config::SizingConfig;
use crate::series::SeriesStore;
use crate::strategies::build_strategy;
use crate::Strategy;

/// One strategy's decision for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    pub strategy_id: u32,
    pub strategy: String,
    pub decision: StrategyDecision,
}

/// Holds the active strategies and evaluates them, in configured order,
/// against an analyzed `SeriesStore`. Decisions are never merged or netted.
pub struct StrategyRegistry {
    strategies: Vec<Box<dyn Strategy>>,
}

impl StrategyRegistry {
    /// Build one strategy per configured id. Unknown ids become no-ops.
    pub fn from_config(active: &[u32], sizing: SizingConfig) -> Self {
        let strategies = active
            .iter()
            .map(|&id| {
                let strategy = build_strategy(id, sizing);
                info!(id, name = %strategy.name(), "Registered strategy");
                strategy
            })
            .collect();
        Self { strategies }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Evaluate every active strategy against `store` at its current price.
    ///
    /// Any strategy error aborts the whole evaluation for this instrument.
    pub fn evaluate_all(&self, store: &SeriesStore) -> Result<Vec<Evaluation>> {
        let price = store.current_price().ok_or_else(|| {
            Error::DataUnavailable(format!("no ticker price for {}", store.pair()))
        })?;

        self.strategies
            .iter()
            .map(|s| {
                let decision = s.evaluate(store, price)?;
                debug!(
                    pair = %store.pair(),
                    strategy = %s.name(),
                    buy = decision.buy_signal,
                    sell = decision.sell_signal,
                    "Strategy evaluated"
                );
                Ok(Evaluation {
                    strategy_id: s.id(),
                    strategy: s.name().to_string(),
                    decision,
                })
            })
            .collect()
    }
}
