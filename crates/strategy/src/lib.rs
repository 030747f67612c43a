pub mod config;
pub mod indicators;
pub mod registry;
pub mod series;
pub mod strategies;

pub use config::{BollingerWindow, InstrumentConfig, PollingConfig, SizingConfig, TraderConfig};
pub use registry::{Evaluation, StrategyRegistry};
pub use series::{IndicatorSet, MovingAverageSet, PriceField, SeriesStore};
pub use strategies::{build_strategy, StrategyKind};

use common::{Result, StrategyDecision};

/// All strategy implementations must satisfy this trait.
///
/// Strategies are stateless: everything they read comes from the store and
/// the live price passed in, so the same inputs always give the same decision.
pub trait Strategy: Send + Sync {
    /// Configured id of this strategy.
    fn id(&self) -> u32;

    /// Human-readable name shown in logs.
    fn name(&self) -> &str;

    /// Map the analyzed series and live price to a trade decision.
    ///
    /// Fails with `StaleIndicators` if a required indicator has not been
    /// computed since the last ingest.
    fn evaluate(&self, store: &SeriesStore, current_price: f64) -> Result<StrategyDecision>;
}
