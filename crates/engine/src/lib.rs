pub mod binance;
pub mod dispatcher;
pub mod lifecycle;

pub use binance::BinanceClient;
pub use dispatcher::OrderDispatcher;
pub use lifecycle::{report_portfolio, CycleReport, InstrumentReport, Trader};
