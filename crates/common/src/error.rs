use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid window {window} for a series of length {len}")]
    InvalidWindow { window: usize, len: usize },

    #[error("Invalid derivative step: {0}")]
    InvalidStep(f64),

    #[error("Insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Empty candle batch")]
    EmptyInput,

    #[error("Market data unavailable: {0}")]
    DataUnavailable(String),

    /// Indicators were read before being recomputed for the current candles.
    #[error("Stale indicators: {0} not analyzed since the last ingest")]
    StaleIndicators(&'static str),

    #[error("Exchange API error: {0}")]
    Exchange(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Errors caused by short or missing upstream data. The instrument is
    /// skipped for the cycle; other instruments keep going.
    pub fn is_data_shortage(&self) -> bool {
        matches!(
            self,
            Error::EmptyInput | Error::DataUnavailable(_) | Error::InsufficientData { .. }
        )
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
