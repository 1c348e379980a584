//! Domain error types.
//!
//! [`TurtleError`] covers run-level failures (configuration, adapters,
//! report delivery). [`TickerError`] covers a single ticker's evaluation and
//! never aborts a batch.

use chrono::NaiveDate;

use crate::domain::indicator::IndicatorType;

/// Top-level error type for turtlescan.
#[derive(Debug, thiserror::Error)]
pub enum TurtleError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {ticker}")]
    NoData { ticker: String },

    #[error("ticker universe is empty")]
    EmptyUniverse,

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TurtleError {
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            TurtleError::ConfigParse { .. }
                | TurtleError::ConfigMissing { .. }
                | TurtleError::ConfigInvalid { .. }
        )
    }
}

impl From<&TurtleError> for std::process::ExitCode {
    fn from(err: &TurtleError) -> Self {
        let code: u8 = match err {
            TurtleError::Io(_) => 1,
            TurtleError::ConfigParse { .. }
            | TurtleError::ConfigMissing { .. }
            | TurtleError::ConfigInvalid { .. } => 2,
            TurtleError::Data { .. } => 3,
            TurtleError::Report { .. } => 4,
            TurtleError::NoData { .. } | TurtleError::EmptyUniverse => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Coarse classification of a per-ticker failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailureKind {
    InsufficientData,
    StaleData,
    ProviderError,
    ComputeError,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::InsufficientData => "INSUFFICIENT_DATA",
            FailureKind::StaleData => "STALE_DATA",
            FailureKind::ProviderError => "PROVIDER_ERROR",
            FailureKind::ComputeError => "ERROR",
        };
        f.write_str(label)
    }
}

/// Why a single ticker produced no decision.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TickerError {
    #[error("insufficient data: have {bars} bars, need {minimum}")]
    TooFewBars { bars: usize, minimum: usize },

    #[error("{indicator} undefined at {date}")]
    UndefinedIndicator {
        indicator: IndicatorType,
        date: NaiveDate,
    },

    #[error("invalid bar on {date}: {reason}")]
    InvalidBar { date: NaiveDate, reason: String },

    #[error("stale data: last bar {last}, as of {as_of}")]
    StaleData { last: NaiveDate, as_of: NaiveDate },

    #[error("provider error: {0}")]
    Provider(String),

    #[error("computation error: {0}")]
    Compute(String),
}

impl TickerError {
    pub fn kind(&self) -> FailureKind {
        match self {
            TickerError::TooFewBars { .. }
            | TickerError::UndefinedIndicator { .. }
            | TickerError::InvalidBar { .. } => FailureKind::InsufficientData,
            TickerError::StaleData { .. } => FailureKind::StaleData,
            TickerError::Provider(_) => FailureKind::ProviderError,
            TickerError::Compute(_) => FailureKind::ComputeError,
        }
    }
}
