use thiserror::Error;

use finsight_core::{Ticker, ValidationError};

use crate::config::ConfigError;

/// What exactly is wrong with a rejected input batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SeriesDefect {
    #[error("series is empty")]
    Empty,
    #[error("days must be strictly increasing: {day} at index {index}")]
    OutOfOrder { index: usize, day: String },
    #[error("duplicate day {day} at index {index}")]
    DuplicateDay { index: usize, day: String },
    #[error("appended day {day} is not after the stored series end {end}")]
    NotAfterExisting { day: String, end: String },
    #[error("ticker is not present in the store")]
    UnknownTicker,
    #[error("record at index {index} belongs to '{found}'")]
    TickerMismatch { index: usize, found: Ticker },
    #[error("invalid point at index {index}: {source}")]
    InvalidPoint {
        index: usize,
        source: ValidationError,
    },
    #[error("invalid record at index {index}: {source}")]
    InvalidRecord {
        index: usize,
        source: ValidationError,
    },
    #[error("duplicate fiscal period ending {period} at index {index}")]
    DuplicatePeriod { index: usize, period: String },
    #[error("fiscal periods must be strictly increasing: {period} at index {index}")]
    PeriodOutOfOrder { index: usize, period: String },
    #[error("transaction at {at} is earlier than the log tail {tail}")]
    TransactionOutOfOrder { at: String, tail: String },
}

/// Errors surfaced by the analytics layer.
///
/// Statistical shortfalls inside an otherwise valid computation are not
/// errors; they are embedded as `Measure::Undefined` entries so batch
/// results stay partial instead of failing wholesale.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AnalyticsError {
    #[error("malformed series for '{ticker}': {defect}")]
    MalformedSeries { ticker: Ticker, defect: SeriesDefect },

    #[error(transparent)]
    Configuration(#[from] ConfigError),

    #[error("insufficient history for '{ticker}': required {required} trailing points, observed {observed}")]
    InsufficientHistory {
        ticker: Ticker,
        required: usize,
        observed: usize,
    },
}

impl AnalyticsError {
    /// Stable machine-readable discriminant, used as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MalformedSeries { .. } => "malformed_series",
            Self::Configuration(_) => "configuration",
            Self::InsufficientHistory { .. } => "insufficient_history",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_defect_in_message() {
        let err = AnalyticsError::MalformedSeries {
            ticker: Ticker::parse("ACME").expect("ticker must parse"),
            defect: SeriesDefect::DuplicateDay {
                index: 3,
                day: String::from("2024-01-05"),
            },
        };

        let message = err.to_string();
        assert!(message.contains("ACME"), "message was: {message}");
        assert!(message.contains("2024-01-05"), "message was: {message}");
        assert_eq!(err.code(), "malformed_series");
    }
}
