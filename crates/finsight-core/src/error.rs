use thiserror::Error;

/// Validation errors raised at the domain boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("ticker cannot be empty")]
    EmptyTicker,
    #[error("ticker length {len} exceeds max {max}")]
    TickerTooLong { len: usize, max: usize },
    #[error("ticker must start with an ASCII letter: '{ch}'")]
    TickerInvalidStart { ch: char },
    #[error("ticker contains invalid character '{ch}' at index {index}")]
    TickerInvalidChar { ch: char, index: usize },

    #[error("{kind} tag cannot be empty")]
    EmptyTag { kind: &'static str },
    #[error("{kind} tag exceeds {max} characters")]
    TagTooLong { kind: &'static str, max: usize },

    #[error("insider name cannot be empty")]
    EmptyInsider,

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("invalid trading day '{value}', expected YYYY-MM-DD")]
    InvalidTradingDay { value: String },
    #[error("window start {from} is after window end {to}")]
    WindowInverted { from: String, to: String },

    #[error("field '{field}' must be finite")]
    NonFiniteValue { field: &'static str },
    #[error("field '{field}' must be positive")]
    NonPositiveValue { field: &'static str },
    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },

    #[error("price high must be >= low")]
    InvalidPriceRange,
    #[error("price open/close must be within high/low range")]
    InvalidPriceBounds,

    #[error("fiscal quarter must be 1..=4, got {quarter}")]
    InvalidFiscalQuarter { quarter: u8 },
    #[error("calendar date out of range for year {year}")]
    YearOutOfRange { year: i32 },
}
