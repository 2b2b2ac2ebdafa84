//! Core domain contracts for finsight.
//!
//! This crate contains:
//! - Validated input records (price points, insider transactions,
//!   fundamentals) and their identifier newtypes
//! - The trading calendar and UTC timestamp types
//! - The defined-or-undefined numeric vocabulary shared by every derived
//!   artifact

pub mod domain;
pub mod error;
pub mod measure;

pub use domain::{
    DateWindow, FiscalPeriod, FundamentalsRecord, Industry, InsiderTransaction, PeriodKind,
    PricePoint, Sector, Security, Ticker, TradeSide, TradingDay, UtcDateTime,
};
pub use error::ValidationError;
pub use measure::{Measure, UndefinedReason};
