//! # Domain Models
//!
//! Canonical input types for finsight analytics.
//!
//! All models are strongly typed and validated at construction; invalid
//! records never enter the system. Every type carries full serde support.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Ticker`] | Validated security identifier |
//! | [`Sector`], [`Industry`] | Classification tags |
//! | [`Security`] | Reference data for one listed security |
//! | [`TradingDay`] | Calendar date of a trading session |
//! | [`DateWindow`] | Inclusive trading-day range |
//! | [`UtcDateTime`] | RFC3339 timestamp guaranteed UTC |
//! | [`PricePoint`] | Daily OHLCV observation |
//! | [`InsiderTransaction`] | Insider purchase or sale |
//! | [`FiscalPeriod`] | Reporting period (quarterly or annual) |
//! | [`FundamentalsRecord`] | Per-period fundamentals |

mod calendar;
mod fundamentals;
mod price;
mod security;
mod ticker;
mod timestamp;
mod transaction;
mod validate;

pub use calendar::{DateWindow, TradingDay};
pub use fundamentals::{FiscalPeriod, FundamentalsRecord, PeriodKind};
pub use price::PricePoint;
pub use security::{Industry, Sector, Security};
pub use ticker::Ticker;
pub use timestamp::UtcDateTime;
pub use transaction::{InsiderTransaction, TradeSide};
