use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::domain::validate::{validate_finite, validate_non_negative, validate_positive};
use crate::domain::{Ticker, TradingDay};
use crate::ValidationError;

/// Reporting cadence of a fiscal period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    Quarterly,
    Annual,
}

impl Display for PeriodKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Quarterly => f.write_str("quarterly"),
            Self::Annual => f.write_str("annual"),
        }
    }
}

/// One reporting period, identified by its end date.
///
/// Totally ordered by end date, so a security's records form a
/// well-defined chronology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FiscalPeriod {
    pub end: TradingDay,
    pub kind: PeriodKind,
}

impl FiscalPeriod {
    /// Calendar quarter ending on the conventional quarter-end date.
    pub fn quarterly(year: i32, quarter: u8) -> Result<Self, ValidationError> {
        let (month, day) = match quarter {
            1 => (Month::March, 31),
            2 => (Month::June, 30),
            3 => (Month::September, 30),
            4 => (Month::December, 31),
            _ => return Err(ValidationError::InvalidFiscalQuarter { quarter }),
        };

        let end = Date::from_calendar_date(year, month, day)
            .map_err(|_| ValidationError::YearOutOfRange { year })?;

        Ok(Self {
            end: TradingDay::new(end),
            kind: PeriodKind::Quarterly,
        })
    }

    /// Calendar year ending December 31.
    pub fn annual(year: i32) -> Result<Self, ValidationError> {
        let end = Date::from_calendar_date(year, Month::December, 31)
            .map_err(|_| ValidationError::YearOutOfRange { year })?;

        Ok(Self {
            end: TradingDay::new(end),
            kind: PeriodKind::Annual,
        })
    }

    /// A period ending on an arbitrary date, for non-calendar fiscal years.
    pub fn ending(end: TradingDay, kind: PeriodKind) -> Self {
        Self { end, kind }
    }
}

impl Display for FiscalPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.end, self.kind)
    }
}

/// Fundamentals reported for one security and period.
///
/// Earnings and net income may be negative; revenue may be zero but never
/// negative; the period-end share price is strictly positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FundamentalsRecord {
    pub ticker: Ticker,
    pub period: FiscalPeriod,
    pub eps: f64,
    pub revenue: f64,
    pub net_income: f64,
    pub price: f64,
}

impl FundamentalsRecord {
    pub fn new(
        ticker: Ticker,
        period: FiscalPeriod,
        eps: f64,
        revenue: f64,
        net_income: f64,
        price: f64,
    ) -> Result<Self, ValidationError> {
        validate_finite("eps", eps)?;
        validate_non_negative("revenue", revenue)?;
        validate_finite("net_income", net_income)?;
        validate_positive("price", price)?;

        Ok(Self {
            ticker,
            period,
            eps,
            revenue,
            net_income,
            price,
        })
    }
}
