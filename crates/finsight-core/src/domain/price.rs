use serde::{Deserialize, Serialize};

use crate::domain::validate::validate_positive;
use crate::domain::TradingDay;
use crate::ValidationError;

/// Daily OHLCV observation for one security.
///
/// Prices are strictly positive; a zero volume is legal (halted or
/// untraded sessions) and is not the same thing as a missing day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub day: TradingDay,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl PricePoint {
    pub fn new(
        day: TradingDay,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Result<Self, ValidationError> {
        validate_positive("open", open)?;
        validate_positive("high", high)?;
        validate_positive("low", low)?;
        validate_positive("close", close)?;

        if high < low {
            return Err(ValidationError::InvalidPriceRange);
        }

        if open < low || open > high || close < low || close > high {
            return Err(ValidationError::InvalidPriceBounds);
        }

        Ok(Self {
            day,
            open,
            high,
            low,
            close,
            volume,
        })
    }
}
