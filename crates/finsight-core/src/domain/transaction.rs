use serde::{Deserialize, Serialize};

use crate::domain::validate::validate_positive;
use crate::domain::{Ticker, UtcDateTime};
use crate::ValidationError;

/// Direction of an insider transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

/// Insider purchase or sale reported for one security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderTransaction {
    pub ticker: Ticker,
    pub insider: String,
    pub at: UtcDateTime,
    pub side: TradeSide,
    pub quantity: f64,
    pub price: f64,
}

impl InsiderTransaction {
    pub fn new(
        ticker: Ticker,
        insider: impl Into<String>,
        at: UtcDateTime,
        side: TradeSide,
        quantity: f64,
        price: f64,
    ) -> Result<Self, ValidationError> {
        let insider = insider.into();
        let insider = insider.trim();
        if insider.is_empty() {
            return Err(ValidationError::EmptyInsider);
        }

        validate_positive("quantity", quantity)?;
        validate_positive("price", price)?;

        Ok(Self {
            ticker,
            insider: insider.to_owned(),
            at,
            side,
            quantity,
            price,
        })
    }

    /// Transaction value: quantity times price.
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}
