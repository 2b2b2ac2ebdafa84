use std::fmt::{Display, Formatter};

use serde::de::Error as DeError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::Date;

use crate::ValidationError;

const DAY_FORMAT: &'static [BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day]");

/// Calendar date of one trading session, serialized as `YYYY-MM-DD`.
///
/// The grid of observed trading days is data-driven; no exchange holiday
/// calendar is assumed anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TradingDay(Date);

impl TradingDay {
    pub fn new(date: Date) -> Self {
        Self(date)
    }

    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        Date::parse(input, DAY_FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidTradingDay {
                value: input.to_owned(),
            })
    }

    pub fn date(&self) -> Date {
        self.0
    }

    /// The following calendar day, `None` at the calendar bound.
    pub fn next(&self) -> Option<Self> {
        self.0.next_day().map(Self)
    }

    pub fn format(&self) -> String {
        self.0
            .format(DAY_FORMAT)
            .expect("trading day must be formattable")
    }
}

impl Display for TradingDay {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.format())
    }
}

impl Serialize for TradingDay {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for TradingDay {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Self::parse(&value).map_err(D::Error::custom)
    }
}

/// Inclusive `[from, to]` range of trading days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub from: TradingDay,
    pub to: TradingDay,
}

impl DateWindow {
    pub fn new(from: TradingDay, to: TradingDay) -> Result<Self, ValidationError> {
        if from > to {
            return Err(ValidationError::WindowInverted {
                from: from.format(),
                to: to.format(),
            });
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, day: TradingDay) -> bool {
        self.from <= day && day <= self.to
    }
}

impl Display for DateWindow {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.from, self.to)
    }
}
