use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::domain::Ticker;
use crate::ValidationError;

const MAX_TAG_LEN: usize = 48;

fn parse_tag(kind: &'static str, input: &str) -> Result<String, ValidationError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::EmptyTag { kind });
    }
    if trimmed.chars().count() > MAX_TAG_LEN {
        return Err(ValidationError::TagTooLong {
            kind,
            max: MAX_TAG_LEN,
        });
    }
    Ok(trimmed.to_owned())
}

/// Sector classification tag, e.g. `Information Technology`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Sector(String);

impl Sector {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_tag("sector", input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Sector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Sector {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Sector {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Sector> for String {
    fn from(value: Sector) -> Self {
        value.0
    }
}

/// Industry classification tag, one level below [`Sector`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Industry(String);

impl Industry {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        parse_tag("industry", input).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Industry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Industry {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Industry {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Industry> for String {
    fn from(value: Industry) -> Self {
        value.0
    }
}

/// Immutable reference data for one listed security.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Security {
    pub ticker: Ticker,
    pub sector: Sector,
    pub industry: Industry,
}

impl Security {
    pub fn new(ticker: Ticker, sector: Sector, industry: Industry) -> Self {
        Self {
            ticker,
            sector,
            industry,
        }
    }
}
