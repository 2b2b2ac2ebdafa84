//! Defined-or-undefined numeric values.
//!
//! Every derived analytic carries its value as a [`Measure`] so "no value"
//! is an explicit, typed outcome with a reason. NaN never stands in for
//! missing data anywhere in the contract.

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

/// A derived numeric value that is either present or undefined for a
/// stated reason.
///
/// `Defined` must only ever wrap a finite value; the engines guarantee
/// this by guarding every division and emitting a reason instead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Measure {
    Defined(f64),
    Undefined(UndefinedReason),
}

impl Measure {
    pub fn defined(value: f64) -> Self {
        Self::Defined(value)
    }

    pub fn undefined(reason: UndefinedReason) -> Self {
        Self::Undefined(reason)
    }

    pub fn is_defined(&self) -> bool {
        matches!(self, Self::Defined(_))
    }

    /// The wrapped value, `None` when undefined.
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(value) => Some(*value),
            Self::Undefined(_) => None,
        }
    }

    /// The reason for absence, `None` when defined.
    pub fn reason(&self) -> Option<UndefinedReason> {
        match self {
            Self::Defined(_) => None,
            Self::Undefined(reason) => Some(*reason),
        }
    }
}

impl Display for Measure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Defined(value) => write!(f, "{value}"),
            Self::Undefined(reason) => write!(f, "undefined ({reason})"),
        }
    }
}

/// Why a derived value could not be computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum UndefinedReason {
    /// Fewer observations than the computation requires.
    InsufficientData { required: usize, observed: usize },
    /// At least one input series is constant over the overlap.
    ZeroVariance,
    /// Earnings are zero or negative, so the ratio has no meaning.
    NonPositiveEarnings,
    /// Revenue is zero, so the denominator vanishes.
    ZeroRevenue,
    /// The first reporting period has nothing to grow from.
    NoPriorPeriod,
}

impl Display for UndefinedReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientData { required, observed } => {
                write!(f, "insufficient data: required {required}, observed {observed}")
            }
            Self::ZeroVariance => f.write_str("zero variance"),
            Self::NonPositiveEarnings => f.write_str("non-positive earnings"),
            Self::ZeroRevenue => f.write_str("zero revenue"),
            Self::NoPriorPeriod => f.write_str("no prior period"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposes_value_and_reason() {
        let defined = Measure::defined(0.5);
        assert!(defined.is_defined());
        assert_eq!(defined.value(), Some(0.5));
        assert_eq!(defined.reason(), None);

        let undefined = Measure::undefined(UndefinedReason::ZeroVariance);
        assert!(!undefined.is_defined());
        assert_eq!(undefined.value(), None);
        assert_eq!(undefined.reason(), Some(UndefinedReason::ZeroVariance));
    }

    #[test]
    fn serializes_with_status_tag() {
        let defined = serde_json::to_value(Measure::defined(1.0)).expect("must serialize");
        assert_eq!(defined["status"], "defined");
        assert_eq!(defined["value"], 1.0);

        let undefined = serde_json::to_value(Measure::undefined(UndefinedReason::InsufficientData {
            required: 2,
            observed: 0,
        }))
        .expect("must serialize");
        assert_eq!(undefined["status"], "undefined");
        assert_eq!(undefined["value"]["reason"], "insufficient_data");
        assert_eq!(undefined["value"]["required"], 2);
    }
}
