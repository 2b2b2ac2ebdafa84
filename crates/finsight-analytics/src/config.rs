//! Engine configuration with validated thresholds.
//!
//! Configuration problems are fatal and rejected before any computation
//! starts; every engine constructor runs `validate` on the config it is
//! handed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use finsight_core::Ticker;

/// Rejected configuration values.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("min_overlap must be at least {min}, got {got}")]
    MinOverlapTooSmall { min: usize, got: usize },
    #[error("baseline_window must be at least {min} periods, got {got}")]
    BaselineWindowTooSmall { min: usize, got: usize },
    #[error("field '{field}' must be positive and finite, got {value}")]
    NonPositiveThreshold { field: &'static str, value: f64 },
    #[error("watch_sigma {watch} must not exceed flag_sigma {flag}")]
    SigmaOrderInverted { watch: f64, flag: f64 },
    #[error("cluster_window_days must be at least 1")]
    ZeroClusterWindow,
    #[error("cluster_threshold must be at least 1")]
    ZeroClusterThreshold,
    #[error("market-cap weighting requires at least one capitalization")]
    EmptyCapTable,
    #[error("weight for '{ticker}' must be positive and finite, got {value}")]
    InvalidWeight { ticker: Ticker, value: f64 },
    #[error("holdings weights are empty")]
    EmptyHoldings,
    #[error("holdings weights sum to {total}, which is not positive and finite")]
    InvalidWeightTotal { total: f64 },
    #[error("rolling_window must be at least {min} periods, got {got}")]
    RollingWindowTooSmall { min: usize, got: usize },
    #[error("weight_tolerance must be within (0, 1), got {value}")]
    InvalidWeightTolerance { value: f64 },
}

fn validate_sigma(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(ConfigError::NonPositiveThreshold { field, value });
    }
    Ok(())
}

/// Tunables for pairwise return correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationConfig {
    /// Minimum pairwise-complete return observations per pair.
    pub min_overlap: usize,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self { min_overlap: 2 }
    }
}

impl CorrelationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_overlap < 2 {
            return Err(ConfigError::MinOverlapTooSmall {
                min: 2,
                got: self.min_overlap,
            });
        }
        Ok(())
    }
}

/// How securities are weighted inside a sector aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum WeightScheme {
    /// Every present security counts the same.
    Equal,
    /// Weight by market capitalization; securities missing from the table
    /// are excluded from the aggregate.
    MarketCap { caps: BTreeMap<Ticker, f64> },
}

/// Tunables for sector growth aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthConfig {
    pub scheme: WeightScheme,
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            scheme: WeightScheme::Equal,
        }
    }
}

impl GrowthConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.scheme {
            WeightScheme::Equal => Ok(()),
            WeightScheme::MarketCap { caps } => {
                if caps.is_empty() {
                    return Err(ConfigError::EmptyCapTable);
                }
                for (ticker, cap) in caps {
                    if !cap.is_finite() || *cap <= 0.0 {
                        return Err(ConfigError::InvalidWeight {
                            ticker: ticker.clone(),
                            value: *cap,
                        });
                    }
                }
                Ok(())
            }
        }
    }
}

/// Tunables for anomaly detection baselines and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyConfig {
    /// Trailing periods behind each evaluated point.
    pub baseline_window: usize,
    /// Sigma multiple that promotes a point to `Flagged`.
    pub flag_sigma: f64,
    /// Sigma multiple that promotes a point to `Watch`.
    pub watch_sigma: f64,
    /// Trailing span, in the security's own trading days, for insider
    /// clustering.
    pub cluster_window_days: usize,
    /// Distinct same-direction insiders that mark a cluster; reaching the
    /// threshold is `Watch`, exceeding it is `Flagged`.
    pub cluster_threshold: usize,
    /// Fail assessment outright when no point has a full baseline, instead
    /// of degrading confidence.
    pub strict_history: bool,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            baseline_window: 20,
            flag_sigma: 3.0,
            watch_sigma: 2.0,
            cluster_window_days: 5,
            cluster_threshold: 3,
            strict_history: false,
        }
    }
}

impl AnomalyConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.baseline_window < 2 {
            return Err(ConfigError::BaselineWindowTooSmall {
                min: 2,
                got: self.baseline_window,
            });
        }
        validate_sigma("flag_sigma", self.flag_sigma)?;
        validate_sigma("watch_sigma", self.watch_sigma)?;
        if self.watch_sigma > self.flag_sigma {
            return Err(ConfigError::SigmaOrderInverted {
                watch: self.watch_sigma,
                flag: self.flag_sigma,
            });
        }
        if self.cluster_window_days == 0 {
            return Err(ConfigError::ZeroClusterWindow);
        }
        if self.cluster_threshold == 0 {
            return Err(ConfigError::ZeroClusterThreshold);
        }
        Ok(())
    }
}

/// Tunables for composite-vs-basket divergence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DivergenceConfig {
    /// Window for the rolling standard deviation of the divergence series.
    pub rolling_window: usize,
    /// Allowed drift of the holdings weight total around 1.0 before the
    /// weights are renormalized with a warning.
    pub weight_tolerance: f64,
}

impl Default for DivergenceConfig {
    fn default() -> Self {
        Self {
            rolling_window: 20,
            weight_tolerance: 0.02,
        }
    }
}

impl DivergenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rolling_window < 2 {
            return Err(ConfigError::RollingWindowTooSmall {
                min: 2,
                got: self.rolling_window,
            });
        }
        if !self.weight_tolerance.is_finite()
            || self.weight_tolerance <= 0.0
            || self.weight_tolerance >= 1.0
        {
            return Err(ConfigError::InvalidWeightTolerance {
                value: self.weight_tolerance,
            });
        }
        Ok(())
    }
}

/// Bundle of every engine's configuration, as held by the facade.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub correlation: CorrelationConfig,
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub anomaly: AnomalyConfig,
    #[serde(default)]
    pub divergence: DivergenceConfig,
}

impl AnalyticsConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.correlation.validate()?;
        self.growth.validate()?;
        self.anomaly.validate()?;
        self.divergence.validate()?;
        Ok(())
    }
}
