//! Composite-versus-basket divergence tracking.
//!
//! Compares a composite security (an ETF or an index proxy) against the
//! weighted basket of its holdings over an aligned window.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use finsight_core::{DateWindow, Measure, Ticker, TradingDay, UndefinedReason};

use crate::config::{ConfigError, DivergenceConfig};
use crate::error::{AnalyticsError, SeriesDefect};
use crate::stats;
use crate::store::StoreSnapshot;

/// Summary statistics over the divergence series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceStats {
    pub max: Measure,
    pub min: Measure,
    pub mean: Measure,
    pub std_dev: Measure,
    /// Divergence on the last common day.
    pub current: Measure,
    /// Sign changes of the divergence series; exact zeros are touches,
    /// not crossings.
    pub crossovers: usize,
}

/// Composite-versus-basket comparison over one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub composite: Ticker,
    /// Days where the composite and at least one holding are present.
    pub days: Vec<TradingDay>,
    /// Composite closes rebased to 100 at the first common day.
    pub composite_index: Vec<f64>,
    /// Basket values rebased to 100 at the first common day.
    pub basket_index: Vec<f64>,
    /// `composite_index - basket_index`, day by day.
    pub divergence: Vec<f64>,
    /// Rolling standard deviation of the divergence series.
    pub rolling_std: Vec<Option<f64>>,
    pub stats: DivergenceStats,
    pub warnings: Vec<String>,
}

/// Computes divergence reports from store snapshots.
#[derive(Debug, Clone, Default)]
pub struct DivergenceAnalyzer {
    config: DivergenceConfig,
}

impl DivergenceAnalyzer {
    pub fn new(config: DivergenceConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Compare the composite against the weighted basket of its holdings.
    ///
    /// The basket value per day is the weight-renormalized mean of the
    /// holdings present that day, so the global weight scale cancels; a
    /// total outside the tolerance band still earns a warning because it
    /// points at suspect holdings data.
    pub fn divergence(
        &self,
        snapshot: &StoreSnapshot,
        composite: &Ticker,
        holdings: &BTreeMap<Ticker, f64>,
        window: &DateWindow,
    ) -> Result<DivergenceReport, AnalyticsError> {
        let total = validate_holdings(holdings)?;
        if !snapshot.contains(composite) {
            return Err(AnalyticsError::MalformedSeries {
                ticker: composite.clone(),
                defect: SeriesDefect::UnknownTicker,
            });
        }

        let mut warnings = Vec::new();
        if (total - 1.0).abs() > self.config.weight_tolerance {
            warn!(composite = %composite, total, "holdings weights off unity");
            warnings.push(format!(
                "holdings weights total {total:.4}; renormalizing to 1.0"
            ));
        }

        let mut requested: Vec<Ticker> = holdings.keys().cloned().collect();
        requested.push(composite.clone());
        let aligned = snapshot.query(&requested, window);

        let holding_columns: Vec<_> = aligned
            .columns()
            .iter()
            .filter(|column| column.ticker() != composite)
            .collect();
        for column in &holding_columns {
            if !column.has_data() {
                warnings.push(format!(
                    "holding '{}' has no data in the window",
                    column.ticker()
                ));
            }
        }

        let mut days = Vec::new();
        let mut composite_raw = Vec::new();
        let mut basket_raw = Vec::new();
        if let Some(composite_column) = aligned.column(composite) {
            for (slot, day) in aligned.grid().iter().enumerate() {
                let Some(composite_close) = composite_column.close_at(slot) else {
                    continue;
                };

                let mut weight_total = 0.0;
                let mut weighted_sum = 0.0;
                for column in &holding_columns {
                    let Some(close) = column.close_at(slot) else {
                        continue;
                    };
                    let Some(weight) = holdings.get(column.ticker()).copied() else {
                        continue;
                    };
                    weight_total += weight;
                    weighted_sum += weight * close;
                }
                if weight_total <= 0.0 {
                    continue;
                }

                days.push(*day);
                composite_raw.push(composite_close);
                basket_raw.push(weighted_sum / weight_total);
            }
        }

        let composite_index = rebase(&composite_raw);
        let basket_index = rebase(&basket_raw);
        let divergence: Vec<f64> = composite_index
            .iter()
            .zip(&basket_index)
            .map(|(c, b)| c - b)
            .collect();
        let rolling_std = stats::rolling_std(&divergence, self.config.rolling_window);

        let stats = match divergence.last().copied() {
            Some(current) if divergence.len() >= 2 => DivergenceStats {
                max: Measure::defined(divergence.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
                min: Measure::defined(divergence.iter().copied().fold(f64::INFINITY, f64::min)),
                mean: defined_or_undersized(stats::mean(&divergence), divergence.len()),
                std_dev: defined_or_undersized(stats::std_dev(&divergence), divergence.len()),
                current: Measure::defined(current),
                crossovers: count_crossovers(&divergence),
            },
            _ => {
                let undersized = Measure::undefined(UndefinedReason::InsufficientData {
                    required: 2,
                    observed: divergence.len(),
                });
                DivergenceStats {
                    max: undersized,
                    min: undersized,
                    mean: undersized,
                    std_dev: undersized,
                    current: undersized,
                    crossovers: 0,
                }
            }
        };

        debug!(
            composite = %composite,
            holdings = holdings.len(),
            days = days.len(),
            crossovers = stats.crossovers,
            "divergence computed"
        );

        Ok(DivergenceReport {
            composite: composite.clone(),
            days,
            composite_index,
            basket_index,
            divergence,
            rolling_std,
            stats,
            warnings,
        })
    }
}

/// Positive finite weights with a positive finite total.
fn validate_holdings(holdings: &BTreeMap<Ticker, f64>) -> Result<f64, ConfigError> {
    if holdings.is_empty() {
        return Err(ConfigError::EmptyHoldings);
    }
    let mut total = 0.0;
    for (ticker, weight) in holdings {
        if !weight.is_finite() || *weight <= 0.0 {
            return Err(ConfigError::InvalidWeight {
                ticker: ticker.clone(),
                value: *weight,
            });
        }
        total += weight;
    }
    if !total.is_finite() || total <= 0.0 {
        return Err(ConfigError::InvalidWeightTotal { total });
    }
    Ok(total)
}

/// Rebase a positive series to 100 at its first value.
fn rebase(values: &[f64]) -> Vec<f64> {
    match values.first() {
        Some(base) => values.iter().map(|v| 100.0 * v / base).collect(),
        None => Vec::new(),
    }
}

/// Sign changes against the last preceding nonzero value.
fn count_crossovers(values: &[f64]) -> usize {
    let mut crossings = 0;
    let mut last_sign = 0i8;
    for &value in values {
        let sign = if value > 0.0 {
            1
        } else if value < 0.0 {
            -1
        } else {
            0
        };
        if sign != 0 {
            if last_sign != 0 && sign != last_sign {
                crossings += 1;
            }
            last_sign = sign;
        }
    }
    crossings
}

fn defined_or_undersized(value: Option<f64>, observed: usize) -> Measure {
    match value {
        Some(value) => Measure::defined(value),
        None => Measure::undefined(UndefinedReason::InsufficientData {
            required: 2,
            observed,
        }),
    }
}
