//! Sector growth aggregation over aligned return series.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::{DateWindow, Measure, Sector, TradingDay, UndefinedReason};

use crate::config::{GrowthConfig, WeightScheme};
use crate::error::AnalyticsError;
use crate::stats;
use crate::store::{SeriesColumn, StoreSnapshot};

/// Weighted per-day growth of one sector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthMetric {
    pub sector: Sector,
    pub day: TradingDay,
    pub growth: Measure,
    /// Securities that actually entered the weighted mean that day.
    pub contributors: usize,
}

/// One sector's standing in a cross-sector ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorRank {
    pub sector: Sector,
    pub mean_growth: Measure,
    pub securities: usize,
}

/// Aggregates per-security returns into sector-level growth series.
#[derive(Debug, Clone, Default)]
pub struct GrowthAggregator {
    config: GrowthConfig,
}

impl GrowthAggregator {
    pub fn new(config: GrowthConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Growth series for one sector, one metric per grid sub-period after
    /// the first.
    ///
    /// Weights renormalize every day over the securities with a defined
    /// return, so an absent security never dilutes the mean toward zero.
    pub fn sector_growth(
        &self,
        snapshot: &StoreSnapshot,
        sector: &Sector,
        window: &DateWindow,
    ) -> Vec<GrowthMetric> {
        let tickers = snapshot.tickers_in_sector(sector);
        if tickers.is_empty() {
            return Vec::new();
        }

        let aligned = snapshot.query(&tickers, window);
        let columns = aligned.columns();
        let returns: Vec<Vec<Option<f64>>> = columns.iter().map(SeriesColumn::returns).collect();
        let grid = aligned.grid();

        let mut series = Vec::with_capacity(grid.len().saturating_sub(1));
        for (t, day) in grid.iter().enumerate().skip(1) {
            let mut weight_total = 0.0;
            let mut weighted_sum = 0.0;
            let mut contributors = 0;

            for (column, column_returns) in columns.iter().zip(&returns) {
                let Some(value) = column_returns[t] else {
                    continue;
                };
                let Some(weight) = self.weight_of(column) else {
                    continue;
                };
                weight_total += weight;
                weighted_sum += weight * value;
                contributors += 1;
            }

            let growth = if contributors == 0 {
                Measure::undefined(UndefinedReason::InsufficientData {
                    required: 1,
                    observed: 0,
                })
            } else {
                Measure::defined(weighted_sum / weight_total)
            };

            series.push(GrowthMetric {
                sector: sector.clone(),
                day: *day,
                growth,
                contributors,
            });
        }

        debug!(
            sector = %sector,
            securities = tickers.len(),
            periods = series.len(),
            "sector growth computed"
        );
        series
    }

    /// Every sector in the store ranked by mean defined growth, best
    /// first; sectors with nothing defined sort last.
    pub fn rank_sectors(&self, snapshot: &StoreSnapshot, window: &DateWindow) -> Vec<SectorRank> {
        let mut ranks: Vec<SectorRank> = snapshot
            .sectors()
            .into_iter()
            .map(|sector| {
                let securities = snapshot.tickers_in_sector(&sector).len();
                let series = self.sector_growth(snapshot, &sector, window);
                let defined: Vec<f64> = series
                    .iter()
                    .filter_map(|metric| metric.growth.value())
                    .collect();
                let mean_growth = match stats::mean(&defined) {
                    Some(mean) => Measure::defined(mean),
                    None => Measure::undefined(UndefinedReason::InsufficientData {
                        required: 1,
                        observed: 0,
                    }),
                };
                SectorRank {
                    sector,
                    mean_growth,
                    securities,
                }
            })
            .collect();

        ranks.sort_by(|a, b| match (a.mean_growth.value(), b.mean_growth.value()) {
            (Some(x), Some(y)) => y
                .partial_cmp(&x)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.sector.cmp(&b.sector)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.sector.cmp(&b.sector),
        });
        ranks
    }

    /// Per-security weight under the configured scheme; `None` excludes
    /// the security from the aggregate.
    fn weight_of(&self, column: &SeriesColumn) -> Option<f64> {
        match &self.config.scheme {
            WeightScheme::Equal => Some(1.0),
            WeightScheme::MarketCap { caps } => caps.get(column.ticker()).copied(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TimeSeriesStore;
    use finsight_core::{Industry, PricePoint, Security, Ticker};
    use std::collections::BTreeMap;

    fn ticker(input: &str) -> Ticker {
        Ticker::parse(input).expect("ticker must parse")
    }

    fn sector(input: &str) -> Sector {
        Sector::parse(input).expect("sector must parse")
    }

    fn window(from: &str, to: &str) -> DateWindow {
        DateWindow::new(
            TradingDay::parse(from).expect("day must parse"),
            TradingDay::parse(to).expect("day must parse"),
        )
        .expect("window must build")
    }

    fn security(tkr: &str, sec: &str) -> Security {
        Security::new(
            ticker(tkr),
            sector(sec),
            Industry::parse("Diversified").expect("industry must parse"),
        )
    }

    fn series(days: &[&str], closes: &[f64]) -> Vec<PricePoint> {
        days.iter()
            .zip(closes)
            .map(|(day, close)| {
                PricePoint::new(
                    TradingDay::parse(day).expect("day must parse"),
                    *close,
                    *close,
                    *close,
                    *close,
                    1_000,
                )
                .expect("point must build")
            })
            .collect()
    }

    #[test]
    fn equal_weights_average_defined_returns() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 101.0]),
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 103.0]),
            )
            .expect("ingest must succeed");

        let aggregator = GrowthAggregator::default();
        let growth = aggregator.sector_growth(
            &store.snapshot(),
            &sector("Energy"),
            &window("2024-01-01", "2024-01-31"),
        );

        assert_eq!(growth.len(), 1);
        assert_eq!(growth[0].contributors, 2);
        assert!((growth[0].growth.value().expect("defined") - 0.02).abs() < 1e-9);
    }

    #[test]
    fn absent_security_never_dilutes_the_mean() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                series(
                    &["2024-01-02", "2024-01-03", "2024-01-04"],
                    &[100.0, 101.0, 102.01],
                ),
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 103.0]),
            )
            .expect("ingest must succeed");

        let aggregator = GrowthAggregator::default();
        let growth = aggregator.sector_growth(
            &store.snapshot(),
            &sector("Energy"),
            &window("2024-01-01", "2024-01-31"),
        );

        // Second sub-period only AAA is present; its 1% stays 1%.
        assert_eq!(growth.len(), 2);
        assert_eq!(growth[1].contributors, 1);
        assert!((growth[1].growth.value().expect("defined") - 0.01).abs() < 1e-9);
    }

    #[test]
    fn market_caps_tilt_the_mean() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 101.0]),
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 105.0]),
            )
            .expect("ingest must succeed");

        let mut caps = BTreeMap::new();
        caps.insert(ticker("AAA"), 3.0);
        caps.insert(ticker("BBB"), 1.0);
        let aggregator = GrowthAggregator::new(GrowthConfig {
            scheme: WeightScheme::MarketCap { caps },
        })
        .expect("config must validate");

        let growth = aggregator.sector_growth(
            &store.snapshot(),
            &sector("Energy"),
            &window("2024-01-01", "2024-01-31"),
        );
        assert!((growth[0].growth.value().expect("defined") - 0.02).abs() < 1e-9);
    }

    #[test]
    fn security_without_a_cap_is_excluded() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 101.0]),
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 105.0]),
            )
            .expect("ingest must succeed");

        let mut caps = BTreeMap::new();
        caps.insert(ticker("AAA"), 2.0);
        let aggregator = GrowthAggregator::new(GrowthConfig {
            scheme: WeightScheme::MarketCap { caps },
        })
        .expect("config must validate");

        let growth = aggregator.sector_growth(
            &store.snapshot(),
            &sector("Energy"),
            &window("2024-01-01", "2024-01-31"),
        );
        assert_eq!(growth[0].contributors, 1);
        assert!((growth[0].growth.value().expect("defined") - 0.01).abs() < 1e-9);
    }

    #[test]
    fn unknown_sector_yields_empty_series() {
        let store = TimeSeriesStore::new();
        let aggregator = GrowthAggregator::default();
        let growth = aggregator.sector_growth(
            &store.snapshot(),
            &sector("Utilities"),
            &window("2024-01-01", "2024-01-31"),
        );
        assert!(growth.is_empty());
    }

    #[test]
    fn ranking_puts_best_first_and_undefined_last() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 102.0]),
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Utilities"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 101.0]),
            )
            .expect("ingest must succeed");
        // One lonely point: no returns, nothing defined to rank.
        store
            .ingest(
                security("CCC", "Materials"),
                series(&["2024-01-02"], &[40.0]),
            )
            .expect("ingest must succeed");

        let aggregator = GrowthAggregator::default();
        let ranks = aggregator.rank_sectors(&store.snapshot(), &window("2024-01-01", "2024-01-31"));

        assert_eq!(ranks.len(), 3);
        assert_eq!(ranks[0].sector.as_str(), "Energy");
        assert_eq!(ranks[1].sector.as_str(), "Utilities");
        assert_eq!(ranks[2].sector.as_str(), "Materials");
        assert!(!ranks[2].mean_growth.is_defined());
        assert_eq!(ranks[2].securities, 1);
    }
}
