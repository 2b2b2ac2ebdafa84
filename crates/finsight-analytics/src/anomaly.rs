//! Volume, price and insider-cluster anomaly detection.
//!
//! Detection is a pure function of the supplied window. Baselines trail
//! the evaluated point and never include it; each security is scanned on
//! its own ordered series, not the multi-security grid.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::{DateWindow, InsiderTransaction, Ticker, TradeSide, TradingDay};

use crate::config::AnomalyConfig;
use crate::error::{AnalyticsError, SeriesDefect};
use crate::insider::InsiderSnapshot;
use crate::stats;
use crate::store::StoreSnapshot;

/// Fewest trailing observations a baseline needs to be evaluated at all.
const MIN_BASELINE: usize = 2;

/// Escalation level of a flag. `Watch` sits below `Flagged`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Watch,
    Flagged,
}

/// What tripped the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    VolumeSpike,
    PriceSpike,
    InsiderCluster,
}

/// One detected anomaly. Flags are one-shot, re-derived on every pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub ticker: Ticker,
    pub day: TradingDay,
    pub kind: AnomalyKind,
    pub severity: f64,
    pub level: AlertLevel,
}

/// Per-security detection report with baseline coverage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityAnomalies {
    pub ticker: Ticker,
    /// Sorted by day, then kind.
    pub flags: Vec<AnomalyFlag>,
    /// Spike evaluations attempted (volume and price combined).
    pub evaluations: usize,
    /// Evaluations that had the full configured baseline behind them.
    pub full_baseline: usize,
    /// `full_baseline / evaluations`, 0.0 when nothing was evaluable.
    pub confidence: f64,
}

struct DirectionStats {
    level: Option<AlertLevel>,
    count: usize,
    notional: f64,
}

/// Scans securities for volume spikes, price spikes and insider clusters.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new(config: AnomalyConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Assess one security, honoring the strict-history policy.
    pub fn assess(
        &self,
        snapshot: &StoreSnapshot,
        insiders: &InsiderSnapshot,
        ticker: &Ticker,
        window: &DateWindow,
    ) -> Result<SecurityAnomalies, AnalyticsError> {
        if !snapshot.contains(ticker) {
            return Err(AnalyticsError::MalformedSeries {
                ticker: ticker.clone(),
                defect: SeriesDefect::UnknownTicker,
            });
        }

        let report = self.evaluate(snapshot, insiders, ticker, window);
        if self.config.strict_history && report.full_baseline == 0 {
            let observed = snapshot
                .series_in(ticker, window)
                .map(|points| points.len().saturating_sub(1))
                .unwrap_or(0);
            return Err(AnalyticsError::InsufficientHistory {
                ticker: ticker.clone(),
                required: self.config.baseline_window,
                observed,
            });
        }
        Ok(report)
    }

    /// Assess many securities; short histories degrade confidence instead
    /// of aborting the batch. Unknown tickers are skipped.
    pub fn assess_all(
        &self,
        snapshot: &StoreSnapshot,
        insiders: &InsiderSnapshot,
        tickers: &[Ticker],
        window: &DateWindow,
    ) -> Vec<SecurityAnomalies> {
        let mut requested = tickers.to_vec();
        requested.sort();
        requested.dedup();
        requested
            .into_iter()
            .filter(|ticker| snapshot.contains(ticker))
            .map(|ticker| self.evaluate(snapshot, insiders, &ticker, window))
            .collect()
    }

    /// The detection pass itself, free of history policy.
    pub fn evaluate(
        &self,
        snapshot: &StoreSnapshot,
        insiders: &InsiderSnapshot,
        ticker: &Ticker,
        window: &DateWindow,
    ) -> SecurityAnomalies {
        let points = snapshot.series_in(ticker, window).unwrap_or(&[]);
        let days: Vec<TradingDay> = points.iter().map(|p| p.day).collect();

        let mut flags = Vec::new();

        let volumes: Vec<f64> = points.iter().map(|p| p.volume as f64).collect();
        let (mut evaluations, mut full_baseline) =
            self.spike_scan(ticker, AnomalyKind::VolumeSpike, &days, &volumes, &mut flags);

        // Price spikes run on absolute returns of successive points; the
        // return at k belongs to the day of point k + 1.
        let abs_returns: Vec<f64> = points
            .windows(2)
            .map(|pair| (pair[1].close / pair[0].close - 1.0).abs())
            .collect();
        let return_days = days.get(1..).unwrap_or(&[]);
        let (price_evals, price_full) = self.spike_scan(
            ticker,
            AnomalyKind::PriceSpike,
            return_days,
            &abs_returns,
            &mut flags,
        );
        evaluations += price_evals;
        full_baseline += price_full;

        let transactions = insiders.transactions_in(ticker, window);
        self.cluster_scan(ticker, &days, transactions, &mut flags);

        flags.sort_by(|a, b| a.day.cmp(&b.day).then_with(|| a.kind.cmp(&b.kind)));

        let confidence = if evaluations == 0 {
            0.0
        } else {
            full_baseline as f64 / evaluations as f64
        };

        debug!(
            ticker = %ticker,
            flags = flags.len(),
            evaluations,
            confidence,
            "anomaly scan completed"
        );

        SecurityAnomalies {
            ticker: ticker.clone(),
            flags,
            evaluations,
            full_baseline,
            confidence,
        }
    }

    /// Threshold scan of one value series against its trailing baseline.
    /// Returns (evaluations, full-baseline evaluations).
    fn spike_scan(
        &self,
        ticker: &Ticker,
        kind: AnomalyKind,
        days: &[TradingDay],
        values: &[f64],
        flags: &mut Vec<AnomalyFlag>,
    ) -> (usize, usize) {
        let mut evaluations = 0;
        let mut full_baseline = 0;

        for (i, &value) in values.iter().enumerate() {
            let start = i.saturating_sub(self.config.baseline_window);
            let baseline = &values[start..i];
            if baseline.len() < MIN_BASELINE {
                continue;
            }
            evaluations += 1;
            if baseline.len() == self.config.baseline_window {
                full_baseline += 1;
            }

            let (Some(mean), Some(sigma)) = (stats::mean(baseline), stats::std_dev(baseline))
            else {
                continue;
            };

            let level = if value > mean + self.config.flag_sigma * sigma {
                AlertLevel::Flagged
            } else if value > mean + self.config.watch_sigma * sigma {
                AlertLevel::Watch
            } else {
                continue;
            };

            flags.push(AnomalyFlag {
                ticker: ticker.clone(),
                day: days[i],
                kind,
                severity: spike_severity(value, mean, sigma),
                level,
            });
        }

        (evaluations, full_baseline)
    }

    /// Distinct same-direction insiders over the trailing day span; flags
    /// fire on upward state transitions only, so a persisting cluster does
    /// not re-flag every day.
    fn cluster_scan(
        &self,
        ticker: &Ticker,
        days: &[TradingDay],
        transactions: &[InsiderTransaction],
        flags: &mut Vec<AnomalyFlag>,
    ) {
        if transactions.is_empty() {
            return;
        }

        let mut previous: Option<AlertLevel> = None;
        for (i, &day) in days.iter().enumerate() {
            let start = (i + 1).saturating_sub(self.config.cluster_window_days);
            let slice = day_slice(transactions, days[start], day);

            let buys = self.direction_stats(slice, TradeSide::Buy);
            let sells = self.direction_stats(slice, TradeSide::Sell);
            let stronger = if (sells.level, sells.count) > (buys.level, buys.count)
                || ((sells.level, sells.count) == (buys.level, buys.count)
                    && sells.notional > buys.notional)
            {
                sells
            } else {
                buys
            };

            if let Some(level) = stronger.level {
                if Some(level) > previous {
                    flags.push(AnomalyFlag {
                        ticker: ticker.clone(),
                        day,
                        kind: AnomalyKind::InsiderCluster,
                        severity: stronger.count as f64 * (1.0 + stronger.notional).log10(),
                        level,
                    });
                }
            }
            previous = stronger.level;
        }
    }

    fn direction_stats(&self, slice: &[InsiderTransaction], side: TradeSide) -> DirectionStats {
        let mut insiders: BTreeSet<&str> = BTreeSet::new();
        let mut notional = 0.0;
        for transaction in slice.iter().filter(|t| t.side == side) {
            insiders.insert(transaction.insider.as_str());
            notional += transaction.notional();
        }

        let count = insiders.len();
        let level = if count > self.config.cluster_threshold {
            Some(AlertLevel::Flagged)
        } else if count == self.config.cluster_threshold {
            Some(AlertLevel::Watch)
        } else {
            None
        };
        DirectionStats {
            level,
            count,
            notional,
        }
    }
}

/// Z-score when the baseline has spread; ratio to the mean over a flat
/// baseline; the raw value over a dead (all-zero) one.
fn spike_severity(value: f64, mean: f64, sigma: f64) -> f64 {
    if sigma > 0.0 {
        (value - mean) / sigma
    } else if mean > 0.0 {
        value / mean
    } else {
        value
    }
}

fn day_slice<'a>(
    transactions: &'a [InsiderTransaction],
    from: TradingDay,
    to: TradingDay,
) -> &'a [InsiderTransaction] {
    let start = transactions.partition_point(|t| t.at.day() < from);
    let end = transactions.partition_point(|t| t.at.day() <= to);
    &transactions[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insider::InsiderLog;
    use crate::store::TimeSeriesStore;
    use finsight_core::{Industry, PricePoint, Sector, Security, UtcDateTime};

    fn ticker(input: &str) -> Ticker {
        Ticker::parse(input).expect("ticker must parse")
    }

    fn window(from: &str, to: &str) -> DateWindow {
        DateWindow::new(
            TradingDay::parse(from).expect("day must parse"),
            TradingDay::parse(to).expect("day must parse"),
        )
        .expect("window must build")
    }

    fn security(tkr: &str) -> Security {
        Security::new(
            ticker(tkr),
            Sector::parse("Energy").expect("sector must parse"),
            Industry::parse("Oil & Gas").expect("industry must parse"),
        )
    }

    /// January 2024 weekdays starting at the 2nd, flat close, per-day
    /// volumes as given.
    fn flat_price_series(volumes: &[u64]) -> Vec<PricePoint> {
        let mut day = TradingDay::parse("2024-01-01").expect("day must parse");
        volumes
            .iter()
            .map(|volume| {
                day = day.next().expect("calendar must continue");
                PricePoint::new(day, 50.0, 50.0, 50.0, 50.0, *volume).expect("point must build")
            })
            .collect()
    }

    fn detector(config: AnomalyConfig) -> AnomalyDetector {
        AnomalyDetector::new(config).expect("config must validate")
    }

    #[test]
    fn flat_volume_history_with_one_burst_emits_exactly_one_flag() {
        let mut volumes = vec![1_000; 21];
        volumes.push(10_000);
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), flat_price_series(&volumes))
            .expect("ingest must succeed");
        let insiders = InsiderLog::new();

        let report = detector(AnomalyConfig::default()).evaluate(
            &store.snapshot(),
            &insiders.snapshot(),
            &ticker("AAA"),
            &window("2024-01-01", "2024-12-31"),
        );

        assert_eq!(report.flags.len(), 1);
        let flag = &report.flags[0];
        assert_eq!(flag.kind, AnomalyKind::VolumeSpike);
        assert_eq!(flag.level, AlertLevel::Flagged);
        assert_eq!(flag.day, TradingDay::parse("2024-01-23").expect("must parse"));
        // Flat baseline severity is the ratio to the mean.
        assert!((flag.severity - 10.0).abs() < 1e-9);
    }

    #[test]
    fn watch_sits_between_the_sigma_thresholds() {
        // Baseline alternates so sigma is positive, then a moderate burst.
        let volumes = vec![900, 1_100, 900, 1_100, 900, 1_100, 1_300];
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), flat_price_series(&volumes))
            .expect("ingest must succeed");
        let insiders = InsiderLog::new();

        let config = AnomalyConfig {
            baseline_window: 6,
            ..AnomalyConfig::default()
        };
        let report = detector(config).evaluate(
            &store.snapshot(),
            &insiders.snapshot(),
            &ticker("AAA"),
            &window("2024-01-01", "2024-12-31"),
        );

        // Baseline mean 1000, sample sigma ~109.5: 1300 clears 2 sigma but
        // not 3.
        let watch: Vec<_> = report
            .flags
            .iter()
            .filter(|f| f.kind == AnomalyKind::VolumeSpike)
            .collect();
        assert_eq!(watch.len(), 1);
        assert_eq!(watch[0].level, AlertLevel::Watch);
    }

    #[test]
    fn price_jump_flags_on_the_jump_day() {
        let mut points = flat_price_series(&vec![1_000; 9]);
        let last_day = points.last().expect("non-empty").day.next().expect("day");
        points.push(PricePoint::new(last_day, 60.0, 60.0, 55.0, 60.0, 1_000).expect("point"));

        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), points)
            .expect("ingest must succeed");
        let insiders = InsiderLog::new();

        let config = AnomalyConfig {
            baseline_window: 5,
            ..AnomalyConfig::default()
        };
        let report = detector(config).evaluate(
            &store.snapshot(),
            &insiders.snapshot(),
            &ticker("AAA"),
            &window("2024-01-01", "2024-12-31"),
        );

        let price_flags: Vec<_> = report
            .flags
            .iter()
            .filter(|f| f.kind == AnomalyKind::PriceSpike)
            .collect();
        assert_eq!(price_flags.len(), 1);
        assert_eq!(price_flags[0].day, last_day);
        assert_eq!(price_flags[0].level, AlertLevel::Flagged);
    }

    #[test]
    fn insider_cluster_escalates_once_per_transition() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), flat_price_series(&vec![1_000; 6]))
            .expect("ingest must succeed");

        let insiders = InsiderLog::new();
        let buy = |when: &str, who: &str| {
            InsiderTransaction::new(
                ticker("AAA"),
                who.to_owned(),
                UtcDateTime::parse(when).expect("timestamp must parse"),
                TradeSide::Buy,
                100.0,
                50.0,
            )
            .expect("transaction must build")
        };
        insiders
            .record_all(vec![
                buy("2024-01-02T10:00:00Z", "J. Doe"),
                buy("2024-01-03T10:00:00Z", "K. Roe"),
                buy("2024-01-04T10:00:00Z", "L. Poe"),
            ])
            .expect("record must succeed");

        let config = AnomalyConfig {
            cluster_window_days: 3,
            cluster_threshold: 2,
            ..AnomalyConfig::default()
        };
        let report = detector(config).evaluate(
            &store.snapshot(),
            &insiders.snapshot(),
            &ticker("AAA"),
            &window("2024-01-01", "2024-12-31"),
        );

        let clusters: Vec<_> = report
            .flags
            .iter()
            .filter(|f| f.kind == AnomalyKind::InsiderCluster)
            .collect();
        // Two distinct buyers on day two (Watch), a third on day three
        // (Flagged); later days shrink back and emit nothing.
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters[0].level, AlertLevel::Watch);
        assert_eq!(clusters[0].day, TradingDay::parse("2024-01-03").expect("must parse"));
        assert_eq!(clusters[1].level, AlertLevel::Flagged);
        assert_eq!(clusters[1].day, TradingDay::parse("2024-01-04").expect("must parse"));
        assert!(clusters[1].severity > clusters[0].severity);
    }

    #[test]
    fn opposite_directions_do_not_pool_into_one_cluster() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), flat_price_series(&vec![1_000; 4]))
            .expect("ingest must succeed");

        let insiders = InsiderLog::new();
        let trade = |when: &str, who: &str, side: TradeSide| {
            InsiderTransaction::new(
                ticker("AAA"),
                who.to_owned(),
                UtcDateTime::parse(when).expect("timestamp must parse"),
                side,
                100.0,
                50.0,
            )
            .expect("transaction must build")
        };
        insiders
            .record_all(vec![
                trade("2024-01-02T10:00:00Z", "J. Doe", TradeSide::Buy),
                trade("2024-01-03T10:00:00Z", "K. Roe", TradeSide::Sell),
            ])
            .expect("record must succeed");

        let config = AnomalyConfig {
            cluster_window_days: 3,
            cluster_threshold: 2,
            ..AnomalyConfig::default()
        };
        let report = detector(config).evaluate(
            &store.snapshot(),
            &insiders.snapshot(),
            &ticker("AAA"),
            &window("2024-01-01", "2024-12-31"),
        );
        assert!(report
            .flags
            .iter()
            .all(|f| f.kind != AnomalyKind::InsiderCluster));
    }

    #[test]
    fn strict_mode_rejects_a_history_with_no_full_baseline() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), flat_price_series(&vec![1_000; 5]))
            .expect("ingest must succeed");
        let insiders = InsiderLog::new();

        let config = AnomalyConfig {
            strict_history: true,
            ..AnomalyConfig::default()
        };
        let err = detector(config)
            .assess(
                &store.snapshot(),
                &insiders.snapshot(),
                &ticker("AAA"),
                &window("2024-01-01", "2024-12-31"),
            )
            .expect_err("must fail");
        assert!(matches!(
            err,
            AnalyticsError::InsufficientHistory {
                required: 20,
                observed: 4,
                ..
            }
        ));
    }

    #[test]
    fn lenient_mode_reports_partial_confidence() {
        // 25 points, window 20: volume scan has 23 evaluations of which 5
        // carry a full baseline; the price scan has 22 of which 4.
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), flat_price_series(&vec![1_000; 25]))
            .expect("ingest must succeed");
        let insiders = InsiderLog::new();

        let report = detector(AnomalyConfig::default())
            .assess(
                &store.snapshot(),
                &insiders.snapshot(),
                &ticker("AAA"),
                &window("2024-01-01", "2024-12-31"),
            )
            .expect("lenient assessment must succeed");

        assert_eq!(report.evaluations, 45);
        assert_eq!(report.full_baseline, 9);
        assert!((report.confidence - 9.0 / 45.0).abs() < 1e-9);
        assert!(report.flags.is_empty());
    }

    #[test]
    fn assessing_an_unknown_ticker_fails() {
        let store = TimeSeriesStore::new();
        let insiders = InsiderLog::new();
        let err = detector(AnomalyConfig::default())
            .assess(
                &store.snapshot(),
                &insiders.snapshot(),
                &ticker("ZZZ"),
                &window("2024-01-01", "2024-12-31"),
            )
            .expect_err("must fail");
        assert!(matches!(
            err,
            AnalyticsError::MalformedSeries {
                defect: SeriesDefect::UnknownTicker,
                ..
            }
        ));
    }
}
