//! Pairwise-complete return correlation over an aligned window.

use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::{DateWindow, Measure, Ticker, UndefinedReason};

use crate::config::CorrelationConfig;
use crate::error::AnalyticsError;
use crate::stats;
use crate::store::{SeriesColumn, StoreSnapshot};

/// Computes return correlation matrices from store snapshots.
#[derive(Debug, Clone, Default)]
pub struct CorrelationEngine {
    config: CorrelationConfig,
}

impl CorrelationEngine {
    pub fn new(config: CorrelationConfig) -> Result<Self, AnalyticsError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Full symmetric matrix over the requested securities.
    ///
    /// Correlation runs on period-over-period returns, never raw prices,
    /// restricted per pair to the grid slots where both returns exist.
    pub fn matrix(
        &self,
        snapshot: &StoreSnapshot,
        tickers: &[Ticker],
        window: &DateWindow,
    ) -> CorrelationMatrix {
        let aligned = snapshot.query(tickers, window);
        let columns = aligned.columns();
        let returns: Vec<Vec<Option<f64>>> = columns.iter().map(SeriesColumn::returns).collect();
        let n = columns.len();

        let mut cells = vec![Measure::undefined(undersized(self.config.min_overlap, 0)); n * n];
        for i in 0..n {
            cells[i * n + i] = self.diagonal(&returns[i]);
            for j in (i + 1)..n {
                let cell = self.correlate_pair(&returns[i], &returns[j]);
                cells[i * n + j] = cell;
                cells[j * n + i] = cell;
            }
        }

        debug!(
            securities = n,
            window = %window,
            min_overlap = self.config.min_overlap,
            "correlation matrix computed"
        );

        CorrelationMatrix {
            tickers: columns.iter().map(|c| c.ticker().clone()).collect(),
            cells,
        }
    }

    /// Single pair without building the full matrix.
    pub fn pair(
        &self,
        snapshot: &StoreSnapshot,
        a: &Ticker,
        b: &Ticker,
        window: &DateWindow,
    ) -> Measure {
        if a == b {
            let aligned = snapshot.query(std::slice::from_ref(a), window);
            return match aligned.column(a) {
                Some(column) => self.diagonal(&column.returns()),
                None => Measure::undefined(undersized(1, 0)),
            };
        }

        let aligned = snapshot.query(&[a.clone(), b.clone()], window);
        match (aligned.column(a), aligned.column(b)) {
            (Some(left), Some(right)) => self.correlate_pair(&left.returns(), &right.returns()),
            _ => Measure::undefined(undersized(self.config.min_overlap, 0)),
        }
    }

    /// Self-correlation is 1 whenever the security has any return at all.
    fn diagonal(&self, returns: &[Option<f64>]) -> Measure {
        if returns.iter().any(Option::is_some) {
            Measure::defined(1.0)
        } else {
            Measure::undefined(undersized(1, 0))
        }
    }

    fn correlate_pair(&self, a: &[Option<f64>], b: &[Option<f64>]) -> Measure {
        let mut xs = Vec::new();
        let mut ys = Vec::new();
        for (x, y) in a.iter().zip(b) {
            if let (Some(x), Some(y)) = (x, y) {
                xs.push(*x);
                ys.push(*y);
            }
        }

        if xs.len() < self.config.min_overlap {
            return Measure::undefined(undersized(self.config.min_overlap, xs.len()));
        }

        match stats::pearson(&xs, &ys) {
            Some(r) => Measure::defined(r),
            // Equal-length overlap above the minimum: the only way the
            // coefficient vanishes is a flat side.
            None => Measure::undefined(UndefinedReason::ZeroVariance),
        }
    }
}

fn undersized(required: usize, observed: usize) -> UndefinedReason {
    UndefinedReason::InsufficientData { required, observed }
}

/// Symmetric matrix of return correlations, tickers in sorted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    tickers: Vec<Ticker>,
    /// Row-major `tickers.len() x tickers.len()`.
    cells: Vec<Measure>,
}

impl CorrelationMatrix {
    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Cell for a ticker pair, `None` when either is outside the matrix.
    pub fn get(&self, a: &Ticker, b: &Ticker) -> Option<Measure> {
        let row = self.tickers.binary_search(a).ok()?;
        let col = self.tickers.binary_search(b).ok()?;
        Some(self.cells[row * self.tickers.len() + col])
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<Measure> {
        if row < self.len() && col < self.len() {
            Some(self.cells[row * self.len() + col])
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::TimeSeriesStore;
    use finsight_core::{Industry, PricePoint, Sector, Security, TradingDay};

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

    const DAYS: [&str; 4] = ["2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"];

    #[test]
    fn identical_movements_correlate_to_one() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), series(&DAYS, &[100.0, 101.0, 103.0, 102.0]))
            .expect("ingest must succeed");
        store
            .ingest(security("BBB"), series(&DAYS, &[50.0, 50.5, 51.5, 51.0]))
            .expect("ingest must succeed");

        let engine = CorrelationEngine::default();
        let cell = engine.pair(
            &store.snapshot(),
            &ticker("AAA"),
            &ticker("BBB"),
            &window("2024-01-01", "2024-01-31"),
        );
        assert!((cell.value().expect("defined") - 1.0).abs() < 1e-9);
    }

    #[test]
    fn flat_series_reports_zero_variance() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), series(&DAYS, &[100.0, 101.0, 103.0, 102.0]))
            .expect("ingest must succeed");
        store
            .ingest(security("BBB"), series(&DAYS, &[50.0, 50.0, 50.0, 50.0]))
            .expect("ingest must succeed");

        let engine = CorrelationEngine::default();
        let cell = engine.pair(
            &store.snapshot(),
            &ticker("AAA"),
            &ticker("BBB"),
            &window("2024-01-01", "2024-01-31"),
        );
        assert_eq!(cell.reason(), Some(UndefinedReason::ZeroVariance));
    }

    #[test]
    fn disjoint_histories_report_insufficient_data() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA"),
                series(&["2024-01-02", "2024-01-03"], &[100.0, 101.0]),
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB"),
                series(&["2024-02-05", "2024-02-06"], &[50.0, 51.0]),
            )
            .expect("ingest must succeed");

        let engine = CorrelationEngine::default();
        let cell = engine.pair(
            &store.snapshot(),
            &ticker("AAA"),
            &ticker("BBB"),
            &window("2024-01-01", "2024-02-28"),
        );
        assert_eq!(
            cell.reason(),
            Some(UndefinedReason::InsufficientData {
                required: 2,
                observed: 0,
            })
        );
    }

    #[test]
    fn matrix_is_symmetric_with_unit_diagonal() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), series(&DAYS, &[100.0, 101.0, 103.0, 102.0]))
            .expect("ingest must succeed");
        store
            .ingest(security("BBB"), series(&DAYS, &[50.0, 49.0, 48.5, 49.5]))
            .expect("ingest must succeed");

        let engine = CorrelationEngine::default();
        let matrix = engine.matrix(
            &store.snapshot(),
            &[ticker("BBB"), ticker("AAA")],
            &window("2024-01-01", "2024-01-31"),
        );

        assert_eq!(matrix.tickers(), &[ticker("AAA"), ticker("BBB")]);
        let diag = matrix.get(&ticker("AAA"), &ticker("AAA")).expect("cell exists");
        assert_eq!(diag.value(), Some(1.0));

        let ab = matrix.get(&ticker("AAA"), &ticker("BBB")).expect("cell exists");
        let ba = matrix.get(&ticker("BBB"), &ticker("AAA")).expect("cell exists");
        assert_eq!(ab, ba);
    }

    #[test]
    fn diagonal_for_dataless_security_is_undefined() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA"), series(&DAYS, &[100.0, 101.0, 103.0, 102.0]))
            .expect("ingest must succeed");

        let engine = CorrelationEngine::default();
        let matrix = engine.matrix(
            &store.snapshot(),
            &[ticker("AAA"), ticker("ZZZ")],
            &window("2024-01-01", "2024-01-31"),
        );

        let diag = matrix.get(&ticker("ZZZ"), &ticker("ZZZ")).expect("cell exists");
        assert_eq!(
            diag.reason(),
            Some(UndefinedReason::InsufficientData {
                required: 1,
                observed: 0,
            })
        );
    }

    #[test]
    fn rejects_min_overlap_below_two() {
        let err = CorrelationEngine::new(CorrelationConfig { min_overlap: 1 })
            .expect_err("must fail");
        assert!(matches!(err, AnalyticsError::Configuration(_)));
    }
}
