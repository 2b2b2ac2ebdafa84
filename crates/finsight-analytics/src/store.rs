//! Copy-on-write price series store and the aligned query surface.
//!
//! Writers replace the whole state behind the lock; readers clone an `Arc`
//! and keep a consistent view for as long as they hold it. A snapshot can
//! never observe a partially applied ingest.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::{DateWindow, PricePoint, Sector, Security, Ticker, TradingDay};

use crate::error::{AnalyticsError, SeriesDefect};

/// One security's stored series plus its reference data.
#[derive(Debug, Clone)]
struct SeriesEntry {
    security: Security,
    /// Strictly increasing by day; never empty.
    points: Vec<PricePoint>,
}

impl SeriesEntry {
    fn window_slice(&self, window: &DateWindow) -> &[PricePoint] {
        let start = self.points.partition_point(|p| p.day < window.from);
        let end = self.points.partition_point(|p| p.day <= window.to);
        &self.points[start..end]
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    series: BTreeMap<Ticker, Arc<SeriesEntry>>,
    version: u64,
}

/// Owner of every per-security price series.
///
/// `ingest` replaces a series wholesale, `append` extends one; both
/// validate the entire batch before touching state, so a rejected batch
/// leaves the store exactly as it was.
#[derive(Debug)]
pub struct TimeSeriesStore {
    state: RwLock<Arc<StoreState>>,
}

impl Default for TimeSeriesStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSeriesStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(StoreState::default())),
        }
    }

    /// Replace (or first insert) a security's series.
    ///
    /// Concurrent ingests for the same security serialize on the write
    /// lock; the last writer wins wholesale.
    pub fn ingest(&self, security: Security, points: Vec<PricePoint>) -> Result<(), AnalyticsError> {
        validate_series(&security.ticker, &points)?;

        let ticker = security.ticker.clone();
        let count = points.len();

        let mut guard = self.state.write();
        let mut series = guard.series.clone();
        series.insert(ticker.clone(), Arc::new(SeriesEntry { security, points }));
        let version = guard.version + 1;
        *guard = Arc::new(StoreState { series, version });
        drop(guard);

        debug!(ticker = %ticker, points = count, version, "price series ingested");
        Ok(())
    }

    /// Extend an existing series; every new day must land strictly after
    /// the stored series end.
    pub fn append(&self, ticker: &Ticker, points: Vec<PricePoint>) -> Result<(), AnalyticsError> {
        validate_series(ticker, &points)?;
        let count = points.len();

        let mut guard = self.state.write();
        let Some(entry) = guard.series.get(ticker) else {
            return Err(malformed(ticker, SeriesDefect::UnknownTicker));
        };

        if let (Some(last), Some(first)) = (entry.points.last(), points.first()) {
            if first.day <= last.day {
                return Err(malformed(
                    ticker,
                    SeriesDefect::NotAfterExisting {
                        day: first.day.format(),
                        end: last.day.format(),
                    },
                ));
            }
        }

        let mut merged = entry.points.clone();
        merged.extend(points);
        let next = SeriesEntry {
            security: entry.security.clone(),
            points: merged,
        };

        let mut series = guard.series.clone();
        series.insert(ticker.clone(), Arc::new(next));
        let version = guard.version + 1;
        *guard = Arc::new(StoreState { series, version });
        drop(guard);

        debug!(ticker = %ticker, appended = count, version, "price series appended");
        Ok(())
    }

    /// A consistent view of the store as of this call.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            state: Arc::clone(&self.state.read()),
        }
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }
}

fn malformed(ticker: &Ticker, defect: SeriesDefect) -> AnalyticsError {
    AnalyticsError::MalformedSeries {
        ticker: ticker.clone(),
        defect,
    }
}

fn validate_series(ticker: &Ticker, points: &[PricePoint]) -> Result<(), AnalyticsError> {
    if points.is_empty() {
        return Err(malformed(ticker, SeriesDefect::Empty));
    }

    for (index, point) in points.iter().enumerate() {
        // Re-run point validation so literal-built records cannot smuggle
        // bad values past the boundary.
        PricePoint::new(
            point.day,
            point.open,
            point.high,
            point.low,
            point.close,
            point.volume,
        )
        .map_err(|source| malformed(ticker, SeriesDefect::InvalidPoint { index, source }))?;

        if index > 0 {
            let prev = points[index - 1].day;
            if point.day == prev {
                return Err(malformed(
                    ticker,
                    SeriesDefect::DuplicateDay {
                        index,
                        day: point.day.format(),
                    },
                ));
            }
            if point.day < prev {
                return Err(malformed(
                    ticker,
                    SeriesDefect::OutOfOrder {
                        index,
                        day: point.day.format(),
                    },
                ));
            }
        }
    }

    Ok(())
}

/// Immutable view of the store as of one instant.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    state: Arc<StoreState>,
}

impl StoreSnapshot {
    pub fn version(&self) -> u64 {
        self.state.version
    }

    pub fn contains(&self, ticker: &Ticker) -> bool {
        self.state.series.contains_key(ticker)
    }

    pub fn security(&self, ticker: &Ticker) -> Option<&Security> {
        self.state.series.get(ticker).map(|entry| &entry.security)
    }

    pub fn tickers(&self) -> Vec<Ticker> {
        self.state.series.keys().cloned().collect()
    }

    pub fn sectors(&self) -> BTreeSet<Sector> {
        self.state
            .series
            .values()
            .map(|entry| entry.security.sector.clone())
            .collect()
    }

    /// Tickers carrying the given sector tag, in ticker order.
    pub fn tickers_in_sector(&self, sector: &Sector) -> Vec<Ticker> {
        self.state
            .series
            .values()
            .filter(|entry| &entry.security.sector == sector)
            .map(|entry| entry.security.ticker.clone())
            .collect()
    }

    /// The security's own points inside the window; `None` for a ticker
    /// the store has never seen.
    pub fn series_in(&self, ticker: &Ticker, window: &DateWindow) -> Option<&[PricePoint]> {
        self.state
            .series
            .get(ticker)
            .map(|entry| entry.window_slice(window))
    }

    /// Align the requested securities on the union grid of their trading
    /// days inside the window.
    ///
    /// Every requested ticker gets a column, even with no data; absence is
    /// reported through the presence flag, never by dropping the column.
    pub fn query(&self, tickers: &[Ticker], window: &DateWindow) -> AlignedWindow {
        let mut requested: Vec<Ticker> = tickers.to_vec();
        requested.sort();
        requested.dedup();

        let mut days: BTreeSet<TradingDay> = BTreeSet::new();
        for ticker in &requested {
            if let Some(entry) = self.state.series.get(ticker) {
                for point in entry.window_slice(window) {
                    days.insert(point.day);
                }
            }
        }
        let grid: Vec<TradingDay> = days.into_iter().collect();
        let slot_of: BTreeMap<TradingDay, usize> =
            grid.iter().enumerate().map(|(idx, day)| (*day, idx)).collect();

        let columns = requested
            .into_iter()
            .map(|ticker| {
                let mut slots: Vec<Option<PricePoint>> = vec![None; grid.len()];
                let mut present = 0;
                let mut sector = None;

                if let Some(entry) = self.state.series.get(&ticker) {
                    sector = Some(entry.security.sector.clone());
                    for point in entry.window_slice(window) {
                        if let Some(slot) = slot_of.get(&point.day) {
                            slots[*slot] = Some(point.clone());
                            present += 1;
                        }
                    }
                }

                SeriesColumn {
                    ticker,
                    sector,
                    slots,
                    present,
                }
            })
            .collect();

        AlignedWindow { grid, columns }
    }

    /// Coverage statistics over the whole store.
    pub fn summary(&self) -> StoreSummary {
        let mut total_points = 0;
        let mut earliest: Option<TradingDay> = None;
        let mut latest: Option<TradingDay> = None;
        let mut by_sector: BTreeMap<Sector, SectorCoverage> = BTreeMap::new();

        for entry in self.state.series.values() {
            total_points += entry.points.len();

            if let Some(first) = entry.points.first() {
                earliest = Some(earliest.map_or(first.day, |day| day.min(first.day)));
            }
            if let Some(last) = entry.points.last() {
                latest = Some(latest.map_or(last.day, |day| day.max(last.day)));
            }

            let coverage = by_sector
                .entry(entry.security.sector.clone())
                .or_insert_with(|| SectorCoverage {
                    sector: entry.security.sector.clone(),
                    securities: 0,
                    points: 0,
                });
            coverage.securities += 1;
            coverage.points += entry.points.len();
        }

        StoreSummary {
            securities: self.state.series.len(),
            total_points,
            earliest,
            latest,
            data_version: self.state.version,
            sectors: by_sector.into_values().collect(),
        }
    }
}

/// Union trading-day grid with one column per requested security.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedWindow {
    grid: Vec<TradingDay>,
    columns: Vec<SeriesColumn>,
}

impl AlignedWindow {
    pub fn grid(&self) -> &[TradingDay] {
        &self.grid
    }

    /// Columns in ticker order, one per requested security.
    pub fn columns(&self) -> &[SeriesColumn] {
        &self.columns
    }

    pub fn column(&self, ticker: &Ticker) -> Option<&SeriesColumn> {
        self.columns
            .binary_search_by(|column| column.ticker.cmp(ticker))
            .ok()
            .map(|idx| &self.columns[idx])
    }
}

/// One security's slots on the aligned grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesColumn {
    ticker: Ticker,
    sector: Option<Sector>,
    slots: Vec<Option<PricePoint>>,
    present: usize,
}

impl SeriesColumn {
    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn sector(&self) -> Option<&Sector> {
        self.sector.as_ref()
    }

    pub fn slots(&self) -> &[Option<PricePoint>] {
        &self.slots
    }

    /// Presence flag: did the store hold any point for this security in
    /// the window?
    pub fn has_data(&self) -> bool {
        self.present > 0
    }

    pub fn present(&self) -> usize {
        self.present
    }

    pub fn close_at(&self, slot: usize) -> Option<f64> {
        self.slots.get(slot).and_then(|p| p.as_ref()).map(|p| p.close)
    }

    /// Grid-aligned period-over-period returns.
    ///
    /// Slot `t` is defined only when the security is present at both `t`
    /// and `t - 1`; gaps are never bridged and slot 0 has no prior period.
    pub fn returns(&self) -> Vec<Option<f64>> {
        let mut out = vec![None; self.slots.len()];
        for t in 1..self.slots.len() {
            if let (Some(prev), Some(cur)) = (&self.slots[t - 1], &self.slots[t]) {
                out[t] = Some(cur.close / prev.close - 1.0);
            }
        }
        out
    }
}

/// Coverage statistics over the whole store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreSummary {
    pub securities: usize,
    pub total_points: usize,
    pub earliest: Option<TradingDay>,
    pub latest: Option<TradingDay>,
    pub data_version: u64,
    pub sectors: Vec<SectorCoverage>,
}

/// Per-sector slice of the store summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorCoverage {
    pub sector: Sector,
    pub securities: usize,
    pub points: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::Industry;

    fn day(input: &str) -> TradingDay {
        TradingDay::parse(input).expect("day must parse")
    }

    fn window(from: &str, to: &str) -> DateWindow {
        DateWindow::new(day(from), day(to)).expect("window must build")
    }

    fn security(ticker: &str, sector: &str) -> Security {
        Security::new(
            Ticker::parse(ticker).expect("ticker must parse"),
            Sector::parse(sector).expect("sector must parse"),
            Industry::parse("Diversified").expect("industry must parse"),
        )
    }

    fn point(input: &str, close: f64) -> PricePoint {
        PricePoint::new(day(input), close, close, close, close, 1_000).expect("point must build")
    }

    #[test]
    fn query_aligns_on_the_union_grid_with_presence_flags() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                vec![point("2024-01-02", 10.0), point("2024-01-03", 11.0)],
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Energy"),
                vec![point("2024-01-03", 20.0), point("2024-01-04", 21.0)],
            )
            .expect("ingest must succeed");

        let snapshot = store.snapshot();
        let aligned = snapshot.query(
            &[
                Ticker::parse("AAA").expect("valid"),
                Ticker::parse("BBB").expect("valid"),
                Ticker::parse("ZZZ").expect("valid"),
            ],
            &window("2024-01-01", "2024-01-31"),
        );

        assert_eq!(aligned.grid().len(), 3);
        assert_eq!(aligned.columns().len(), 3);

        let aaa = aligned
            .column(&Ticker::parse("AAA").expect("valid"))
            .expect("column exists");
        assert!(aaa.has_data());
        assert_eq!(aaa.close_at(0), Some(10.0));
        assert_eq!(aaa.close_at(2), None);

        let zzz = aligned
            .column(&Ticker::parse("ZZZ").expect("valid"))
            .expect("unknown tickers still get a column");
        assert!(!zzz.has_data());
        assert_eq!(zzz.slots().len(), 3);
    }

    #[test]
    fn returns_skip_gaps_instead_of_bridging_them() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                vec![
                    point("2024-01-02", 100.0),
                    point("2024-01-03", 101.0),
                    point("2024-01-05", 103.0),
                ],
            )
            .expect("ingest must succeed");
        store
            .ingest(
                security("BBB", "Energy"),
                vec![
                    point("2024-01-02", 50.0),
                    point("2024-01-03", 51.0),
                    point("2024-01-04", 52.0),
                    point("2024-01-05", 53.0),
                ],
            )
            .expect("ingest must succeed");

        let snapshot = store.snapshot();
        let aligned = snapshot.query(
            &[
                Ticker::parse("AAA").expect("valid"),
                Ticker::parse("BBB").expect("valid"),
            ],
            &window("2024-01-01", "2024-01-31"),
        );

        let aaa = aligned
            .column(&Ticker::parse("AAA").expect("valid"))
            .expect("column exists");
        let returns = aaa.returns();
        assert_eq!(returns.len(), 4);
        assert_eq!(returns[0], None);
        assert!((returns[1].expect("defined") - 0.01).abs() < 1e-9);
        // Absent on 2024-01-04 and no bridge into 2024-01-05.
        assert_eq!(returns[2], None);
        assert_eq!(returns[3], None);
    }

    #[test]
    fn append_extends_and_bumps_version() {
        let store = TimeSeriesStore::new();
        let ticker = Ticker::parse("AAA").expect("valid");
        store
            .ingest(security("AAA", "Energy"), vec![point("2024-01-02", 10.0)])
            .expect("ingest must succeed");
        assert_eq!(store.version(), 1);

        store
            .append(&ticker, vec![point("2024-01-03", 10.5)])
            .expect("append must succeed");
        assert_eq!(store.version(), 2);

        let snapshot = store.snapshot();
        let slice = snapshot
            .series_in(&ticker, &window("2024-01-01", "2024-01-31"))
            .expect("series exists");
        assert_eq!(slice.len(), 2);
    }

    #[test]
    fn append_rejects_overlapping_days() {
        let store = TimeSeriesStore::new();
        let ticker = Ticker::parse("AAA").expect("valid");
        store
            .ingest(
                security("AAA", "Energy"),
                vec![point("2024-01-02", 10.0), point("2024-01-03", 10.5)],
            )
            .expect("ingest must succeed");

        let err = store
            .append(&ticker, vec![point("2024-01-03", 11.0)])
            .expect_err("must fail");
        assert!(matches!(
            err,
            AnalyticsError::MalformedSeries {
                defect: SeriesDefect::NotAfterExisting { .. },
                ..
            }
        ));
        // The rejected batch left nothing behind.
        assert_eq!(store.version(), 1);
    }

    #[test]
    fn summary_counts_points_per_sector() {
        let store = TimeSeriesStore::new();
        store
            .ingest(
                security("AAA", "Energy"),
                vec![point("2024-01-02", 10.0), point("2024-01-03", 11.0)],
            )
            .expect("ingest must succeed");
        store
            .ingest(security("CCC", "Utilities"), vec![point("2024-01-04", 30.0)])
            .expect("ingest must succeed");

        let summary = store.snapshot().summary();
        assert_eq!(summary.securities, 2);
        assert_eq!(summary.total_points, 3);
        assert_eq!(summary.earliest, Some(day("2024-01-02")));
        assert_eq!(summary.latest, Some(day("2024-01-04")));
        assert_eq!(summary.sectors.len(), 2);
        assert_eq!(summary.sectors[0].sector.as_str(), "Energy");
        assert_eq!(summary.sectors[0].points, 2);
    }

    #[test]
    fn snapshot_is_isolated_from_later_writes() {
        let store = TimeSeriesStore::new();
        store
            .ingest(security("AAA", "Energy"), vec![point("2024-01-02", 10.0)])
            .expect("ingest must succeed");

        let before = store.snapshot();
        store
            .ingest(security("AAA", "Energy"), vec![point("2024-02-01", 99.0)])
            .expect("ingest must succeed");

        let ticker = Ticker::parse("AAA").expect("valid");
        let slice = before
            .series_in(&ticker, &window("2024-01-01", "2024-12-31"))
            .expect("series exists");
        assert_eq!(slice.len(), 1);
        assert_eq!(slice[0].close, 10.0);
        assert_eq!(before.version(), 1);
        assert_eq!(store.version(), 2);
    }
}
