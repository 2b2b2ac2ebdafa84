//! Fundamentals book and per-period financial ratios.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::{FiscalPeriod, FundamentalsRecord, Measure, Ticker, UndefinedReason};

use crate::error::{AnalyticsError, SeriesDefect};

#[derive(Debug, Clone, Default)]
struct BookState {
    records: BTreeMap<Ticker, Arc<Vec<FundamentalsRecord>>>,
    version: u64,
}

/// Copy-on-write store of per-security fundamentals chronologies.
#[derive(Debug)]
pub struct FundamentalsBook {
    state: RwLock<Arc<BookState>>,
}

impl Default for FundamentalsBook {
    fn default() -> Self {
        Self::new()
    }
}

impl FundamentalsBook {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(BookState::default())),
        }
    }

    /// Replace (or first insert) one security's record chronology.
    pub fn ingest(
        &self,
        ticker: &Ticker,
        records: Vec<FundamentalsRecord>,
    ) -> Result<(), AnalyticsError> {
        validate_records(ticker, &records)?;
        let count = records.len();

        let mut guard = self.state.write();
        let mut next = guard.records.clone();
        next.insert(ticker.clone(), Arc::new(records));
        let version = guard.version + 1;
        *guard = Arc::new(BookState {
            records: next,
            version,
        });
        drop(guard);

        debug!(ticker = %ticker, records = count, version, "fundamentals ingested");
        Ok(())
    }

    pub fn snapshot(&self) -> FundamentalsView {
        FundamentalsView {
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

fn validate_records(ticker: &Ticker, records: &[FundamentalsRecord]) -> Result<(), AnalyticsError> {
    if records.is_empty() {
        return Err(malformed(ticker, SeriesDefect::Empty));
    }

    for (index, record) in records.iter().enumerate() {
        if &record.ticker != ticker {
            return Err(malformed(
                ticker,
                SeriesDefect::TickerMismatch {
                    index,
                    found: record.ticker.clone(),
                },
            ));
        }

        FundamentalsRecord::new(
            record.ticker.clone(),
            record.period,
            record.eps,
            record.revenue,
            record.net_income,
            record.price,
        )
        .map_err(|source| malformed(ticker, SeriesDefect::InvalidRecord { index, source }))?;
    }

    check_chronology(ticker, records)
}

fn check_chronology(ticker: &Ticker, records: &[FundamentalsRecord]) -> Result<(), AnalyticsError> {
    for (index, record) in records.iter().enumerate().skip(1) {
        let prev = records[index - 1].period;
        if record.period == prev {
            return Err(malformed(
                ticker,
                SeriesDefect::DuplicatePeriod {
                    index,
                    period: record.period.to_string(),
                },
            ));
        }
        if record.period < prev {
            return Err(malformed(
                ticker,
                SeriesDefect::PeriodOutOfOrder {
                    index,
                    period: record.period.to_string(),
                },
            ));
        }
    }
    Ok(())
}

/// Immutable view of the book as of one instant.
#[derive(Debug, Clone)]
pub struct FundamentalsView {
    state: Arc<BookState>,
}

impl FundamentalsView {
    pub fn version(&self) -> u64 {
        self.state.version
    }

    pub fn tickers(&self) -> Vec<Ticker> {
        self.state.records.keys().cloned().collect()
    }

    /// Chronology for the ticker, oldest period first; empty when unknown.
    pub fn records(&self, ticker: &Ticker) -> &[FundamentalsRecord] {
        self.state
            .records
            .get(ticker)
            .map(|records| records.as_slice())
            .unwrap_or(&[])
    }
}

/// Ratio outcomes for one reporting period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioSet {
    pub ticker: Ticker,
    pub period: FiscalPeriod,
    pub pe: Measure,
    pub net_margin: Measure,
    pub revenue_growth: Measure,
}

/// Pure per-record ratio computations over one security's chronology.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsCalculator;

impl MetricsCalculator {
    pub fn new() -> Self {
        Self
    }

    /// Ratios for every record. Undefined denominators become reasons,
    /// never NaN; unordered input is rejected outright.
    pub fn ratios(&self, records: &[FundamentalsRecord]) -> Result<Vec<RatioSet>, AnalyticsError> {
        let Some(first) = records.first() else {
            return Ok(Vec::new());
        };
        check_chronology(&first.ticker, records)?;
        for (index, record) in records.iter().enumerate() {
            if record.ticker != first.ticker {
                return Err(malformed(
                    &first.ticker,
                    SeriesDefect::TickerMismatch {
                        index,
                        found: record.ticker.clone(),
                    },
                ));
            }
        }

        let mut out = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            let pe = if record.eps <= 0.0 {
                Measure::undefined(UndefinedReason::NonPositiveEarnings)
            } else {
                Measure::defined(record.price / record.eps)
            };

            let net_margin = if record.revenue == 0.0 {
                Measure::undefined(UndefinedReason::ZeroRevenue)
            } else {
                Measure::defined(record.net_income / record.revenue)
            };

            let revenue_growth = match index.checked_sub(1).map(|i| &records[i]) {
                None => Measure::undefined(UndefinedReason::NoPriorPeriod),
                Some(prev) if prev.revenue == 0.0 => {
                    Measure::undefined(UndefinedReason::ZeroRevenue)
                }
                Some(prev) => {
                    Measure::defined((record.revenue - prev.revenue) / prev.revenue)
                }
            };

            out.push(RatioSet {
                ticker: record.ticker.clone(),
                period: record.period,
                pe,
                net_margin,
                revenue_growth,
            });
        }
        Ok(out)
    }
}
