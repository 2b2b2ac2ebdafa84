//! Facade tying the input stores and analytic engines together.
//!
//! All reads inside one `snapshot` call see a single consistent view of
//! every input store, taken at entry.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use finsight_core::{
    DateWindow, FundamentalsRecord, InsiderTransaction, PricePoint, Sector, Security, Ticker,
    UtcDateTime,
};

use crate::anomaly::{AnomalyDetector, SecurityAnomalies};
use crate::config::AnalyticsConfig;
use crate::correlation::{CorrelationEngine, CorrelationMatrix};
use crate::divergence::{DivergenceAnalyzer, DivergenceReport};
use crate::error::AnalyticsError;
use crate::growth::{GrowthAggregator, GrowthMetric, SectorRank};
use crate::insider::{InsiderLog, InsiderSummary};
use crate::metrics::{FundamentalsBook, MetricsCalculator, RatioSet};
use crate::store::{StoreSummary, TimeSeriesStore};

/// What a snapshot should cover. Empty `sectors` means "the sectors of
/// the selected tickers".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Selection {
    pub tickers: Vec<Ticker>,
    #[serde(default)]
    pub sectors: Vec<Sector>,
    pub window: DateWindow,
}

impl Selection {
    pub fn new(tickers: Vec<Ticker>, window: DateWindow) -> Self {
        Self {
            tickers,
            sectors: Vec::new(),
            window,
        }
    }
}

/// Labels per-artifact log and timing output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Correlation,
    Growth,
    Anomalies,
    Ratios,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Correlation => "correlation",
            Self::Growth => "growth",
            Self::Anomalies => "anomalies",
            Self::Ratios => "ratios",
        }
    }
}

/// Provenance of one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub snapshot_id: Uuid,
    pub generated_at: UtcDateTime,
    /// Price store version the snapshot was computed against.
    pub data_version: u64,
    pub latency_ms: u64,
    /// Unknown tickers, empty sectors, degraded-confidence securities.
    pub warnings: Vec<String>,
}

/// One sector's growth series inside a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorGrowthSeries {
    pub sector: Sector,
    pub series: Vec<GrowthMetric>,
}

/// Growth artifact: the selected sectors plus the all-store ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthArtifact {
    pub sectors: Vec<SectorGrowthSeries>,
    pub ranking: Vec<SectorRank>,
}

/// Everything a dashboard needs for one selection, as of one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub meta: SnapshotMeta,
    pub correlation: CorrelationMatrix,
    pub growth: GrowthArtifact,
    pub anomalies: Vec<SecurityAnomalies>,
    /// Flattened per ticker, then per period.
    pub ratios: Vec<RatioSet>,
}

/// Owns the input stores and every analytic engine.
#[derive(Debug, Default)]
pub struct AnalyticsFacade {
    store: TimeSeriesStore,
    insiders: InsiderLog,
    fundamentals: FundamentalsBook,
    correlation: CorrelationEngine,
    growth: GrowthAggregator,
    anomalies: AnomalyDetector,
    metrics: MetricsCalculator,
    divergence: DivergenceAnalyzer,
}

impl AnalyticsFacade {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyticsConfig) -> Result<Self, AnalyticsError> {
        Ok(Self {
            store: TimeSeriesStore::new(),
            insiders: InsiderLog::new(),
            fundamentals: FundamentalsBook::new(),
            correlation: CorrelationEngine::new(config.correlation)?,
            growth: GrowthAggregator::new(config.growth)?,
            anomalies: AnomalyDetector::new(config.anomaly)?,
            metrics: MetricsCalculator::new(),
            divergence: DivergenceAnalyzer::new(config.divergence)?,
        })
    }

    // === Ingestion forwards ===

    pub fn ingest_series(
        &self,
        security: Security,
        points: Vec<PricePoint>,
    ) -> Result<(), AnalyticsError> {
        self.store
            .ingest(security, points)
            .inspect_err(|err| warn!(code = err.code(), %err, "series ingest rejected"))
    }

    pub fn append_series(
        &self,
        ticker: &Ticker,
        points: Vec<PricePoint>,
    ) -> Result<(), AnalyticsError> {
        self.store
            .append(ticker, points)
            .inspect_err(|err| warn!(code = err.code(), %err, "series append rejected"))
    }

    pub fn record_transaction(&self, transaction: InsiderTransaction) -> Result<(), AnalyticsError> {
        self.record_transactions(vec![transaction])
    }

    pub fn record_transactions(
        &self,
        transactions: Vec<InsiderTransaction>,
    ) -> Result<(), AnalyticsError> {
        self.insiders
            .record_all(transactions)
            .inspect_err(|err| warn!(code = err.code(), %err, "transaction batch rejected"))
    }

    pub fn ingest_fundamentals(
        &self,
        ticker: &Ticker,
        records: Vec<FundamentalsRecord>,
    ) -> Result<(), AnalyticsError> {
        self.fundamentals
            .ingest(ticker, records)
            .inspect_err(|err| warn!(code = err.code(), %err, "fundamentals ingest rejected"))
    }

    // === Derived views ===

    /// One consistent analytics pass over the selection.
    ///
    /// Partial knowledge degrades into warnings and embedded undefined
    /// measures; the snapshot itself always comes back.
    pub fn snapshot(&self, selection: &Selection) -> AnalyticsSnapshot {
        let started = Instant::now();
        let snapshot_id = Uuid::new_v4();
        let span = info_span!("analytics_snapshot", id = %snapshot_id);
        let _guard = span.enter();

        // All three input views are taken here, before any computation.
        let prices = self.store.snapshot();
        let insiders = self.insiders.snapshot();
        let fundamentals = self.fundamentals.snapshot();

        let mut warnings = Vec::new();

        let mut tickers = selection.tickers.clone();
        tickers.sort();
        tickers.dedup();
        for ticker in &tickers {
            if !prices.contains(ticker) {
                warnings.push(format!("ticker '{ticker}' is not in the store"));
            }
        }

        let sectors: Vec<Sector> = if selection.sectors.is_empty() {
            tickers
                .iter()
                .filter_map(|ticker| prices.security(ticker))
                .map(|security| security.sector.clone())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()
        } else {
            let mut sectors = selection.sectors.clone();
            sectors.sort();
            sectors.dedup();
            sectors
        };
        for sector in &sectors {
            if prices.tickers_in_sector(sector).is_empty() {
                warnings.push(format!("sector '{sector}' has no securities in the store"));
            }
        }

        let correlation = timed(ArtifactKind::Correlation, || {
            self.correlation.matrix(&prices, &tickers, &selection.window)
        });

        let growth = timed(ArtifactKind::Growth, || GrowthArtifact {
            sectors: sectors
                .iter()
                .map(|sector| SectorGrowthSeries {
                    sector: sector.clone(),
                    series: self.growth.sector_growth(&prices, sector, &selection.window),
                })
                .collect(),
            ranking: self.growth.rank_sectors(&prices, &selection.window),
        });

        let anomalies = timed(ArtifactKind::Anomalies, || {
            self.anomalies
                .assess_all(&prices, &insiders, &tickers, &selection.window)
        });
        for report in &anomalies {
            if report.confidence < 1.0 {
                warnings.push(format!(
                    "anomaly confidence for '{}' is {:.2}",
                    report.ticker, report.confidence
                ));
            }
        }

        let ratios = timed(ArtifactKind::Ratios, || {
            let mut out = Vec::new();
            for ticker in &tickers {
                let records = fundamentals.records(ticker);
                if records.is_empty() {
                    continue;
                }
                match self.metrics.ratios(records) {
                    Ok(mut sets) => out.append(&mut sets),
                    Err(err) => warn!(code = err.code(), %err, "ratio computation rejected"),
                }
            }
            out
        });

        let meta = SnapshotMeta {
            snapshot_id,
            generated_at: UtcDateTime::now(),
            data_version: prices.version(),
            latency_ms: started.elapsed().as_millis() as u64,
            warnings,
        };
        debug!(
            latency_ms = meta.latency_ms,
            warnings = meta.warnings.len(),
            "snapshot assembled"
        );

        AnalyticsSnapshot {
            meta,
            correlation,
            growth,
            anomalies,
            ratios,
        }
    }

    /// Composite-versus-basket divergence against the current store view.
    pub fn divergence(
        &self,
        composite: &Ticker,
        holdings: &BTreeMap<Ticker, f64>,
        window: &DateWindow,
    ) -> Result<DivergenceReport, AnalyticsError> {
        self.divergence
            .divergence(&self.store.snapshot(), composite, holdings, window)
    }

    /// Windowed insider activity for one security.
    pub fn insider_summary(&self, ticker: &Ticker, window: &DateWindow) -> InsiderSummary {
        self.insiders.snapshot().summary(ticker, window)
    }

    /// Coverage statistics for the current store contents.
    pub fn summary(&self) -> StoreSummary {
        self.store.snapshot().summary()
    }
}

fn timed<T>(kind: ArtifactKind, compute: impl FnOnce() -> T) -> T {
    let started = Instant::now();
    let value = compute();
    debug!(
        artifact = kind.as_str(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "artifact computed"
    );
    value
}
