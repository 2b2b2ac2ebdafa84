//! Derived market analytics over validated input records.
//!
//! This crate contains:
//! - The copy-on-write input stores (prices, insider transactions,
//!   fundamentals) with snapshot reads
//! - The derivation engines: correlation, sector growth, anomaly
//!   detection, financial ratios, composite divergence
//! - The facade that merges every artifact against one consistent view

pub mod anomaly;
pub mod config;
pub mod correlation;
pub mod divergence;
pub mod error;
pub mod facade;
pub mod growth;
pub mod insider;
pub mod metrics;
pub mod stats;
pub mod store;

pub use anomaly::{AlertLevel, AnomalyDetector, AnomalyFlag, AnomalyKind, SecurityAnomalies};
pub use config::{
    AnalyticsConfig, AnomalyConfig, ConfigError, CorrelationConfig, DivergenceConfig, GrowthConfig,
    WeightScheme,
};
pub use correlation::{CorrelationEngine, CorrelationMatrix};
pub use divergence::{DivergenceAnalyzer, DivergenceReport, DivergenceStats};
pub use error::{AnalyticsError, SeriesDefect};
pub use facade::{
    AnalyticsFacade, AnalyticsSnapshot, ArtifactKind, GrowthArtifact, SectorGrowthSeries,
    Selection, SnapshotMeta,
};
pub use growth::{GrowthAggregator, GrowthMetric, SectorRank};
pub use insider::{InsiderLog, InsiderSnapshot, InsiderSummary};
pub use metrics::{FundamentalsBook, FundamentalsView, MetricsCalculator, RatioSet};
pub use store::{
    AlignedWindow, SectorCoverage, SeriesColumn, StoreSnapshot, StoreSummary, TimeSeriesStore,
};
