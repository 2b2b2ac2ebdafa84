//! Append-only insider transaction log, copy-on-write like the price store.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::debug;

use finsight_core::{DateWindow, InsiderTransaction, Ticker, TradeSide, UtcDateTime};

use crate::error::{AnalyticsError, SeriesDefect};

#[derive(Debug, Clone, Default)]
struct LogState {
    /// Per ticker, ordered by timestamp (ties keep arrival order).
    transactions: BTreeMap<Ticker, Arc<Vec<InsiderTransaction>>>,
    version: u64,
}

/// Owner of every per-security insider transaction history.
///
/// Records only append; a batch is validated in full before any of it
/// becomes visible, so readers never observe half a batch.
#[derive(Debug)]
pub struct InsiderLog {
    state: RwLock<Arc<LogState>>,
}

impl Default for InsiderLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InsiderLog {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(Arc::new(LogState::default())),
        }
    }

    pub fn record(&self, transaction: InsiderTransaction) -> Result<(), AnalyticsError> {
        self.record_all(vec![transaction])
    }

    /// Append a batch atomically; transactions may span tickers but each
    /// ticker's slice must stay ordered against its stored tail.
    pub fn record_all(&self, transactions: Vec<InsiderTransaction>) -> Result<(), AnalyticsError> {
        if transactions.is_empty() {
            return Ok(());
        }

        let mut guard = self.state.write();

        // Validate the whole batch against current tails before applying.
        let mut tails: BTreeMap<Ticker, UtcDateTime> = BTreeMap::new();
        for transaction in &transactions {
            let tail = tails.get(&transaction.ticker).copied().or_else(|| {
                guard
                    .transactions
                    .get(&transaction.ticker)
                    .and_then(|log| log.last())
                    .map(|last| last.at)
            });
            if let Some(tail) = tail {
                if transaction.at < tail {
                    return Err(AnalyticsError::MalformedSeries {
                        ticker: transaction.ticker.clone(),
                        defect: SeriesDefect::TransactionOutOfOrder {
                            at: transaction.at.format_rfc3339(),
                            tail: tail.format_rfc3339(),
                        },
                    });
                }
            }
            tails.insert(transaction.ticker.clone(), transaction.at);
        }

        let count = transactions.len();
        let mut next = guard.transactions.clone();
        for transaction in transactions {
            let log = next.entry(transaction.ticker.clone()).or_default();
            Arc::make_mut(log).push(transaction);
        }
        let version = guard.version + 1;
        *guard = Arc::new(LogState {
            transactions: next,
            version,
        });
        drop(guard);

        debug!(recorded = count, version, "insider transactions recorded");
        Ok(())
    }

    pub fn snapshot(&self) -> InsiderSnapshot {
        InsiderSnapshot {
            state: Arc::clone(&self.state.read()),
        }
    }

    pub fn version(&self) -> u64 {
        self.state.read().version
    }
}

/// Immutable view of the insider log as of one instant.
#[derive(Debug, Clone)]
pub struct InsiderSnapshot {
    state: Arc<LogState>,
}

impl InsiderSnapshot {
    pub fn version(&self) -> u64 {
        self.state.version
    }

    /// Full recorded history for the ticker, oldest first.
    pub fn transactions(&self, ticker: &Ticker) -> &[InsiderTransaction] {
        self.state
            .transactions
            .get(ticker)
            .map(|log| log.as_slice())
            .unwrap_or(&[])
    }

    /// History restricted to trading days inside the window.
    pub fn transactions_in(&self, ticker: &Ticker, window: &DateWindow) -> &[InsiderTransaction] {
        let all = self.transactions(ticker);
        let start = all.partition_point(|t| t.at.day() < window.from);
        let end = all.partition_point(|t| t.at.day() <= window.to);
        &all[start..end]
    }

    /// Aggregate view of one ticker's activity inside the window.
    pub fn summary(&self, ticker: &Ticker, window: &DateWindow) -> InsiderSummary {
        let slice = self.transactions_in(ticker, window);

        let mut buys = 0;
        let mut sells = 0;
        let mut total_notional = 0.0;
        let mut insiders: BTreeSet<&str> = BTreeSet::new();
        for transaction in slice {
            match transaction.side {
                TradeSide::Buy => buys += 1,
                TradeSide::Sell => sells += 1,
            }
            total_notional += transaction.notional();
            insiders.insert(transaction.insider.as_str());
        }

        InsiderSummary {
            ticker: ticker.clone(),
            window: *window,
            transactions: slice.len(),
            buys,
            sells,
            distinct_insiders: insiders.len(),
            total_notional,
            latest: slice.last().map(|t| t.at),
        }
    }
}

/// Windowed aggregate of one security's insider activity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsiderSummary {
    pub ticker: Ticker,
    pub window: DateWindow,
    pub transactions: usize,
    pub buys: usize,
    pub sells: usize,
    pub distinct_insiders: usize,
    pub total_notional: f64,
    pub latest: Option<UtcDateTime>,
}
