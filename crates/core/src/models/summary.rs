use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Result of one backfill run. Ephemeral: returned to the caller, never stored.
///
/// Serializes as `{ "tickers_processed": n, "details": { "AAPL": 12, ... } }`,
/// plus `reset` and `skipped` when they are non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackfillSummary {
    /// Number of distinct tickers found in the portfolio.
    pub tickers_processed: usize,

    /// Ticker → rows newly written during this run.
    pub details: BTreeMap<String, usize>,

    /// Tickers whose stored prices were wiped after a split was detected.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub reset: BTreeSet<String>,

    /// Tickers left untouched because their transaction history was rejected.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub skipped: BTreeMap<String, String>,
}

impl BackfillSummary {
    /// Total rows written across all tickers.
    pub fn rows_written(&self) -> usize {
        self.details.values().sum()
    }

    pub fn rows_for(&self, ticker: &str) -> Option<usize> {
        self.details.get(ticker).copied()
    }
}
