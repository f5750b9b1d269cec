use chrono::NaiveDate;
use log::{debug, warn};
use std::collections::BTreeSet;
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, ProviderQuote};
use crate::models::settings::DEFAULT_FETCH_TIMEOUT_SECS;
use crate::providers::traits::PriceProvider;

/// Result of one provider fetch, after normalization.
///
/// Provider failures are a value here, not an error: the orchestrator decides
/// to move on to the next ticker by matching on [`FetchOutcome::Failed`].
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    /// At least one usable closing price.
    Prices(Vec<PricePoint>),
    /// The provider answered, or would have been asked, with nothing usable.
    Empty,
    /// Transport/provider error or timeout.
    Failed { reason: String },
}

impl FetchOutcome {
    /// Collapse to the price sequence; `Empty` and `Failed` both yield none.
    pub fn into_prices(self) -> Vec<PricePoint> {
        match self {
            FetchOutcome::Prices(points) => points,
            FetchOutcome::Empty | FetchOutcome::Failed { .. } => Vec::new(),
        }
    }
}

/// Fetches daily closes for a ticker over an inclusive window and turns the
/// provider's raw rows into a canonical, rounded, date-ordered sequence that
/// never contains the run date.
pub struct PriceSourceAdapter {
    provider: Box<dyn PriceProvider>,
    timeout: Duration,
}

impl PriceSourceAdapter {
    pub fn new(provider: Box<dyn PriceProvider>) -> Self {
        Self {
            provider,
            timeout: Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECS),
        }
    }

    /// Bound each provider call by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch closes for `ticker` over `[start, end]` as of `today`.
    ///
    /// The window is first clamped to end at yesterday; an empty window skips
    /// the provider entirely. The provider is asked for `[start, end + 1 day)`
    /// since its end bound is exclusive.
    pub async fn fetch(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
        today: NaiveDate,
    ) -> FetchOutcome {
        let Some(yesterday) = today.pred_opt() else {
            return FetchOutcome::Empty;
        };
        let end = end.min(yesterday);
        if start > end {
            return FetchOutcome::Empty;
        }
        let Some(end_exclusive) = end.succ_opt() else {
            return FetchOutcome::Empty;
        };

        debug!(
            "Fetching {ticker} closes for [{start}, {end}] from {}",
            self.provider.name()
        );

        let call = self.provider.get_daily_closes(ticker, start, end_exclusive);
        let rows = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(rows)) => rows,
            Ok(Err(e)) => {
                warn!("{}: fetch failed for {ticker}: {e}", self.provider.name());
                return FetchOutcome::Failed {
                    reason: e.to_string(),
                };
            }
            Err(_) => {
                let reason = CoreError::Timeout {
                    symbol: ticker.to_string(),
                    seconds: self.timeout.as_secs(),
                }
                .to_string();
                warn!("{}: {reason}", self.provider.name());
                return FetchOutcome::Failed { reason };
            }
        };

        let points = normalize(ticker, rows, start, end, today);
        if points.is_empty() {
            debug!("{}: no usable closes for {ticker}", self.provider.name());
            FetchOutcome::Empty
        } else {
            FetchOutcome::Prices(points)
        }
    }
}

/// Canonicalize raw provider rows for `ticker`:
///
/// 1. keep the rows of a single symbol (see [`select_symbol`])
/// 2. drop missing, non-finite or negative closes
/// 3. keep dates inside `[start, end]` and strictly before `today`
/// 4. round to 2 decimal places, sort by date, one point per date
pub fn normalize(
    ticker: &str,
    rows: Vec<ProviderQuote>,
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
) -> Vec<PricePoint> {
    let Some(symbol) = select_symbol(ticker, &rows) else {
        return Vec::new();
    };

    let mut points: Vec<PricePoint> = rows
        .into_iter()
        .filter(|r| r.symbol == symbol)
        .filter(|r| r.date >= start && r.date <= end && r.date < today)
        .filter_map(|r| {
            let close = r.close.filter(|c| c.is_finite() && *c >= 0.0)?;
            Some(PricePoint::new(ticker, r.date, close))
        })
        .collect();

    points.sort_by_key(|p| p.date); // stable: first row per date wins below
    points.dedup_by_key(|p| p.date);
    points
}

/// Pick the one symbol whose rows represent `ticker`.
///
/// An exact (case-insensitive) match wins; otherwise the alphabetically first
/// symbol present, so the choice never depends on row order.
pub fn select_symbol(ticker: &str, rows: &[ProviderQuote]) -> Option<String> {
    let symbols: BTreeSet<&str> = rows.iter().map(|r| r.symbol.as_str()).collect();
    if let Some(exact) = symbols.iter().find(|s| s.eq_ignore_ascii_case(ticker)) {
        return Some(exact.to_string());
    }
    let first = symbols.iter().next()?;
    if symbols.len() > 1 {
        debug!("{ticker}: provider returned {symbols:?}, using {first}");
    }
    Some(first.to_string())
}
