use chrono::{NaiveDate, Utc};
use log::{debug, info, warn};
use std::sync::Arc;

use super::holding_service::HoldingService;
use super::price_source::{FetchOutcome, PriceSourceAdapter};
use super::range_filter::filter_to_ranges;
use super::split_reconciler::SplitReconciler;
use super::ticker_locks::TickerLocks;
use crate::errors::CoreError;
use crate::models::holding::covering_window;
use crate::models::price::PricePoint;
use crate::models::summary::BackfillSummary;
use crate::storage::traits::{PriceRepository, PriceWriter, TransactionRepository};

/// What happened to one ticker during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickerOutcome {
    pub rows_written: usize,
    pub reset: bool,
}

/// Drives the backfill of every ticker in a portfolio:
/// holding ranges → fetch → range filter → split check → insert.
///
/// Tickers are processed one at a time. Empty intermediate results and
/// provider failures end a ticker with zero rows; rejected transaction
/// histories are reported in `skipped`. Only storage failures abort the run.
pub struct BackfillService {
    transactions: Arc<dyn TransactionRepository>,
    prices: Arc<dyn PriceRepository>,
    source: PriceSourceAdapter,
    holdings: HoldingService,
    reconciler: SplitReconciler,
    locks: Arc<TickerLocks>,
}

impl BackfillService {
    pub fn new(
        transactions: Arc<dyn TransactionRepository>,
        prices: Arc<dyn PriceRepository>,
        source: PriceSourceAdapter,
    ) -> Self {
        Self {
            transactions,
            prices,
            source,
            holdings: HoldingService::new(),
            reconciler: SplitReconciler::new(),
            locks: Arc::new(TickerLocks::new()),
        }
    }

    /// Share a lock registry with other services writing to the same store.
    pub fn with_locks(mut self, locks: Arc<TickerLocks>) -> Self {
        self.locks = locks;
        self
    }

    /// Backfill `portfolio_id` as of the current UTC date.
    pub async fn run(&self, portfolio_id: i64) -> Result<BackfillSummary, CoreError> {
        self.run_on(portfolio_id, Utc::now().date_naive()).await
    }

    /// Backfill `portfolio_id` treating `today` as the run date: nothing dated
    /// `today` or later is fetched or stored.
    pub async fn run_on(
        &self,
        portfolio_id: i64,
        today: NaiveDate,
    ) -> Result<BackfillSummary, CoreError> {
        let tickers = self.transactions.distinct_tickers(portfolio_id)?;
        info!(
            "Backfilling portfolio {portfolio_id}: {} tickers via {}",
            tickers.len(),
            self.source.provider_name()
        );

        let mut summary = BackfillSummary {
            tickers_processed: tickers.len(),
            ..BackfillSummary::default()
        };

        for ticker in tickers {
            match self.backfill_ticker(portfolio_id, &ticker, today).await {
                Ok(outcome) => {
                    if outcome.reset {
                        summary.reset.insert(ticker.clone());
                    }
                    summary.details.insert(ticker, outcome.rows_written);
                }
                Err(e) if e.is_storage() => return Err(e),
                Err(e) => {
                    warn!("{ticker}: skipped: {e}");
                    summary.details.insert(ticker.clone(), 0);
                    summary.skipped.insert(ticker, e.to_string());
                }
            }
        }

        info!(
            "Portfolio {portfolio_id}: {} rows written across {} tickers",
            summary.rows_written(),
            summary.tickers_processed
        );
        Ok(summary)
    }

    /// Run the pipeline for one ticker.
    pub async fn backfill_ticker(
        &self,
        portfolio_id: i64,
        ticker: &str,
        today: NaiveDate,
    ) -> Result<TickerOutcome, CoreError> {
        let transactions = self.transactions.transactions_for(portfolio_id, ticker)?;
        let ranges = self.holdings.holding_ranges(ticker, &transactions, today)?;

        let Some((start, end)) = covering_window(&ranges) else {
            debug!("{ticker}: no holding ranges before {today}");
            return Ok(TickerOutcome::default());
        };
        debug!("{ticker}: {} holding ranges, window [{start}, {end}]", ranges.len());

        let fetched = match self.source.fetch(ticker, start, end, today).await {
            FetchOutcome::Prices(points) => points,
            FetchOutcome::Empty => {
                debug!("{ticker}: no prices returned");
                return Ok(TickerOutcome::default());
            }
            FetchOutcome::Failed { reason } => {
                warn!("{ticker}: price fetch failed, 0 rows written: {reason}");
                return Ok(TickerOutcome::default());
            }
        };

        let in_range = filter_to_ranges(fetched, &ranges);
        if in_range.is_empty() {
            debug!("{ticker}: no fetched prices inside holding ranges");
            return Ok(TickerOutcome::default());
        }

        self.persist(ticker, &in_range)
    }

    /// Split check and insert as one write section of the price store.
    ///
    /// The store serializes sections across every instance sharing the
    /// database; the ticker lock only keeps runs in this process from queueing
    /// on the database write lock for the same ticker.
    fn persist(&self, ticker: &str, points: &[PricePoint]) -> Result<TickerOutcome, CoreError> {
        let outcome = self.locks.with_lock(ticker, || {
            let mut outcome = TickerOutcome::default();
            self.prices.write_section(&mut |writer: &dyn PriceWriter| {
                let check = self.reconciler.reconcile(writer, ticker, points)?;
                outcome = TickerOutcome {
                    rows_written: writer.insert_prices(ticker, points)?,
                    reset: check.is_reset(),
                };
                Ok(())
            })?;
            Ok::<_, CoreError>(outcome)
        })?;

        info!("{ticker}: {} rows written", outcome.rows_written);
        Ok(outcome)
    }
}
