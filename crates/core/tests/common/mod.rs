#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use price_backfill_core::errors::CoreError;
use price_backfill_core::models::price::ProviderQuote;
use price_backfill_core::models::transaction::Operation;
use price_backfill_core::providers::traits::PriceProvider;
use price_backfill_core::services::backfill_service::BackfillService;
use price_backfill_core::services::price_source::PriceSourceAdapter;
use price_backfill_core::storage::sqlite::SqliteStorage;
use price_backfill_core::storage::traits::{PriceRepository, TransactionRepository};

pub fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// One provider request: (symbol, start, end_exclusive).
pub type Call = (String, NaiveDate, NaiveDate);

/// In-memory provider with one close per calendar day per symbol.
///
/// Records every request; symbols listed in `failing` return an API error.
#[derive(Clone, Default)]
pub struct MockProvider {
    pub quotes: Arc<Mutex<HashMap<String, Vec<ProviderQuote>>>>,
    pub failing: Arc<Mutex<HashSet<String>>>,
    pub calls: Arc<Mutex<Vec<Call>>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Daily closes for `symbol` over `[from, to]`, all equal to `close`.
    pub fn with_flat_series(self, symbol: &str, from: NaiveDate, to: NaiveDate, close: f64) -> Self {
        self.set_series(symbol, from, to, |_| close);
        self
    }

    /// Replace the series of `symbol` over `[from, to]` with `close_for(date)`.
    pub fn set_series<F>(&self, symbol: &str, from: NaiveDate, to: NaiveDate, close_for: F)
    where
        F: Fn(NaiveDate) -> f64,
    {
        let rows: Vec<ProviderQuote> = from
            .iter_days()
            .take_while(|d| *d <= to)
            .map(|d| ProviderQuote::new(symbol, d, Some(close_for(d))))
            .collect();
        self.quotes.lock().unwrap().insert(symbol.to_string(), rows);
    }

    pub fn fail_for(self, symbol: &str) -> Self {
        self.failing.lock().unwrap().insert(symbol.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, symbol: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.0 == symbol).collect()
    }
}

#[async_trait]
impl PriceProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<ProviderQuote>, CoreError> {
        self.calls
            .lock()
            .unwrap()
            .push((symbol.to_string(), start, end_exclusive));

        if self.failing.lock().unwrap().contains(symbol) {
            return Err(CoreError::Api {
                provider: "Mock".into(),
                message: format!("Failed for {symbol}"),
            });
        }

        let quotes = self.quotes.lock().unwrap();
        Ok(quotes
            .get(symbol)
            .map(|rows| {
                rows.iter()
                    .filter(|q| q.date >= start && q.date < end_exclusive)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Fresh in-memory database with the schema and one portfolio.
pub fn make_storage() -> (Arc<SqliteStorage>, i64) {
    let storage = SqliteStorage::in_memory().unwrap();
    storage.initialize_schema().unwrap();
    let portfolio_id = storage.create_portfolio("FirstPortf").unwrap();
    (Arc::new(storage), portfolio_id)
}

/// Open the on-disk database at `path`, creating the schema if missing.
///
/// Each call builds its own pool, as a separate process would.
pub fn open_file_storage(path: &std::path::Path) -> Arc<SqliteStorage> {
    let storage = SqliteStorage::open(path.to_str().unwrap(), 1).unwrap();
    storage.initialize_schema().unwrap();
    Arc::new(storage)
}

pub fn buy(storage: &SqliteStorage, portfolio_id: i64, ticker: &str, qty: f64, date: NaiveDate) {
    storage
        .insert_transaction(portfolio_id, ticker, Operation::Buy, qty, date)
        .unwrap();
}

pub fn sell(storage: &SqliteStorage, portfolio_id: i64, ticker: &str, qty: f64, date: NaiveDate) {
    storage
        .insert_transaction(portfolio_id, ticker, Operation::Sell, qty, date)
        .unwrap();
}

/// Orchestrator over `storage` for both the transaction and the price side.
pub fn make_service(storage: &Arc<SqliteStorage>, provider: MockProvider) -> BackfillService {
    BackfillService::new(
        storage.clone() as Arc<dyn TransactionRepository>,
        storage.clone() as Arc<dyn PriceRepository>,
        PriceSourceAdapter::new(Box::new(provider)),
    )
}
