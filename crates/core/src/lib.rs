pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use chrono::NaiveDate;
use models::{price::PricePoint, settings::Settings, summary::BackfillSummary};
use providers::traits::PriceProvider;
use services::{
    backfill_service::BackfillService, price_source::PriceSourceAdapter,
    ticker_locks::TickerLocks,
};
use std::sync::Arc;
use std::time::Duration;
use storage::{
    sqlite::SqliteStorage,
    traits::{PriceRepository, TransactionRepository},
};

use errors::CoreError;

/// Main entry point for the price backfill library.
/// Holds the SQLite storage and the backfill pipeline built on top of it.
#[must_use]
pub struct PriceBackfill {
    storage: Arc<SqliteStorage>,
    service: BackfillService,
}

impl std::fmt::Debug for PriceBackfill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PriceBackfill").finish_non_exhaustive()
    }
}

impl PriceBackfill {
    /// Open the configured database and build the configured provider.
    pub fn from_settings(settings: &Settings) -> Result<Self, CoreError> {
        let provider = providers::from_settings(settings)?;
        Self::with_provider(settings, provider)
    }

    /// Like [`PriceBackfill::from_settings`] but with an explicit provider.
    pub fn with_provider(
        settings: &Settings,
        provider: Box<dyn PriceProvider>,
    ) -> Result<Self, CoreError> {
        let storage = SqliteStorage::open(&settings.database_path, settings.pool_size)?;
        Self::build(storage, provider, settings.fetch_timeout_secs)
    }

    /// Wire an already opened storage with a provider. The schema is created
    /// if missing.
    pub fn build(
        storage: SqliteStorage,
        provider: Box<dyn PriceProvider>,
        fetch_timeout_secs: u64,
    ) -> Result<Self, CoreError> {
        storage.initialize_schema()?;
        let storage = Arc::new(storage);

        let source = PriceSourceAdapter::new(provider)
            .with_timeout(Duration::from_secs(fetch_timeout_secs));
        let service = BackfillService::new(
            storage.clone() as Arc<dyn TransactionRepository>,
            storage.clone() as Arc<dyn PriceRepository>,
            source,
        );

        Ok(Self { storage, service })
    }

    /// Serialize per-ticker writes with other instances sharing `locks`.
    pub fn with_locks(mut self, locks: Arc<TickerLocks>) -> Self {
        self.service = self.service.with_locks(locks);
        self
    }

    // ── Backfill ────────────────────────────────────────────────────

    /// Backfill prices for every ticker of a portfolio, as of today (UTC).
    pub async fn backfill(&self, portfolio_id: i64) -> Result<BackfillSummary, CoreError> {
        self.service.run(portfolio_id).await
    }

    /// Backfill prices treating `today` as the run date.
    pub async fn backfill_on(
        &self,
        portfolio_id: i64,
        today: NaiveDate,
    ) -> Result<BackfillSummary, CoreError> {
        self.service.run_on(portfolio_id, today).await
    }

    // ── Lookups ─────────────────────────────────────────────────────

    /// Resolve a portfolio id from its name.
    pub fn portfolio_id(&self, name: &str) -> Result<i64, CoreError> {
        self.storage.portfolio_id_by_name(name)
    }

    /// All stored prices of `ticker`, oldest first.
    pub fn stored_prices(&self, ticker: &str) -> Result<Vec<PricePoint>, CoreError> {
        self.storage.prices_for(ticker)
    }

    /// Direct access to the underlying storage.
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }
}
