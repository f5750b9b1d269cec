use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::transaction::Transaction;

/// Read-only view of the portfolio/transaction tables.
///
/// Owned by the portfolio subsystem; the backfill engine never writes through it.
pub trait TransactionRepository: Send + Sync {
    /// Distinct ticker symbols that appear in the portfolio's transactions.
    fn distinct_tickers(&self, portfolio_id: i64) -> Result<Vec<String>, CoreError>;

    /// Transactions of one ticker, ordered by date then storage order.
    fn transactions_for(
        &self,
        portfolio_id: i64,
        ticker: &str,
    ) -> Result<Vec<Transaction>, CoreError>;

    /// Resolve a portfolio id from its display name.
    fn portfolio_id_by_name(&self, name: &str) -> Result<i64, CoreError>;
}

/// Writes and the read they depend on, over the market price table
/// (unique on `(ticker, date)`).
///
/// Insert-or-skip and the per-ticker wipe are the only supported writes.
pub trait PriceWriter {
    /// Most recent stored price of `ticker` (max date), if any.
    fn latest_price(&self, ticker: &str) -> Result<Option<PricePoint>, CoreError>;

    /// Delete every stored price of `ticker`. Returns the number of rows removed.
    fn delete_ticker(&self, ticker: &str) -> Result<usize, CoreError>;

    /// Insert `points` as one atomic batch, skipping rows whose `(ticker, date)`
    /// already exists. Returns the number of rows actually inserted.
    fn insert_prices(&self, ticker: &str, points: &[PricePoint]) -> Result<usize, CoreError>;
}

/// The market price table as seen by the backfill engine.
pub trait PriceRepository: PriceWriter + Send + Sync {
    /// Every stored price of `ticker`, oldest first.
    fn prices_for(&self, ticker: &str) -> Result<Vec<PricePoint>, CoreError>;

    /// Run `section` as one write transaction.
    ///
    /// Everything `section` writes through the given writer commits together,
    /// or nothing does when it returns an error. Sections on the same store
    /// never overlap, including sections from other store instances or
    /// processes sharing the same database.
    fn write_section(
        &self,
        section: &mut dyn FnMut(&dyn PriceWriter) -> Result<(), CoreError>,
    ) -> Result<(), CoreError>;
}
