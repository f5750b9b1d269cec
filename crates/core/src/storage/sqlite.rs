use chrono::NaiveDate;
use log::debug;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::traits::{PriceRepository, PriceWriter, TransactionRepository};
use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::models::transaction::{Operation, Transaction};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Wait this long on a locked database before failing a statement.
const BUSY_TIMEOUT_MS: u32 = 5_000;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS portfolios (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE IF NOT EXISTS transactions (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        portfolio_id INTEGER NOT NULL REFERENCES portfolios(id),
        ticker TEXT NOT NULL,
        operation TEXT NOT NULL,
        quantity REAL NOT NULL,
        date TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_portfolio_ticker
        ON transactions(portfolio_id, ticker, date);
    CREATE TABLE IF NOT EXISTS market_prices (
        ticker TEXT NOT NULL,
        date TEXT NOT NULL,
        close REAL NOT NULL,
        PRIMARY KEY (ticker, date)
    );";

/// SQLite-backed storage for both the transaction tables (read side) and the
/// market price table.
pub struct SqliteStorage {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteStorage {
    /// Open (or create) a database file with a pool of `pool_size` connections.
    pub fn open(path: &str, pool_size: u32) -> Result<Self, CoreError> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.busy_timeout(std::time::Duration::from_millis(BUSY_TIMEOUT_MS as u64))
        });
        let pool = Pool::builder().max_size(pool_size.max(1)).build(manager)?;
        Ok(Self { pool })
    }

    /// A private in-memory database. The pool holds a single connection so
    /// every call sees the same data.
    pub fn in_memory() -> Result<Self, CoreError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager)?;
        Ok(Self { pool })
    }

    /// Create the tables if they do not exist yet. Safe to call repeatedly.
    pub fn initialize_schema(&self) -> Result<(), CoreError> {
        self.conn()?.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Insert a portfolio row and return its id.
    pub fn create_portfolio(&self, name: &str) -> Result<i64, CoreError> {
        let conn = self.conn()?;
        conn.execute("INSERT INTO portfolios (name) VALUES (?1)", params![name])?;
        Ok(conn.last_insert_rowid())
    }

    /// Insert a transaction row and return its id.
    ///
    /// Transaction CRUD belongs to the portfolio subsystem; this exists for
    /// seeding databases and test fixtures.
    pub fn insert_transaction(
        &self,
        portfolio_id: i64,
        ticker: &str,
        operation: Operation,
        quantity: f64,
        date: NaiveDate,
    ) -> Result<i64, CoreError> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transactions (portfolio_id, ticker, operation, quantity, date)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                portfolio_id,
                ticker,
                operation.to_string().to_uppercase(),
                quantity,
                date.format(DATE_FORMAT).to_string()
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, CoreError> {
        Ok(self.pool.get()?)
    }
}

fn parse_date(raw: &str) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl TransactionRepository for SqliteStorage {
    fn distinct_tickers(&self, portfolio_id: i64) -> Result<Vec<String>, CoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT DISTINCT ticker FROM transactions WHERE portfolio_id = ?1 ORDER BY ticker",
        )?;
        let tickers = stmt
            .query_map(params![portfolio_id], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(tickers)
    }

    fn transactions_for(
        &self,
        portfolio_id: i64,
        ticker: &str,
    ) -> Result<Vec<Transaction>, CoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, operation, quantity, date
             FROM transactions
             WHERE portfolio_id = ?1 AND ticker = ?2
             ORDER BY date ASC, id ASC",
        )?;

        let rows = stmt
            .query_map(params![portfolio_id, ticker], |row| {
                let date_str: String = row.get(3)?;
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, f64>(2)?,
                    parse_date(&date_str)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        // Operation strings are validated outside the row mapper so a bad
        // value surfaces as a transaction problem, not a storage failure.
        rows.into_iter()
            .map(|(id, raw_op, quantity, date)| -> Result<Transaction, CoreError> {
                let operation = Transaction::parse_operation(ticker, &raw_op)?;
                Ok(Transaction::new(id, ticker, operation, quantity, date))
            })
            .collect()
    }

    fn portfolio_id_by_name(&self, name: &str) -> Result<i64, CoreError> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id FROM portfolios WHERE name = ?1 ORDER BY id LIMIT 1",
            params![name],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| CoreError::PortfolioNotFound(name.to_string()))
    }
}

impl PriceWriter for SqliteStorage {
    fn latest_price(&self, ticker: &str) -> Result<Option<PricePoint>, CoreError> {
        latest_price_on(&*self.conn()?, ticker)
    }

    fn delete_ticker(&self, ticker: &str) -> Result<usize, CoreError> {
        delete_ticker_on(&*self.conn()?, ticker)
    }

    fn insert_prices(&self, ticker: &str, points: &[PricePoint]) -> Result<usize, CoreError> {
        if points.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let inserted = insert_prices_on(&tx, ticker, points)?;
        // Dropping `tx` without commit rolls the whole batch back.
        tx.commit()?;
        Ok(inserted)
    }
}

impl PriceRepository for SqliteStorage {
    fn prices_for(&self, ticker: &str) -> Result<Vec<PricePoint>, CoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT date, close FROM market_prices WHERE ticker = ?1 ORDER BY date ASC",
        )?;
        let points = stmt
            .query_map(params![ticker], |row| {
                let date_str: String = row.get(0)?;
                Ok(PricePoint::new(ticker, parse_date(&date_str)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }

    /// `BEGIN IMMEDIATE` takes the database write lock up front, so sections
    /// from any connection to the same file run one after another (waiting up
    /// to the busy timeout).
    fn write_section(
        &self,
        section: &mut dyn FnMut(&dyn PriceWriter) -> Result<(), CoreError>,
    ) -> Result<(), CoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        section(&SectionWriter { conn: &tx })?;
        tx.commit()?;
        Ok(())
    }
}

/// Writer bound to an open transaction; its statements commit with it.
struct SectionWriter<'a> {
    conn: &'a Connection,
}

impl PriceWriter for SectionWriter<'_> {
    fn latest_price(&self, ticker: &str) -> Result<Option<PricePoint>, CoreError> {
        latest_price_on(self.conn, ticker)
    }

    fn delete_ticker(&self, ticker: &str) -> Result<usize, CoreError> {
        delete_ticker_on(self.conn, ticker)
    }

    fn insert_prices(&self, ticker: &str, points: &[PricePoint]) -> Result<usize, CoreError> {
        insert_prices_on(self.conn, ticker, points)
    }
}

// ── Price table statements ──────────────────────────────────────────

fn latest_price_on(conn: &Connection, ticker: &str) -> Result<Option<PricePoint>, CoreError> {
    let row = conn
        .query_row(
            "SELECT date, close FROM market_prices
             WHERE ticker = ?1
             ORDER BY date DESC
             LIMIT 1",
            params![ticker],
            |row| {
                let date_str: String = row.get(0)?;
                Ok((parse_date(&date_str)?, row.get::<_, f64>(1)?))
            },
        )
        .optional()?;

    Ok(row.map(|(date, close)| PricePoint::new(ticker, date, close)))
}

fn delete_ticker_on(conn: &Connection, ticker: &str) -> Result<usize, CoreError> {
    let removed = conn.execute(
        "DELETE FROM market_prices WHERE ticker = ?1",
        params![ticker],
    )?;
    Ok(removed)
}

fn insert_prices_on(
    conn: &Connection,
    ticker: &str,
    points: &[PricePoint],
) -> Result<usize, CoreError> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO market_prices (ticker, date, close)
         VALUES (?1, ?2, ?3)
         ON CONFLICT (ticker, date) DO NOTHING",
    )?;
    let mut inserted = 0;
    for point in points {
        inserted += stmt.execute(params![
            ticker,
            point.date.format(DATE_FORMAT).to_string(),
            point.close
        ])?;
    }

    debug!("{ticker}: {inserted} of {} rows inserted", points.len());
    Ok(inserted)
}
