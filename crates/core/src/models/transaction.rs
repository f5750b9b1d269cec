use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::errors::CoreError;

/// Kind of portfolio transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// Buying / acquiring shares
    Buy,
    /// Selling / disposing of shares
    Sell,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Operation::Buy => write!(f, "buy"),
            Operation::Sell => write!(f, "sell"),
        }
    }
}

impl FromStr for Operation {
    type Err = String;

    /// Case-insensitive: the transaction table stores both `BUY` and `buy`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Operation::Buy),
            "sell" => Ok(Operation::Sell),
            other => Err(format!("unknown operation '{other}'")),
        }
    }
}

/// A single buy/sell row of a portfolio, as read from the transaction table.
///
/// Transactions are owned by the portfolio subsystem; the backfill engine only
/// reads them. Rows of one ticker are consumed in `(date, id)` order: the id
/// breaks ties between transactions on the same day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Storage row id
    pub id: i64,

    /// Ticker symbol as stored (e.g. "AAPL", "A1CAP.IS")
    pub ticker: String,

    /// Buy or Sell
    pub operation: Operation,

    /// Number of shares (always positive in well-formed input)
    pub quantity: f64,

    /// Trade date (daily granularity)
    pub date: NaiveDate,
}

impl Transaction {
    pub fn new(
        id: i64,
        ticker: impl Into<String>,
        operation: Operation,
        quantity: f64,
        date: NaiveDate,
    ) -> Self {
        Self {
            id,
            ticker: ticker.into(),
            operation,
            quantity,
            date,
        }
    }

    pub fn buy(id: i64, ticker: impl Into<String>, quantity: f64, date: NaiveDate) -> Self {
        Self::new(id, ticker, Operation::Buy, quantity, date)
    }

    pub fn sell(id: i64, ticker: impl Into<String>, quantity: f64, date: NaiveDate) -> Self {
        Self::new(id, ticker, Operation::Sell, quantity, date)
    }

    /// Signed effect of this transaction on the held quantity.
    pub fn signed_quantity(&self) -> f64 {
        match self.operation {
            Operation::Buy => self.quantity,
            Operation::Sell => -self.quantity,
        }
    }

    /// Parse an operation string read from storage, attributing failures to `ticker`.
    pub fn parse_operation(ticker: &str, raw: &str) -> Result<Operation, CoreError> {
        raw.parse().map_err(|reason| CoreError::InvalidTransaction {
            ticker: ticker.to_string(),
            reason,
        })
    }
}
