use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A daily closing price for one ticker.
///
/// Identity is `(ticker, date)`; the store enforces uniqueness on that pair.
/// `close` is rounded to 2 decimal places at ingestion (see [`round_price`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub ticker: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(ticker: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            ticker: ticker.into(),
            date,
            close: round_price(close),
        }
    }
}

/// One raw row as returned by a price provider, before normalization.
///
/// Providers may answer with several symbol variants for one request
/// (e.g. `A1CAP` and `A1CAP.IS`), and may report missing closes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderQuote {
    pub symbol: String,
    pub date: NaiveDate,
    pub close: Option<f64>,
}

impl ProviderQuote {
    pub fn new(symbol: impl Into<String>, date: NaiveDate, close: Option<f64>) -> Self {
        Self {
            symbol: symbol.into(),
            date,
            close,
        }
    }
}

/// Round a monetary value to 2 decimal places (half away from zero).
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
