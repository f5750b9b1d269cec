use thiserror::Error;

/// Unified error type for the entire price-backfill-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Configuration ───────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    // ── Storage / Database ──────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database pool error: {0}")]
    Pool(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Price fetch for {symbol} timed out after {seconds}s")]
    Timeout { symbol: String, seconds: u64 },

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Invalid transaction history for {ticker}: {reason}")]
    InvalidTransaction { ticker: String, reason: String },

    #[error("Portfolio not found: {0}")]
    PortfolioNotFound(String),
}

impl CoreError {
    /// Storage-layer failures abort a backfill run; everything else is
    /// contained to the ticker that produced it.
    pub fn is_storage(&self) -> bool {
        matches!(self, CoreError::Database(_) | CoreError::Pool(_))
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Database(e.to_string())
    }
}

impl From<r2d2::Error> for CoreError {
    fn from(e: r2d2::Error) -> Self {
        CoreError::Pool(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Sanitize error message: strip query parameters from URLs to prevent
        // API key leakage. reqwest errors often contain full URLs with secrets.
        let msg = e.to_string();
        CoreError::Network(redact_query(&msg))
    }
}

/// Replace everything after the first `?` with a redaction marker.
pub fn redact_query(msg: &str) -> String {
    match msg.find('?') {
        Some(idx) => format!("{}?<query redacted>", &msg[..idx]),
        None => msg.to_string(),
    }
}
