use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::errors::CoreError;

/// Default bound on a single provider request, in seconds.
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;

/// Default size of the SQLite connection pool.
pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Runtime settings for a backfill run.
///
/// Passed explicitly into [`crate::PriceBackfill`]; nothing in the library reads
/// the environment except [`Settings::from_env`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the SQLite database holding transactions and market prices.
    pub database_path: String,

    /// Price provider to use: "yahoo" (default) or "alphavantage".
    pub provider: String,

    /// Optional API keys for providers that require them.
    /// Keys: provider name (e.g., "alphavantage").
    /// Values: the API key string.
    pub api_keys: HashMap<String, String>,

    /// Upper bound on one provider fetch before it is treated as failed.
    pub fetch_timeout_secs: u64,

    /// Maximum number of pooled database connections.
    pub pool_size: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_path: "portfolio.db".to_string(),
            provider: "yahoo".to_string(),
            api_keys: HashMap::new(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

impl Settings {
    /// Load settings from the process environment, reading a `.env` file first
    /// when one exists.
    ///
    /// | Variable               | Field                | Required |
    /// |------------------------|----------------------|----------|
    /// | `DATABASE_URL`         | `database_path`      | yes      |
    /// | `PRICE_PROVIDER`       | `provider`           | no       |
    /// | `ALPHAVANTAGE_API_KEY` | `api_keys`           | no       |
    /// | `FETCH_TIMEOUT_SECS`   | `fetch_timeout_secs` | no       |
    /// | `DB_POOL_SIZE`         | `pool_size`          | no       |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_env_with(|_| None)
    }

    /// Same as [`Settings::from_env`], with `overrides` consulted before the
    /// environment (command-line flags).
    pub fn from_env_with<F>(overrides: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| overrides(key).or_else(|| std::env::var(key).ok()))
    }

    /// Build settings from an arbitrary key lookup. `from_env` delegates here;
    /// tests pass a map instead of touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let database_path = lookup("DATABASE_URL")
            .map(|url| strip_sqlite_scheme(&url))
            .filter(|path| !path.is_empty())
            .ok_or_else(|| CoreError::Config("DATABASE_URL is missing".into()))?;

        let provider = lookup("PRICE_PROVIDER")
            .map(|p| p.trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .unwrap_or(defaults.provider);

        let mut api_keys = HashMap::new();
        if let Some(key) = lookup("ALPHAVANTAGE_API_KEY").filter(|k| !k.is_empty()) {
            api_keys.insert("alphavantage".to_string(), key);
        }

        let fetch_timeout_secs = match lookup("FETCH_TIMEOUT_SECS") {
            Some(raw) => parse_positive("FETCH_TIMEOUT_SECS", &raw)?,
            None => defaults.fetch_timeout_secs,
        };

        let pool_size = match lookup("DB_POOL_SIZE") {
            Some(raw) => parse_positive("DB_POOL_SIZE", &raw)? as u32,
            None => defaults.pool_size,
        };

        Ok(Self {
            database_path,
            provider,
            api_keys,
            fetch_timeout_secs,
            pool_size,
        })
    }
}

/// Accept both a bare path and a `sqlite://` URL.
fn strip_sqlite_scheme(url: &str) -> String {
    let trimmed = url.trim();
    trimmed
        .strip_prefix("sqlite://")
        .or_else(|| trimmed.strip_prefix("sqlite:"))
        .unwrap_or(trimmed)
        .to_string()
}

fn parse_positive(key: &str, raw: &str) -> Result<u64, CoreError> {
    match raw.trim().parse::<u64>() {
        Ok(value) if value > 0 && value <= u32::MAX as u64 => Ok(value),
        _ => Err(CoreError::Config(format!(
            "{key} must be a positive integer, got '{raw}'"
        ))),
    }
}
