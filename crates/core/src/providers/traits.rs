use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::ProviderQuote;

/// Trait abstraction for daily market-data providers (SOLID: Dependency Inversion).
///
/// Each API provider (Yahoo Finance, Alpha Vantage) implements this trait.
/// Implementations return raw rows; normalization (rounding, today exclusion,
/// symbol selection) is done once, in [`crate::services::price_source`].
#[async_trait]
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Daily closes for `symbol` from `start` (inclusive) to `end_exclusive`.
    ///
    /// The end bound is exclusive, matching the upstream chart APIs; callers
    /// wanting an inclusive end pass the following day.
    async fn get_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<ProviderQuote>, CoreError>;
}
