use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use log::debug;
use time::OffsetDateTime;
use yahoo_finance_api as yahoo;

use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::price::ProviderQuote;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance API provider for daily equity closes.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices, mutual funds.
/// - **Adjustment**: Yahoo's `close` is split-adjusted retroactively, which is
///   exactly what the split reconciler watches for.
///
/// Uses the `yahoo_finance_api` crate which wraps Yahoo Finance's public
/// chart endpoint. The chart endpoint treats the end timestamp as exclusive.
pub struct YahooFinanceProvider {
    connector: yahoo::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let ts = date.and_time(NaiveTime::MIN).and_utc().timestamp();
        OffsetDateTime::from_unix_timestamp(ts).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid date {date}: {e}"),
        })
    }

    /// Trading date of a daily bar.
    ///
    /// Yahoo stamps daily bars at the session open in UTC; shifting by the
    /// exchange's `gmtoffset` (seconds east of UTC) gives the local calendar
    /// date. An ASX bar stamped 23:00 UTC belongs to the following day.
    pub fn exchange_date(timestamp: i64, gmtoffset: i32) -> Option<NaiveDate> {
        timestamp
            .checked_add(i64::from(gmtoffset))
            .and_then(|local| chrono::DateTime::from_timestamp(local, 0))
            .map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<ProviderQuote>, CoreError> {
        // Session opens fall on the neighbouring UTC day for exchanges far
        // from UTC, so ask for one extra day on each side and clip locally.
        let padded_start = start.pred_opt().unwrap_or(start);
        let padded_end = end_exclusive.succ_opt().unwrap_or(end_exclusive);
        let from = Self::to_offset_datetime(padded_start)?;
        let to = Self::to_offset_datetime(padded_end)?;

        let resp = match self.connector.get_quote_history(symbol, from, to).await {
            Ok(resp) => resp,
            // No trading days in the window: an empty answer, not a failure.
            Err(yahoo::YahooError::NoQuotes) | Err(yahoo::YahooError::NoResult) => {
                debug!("{PROVIDER}: no quotes for {symbol} in [{start}, {end_exclusive})");
                return Ok(Vec::new());
            }
            Err(e) => {
                return Err(CoreError::Api {
                    provider: PROVIDER.into(),
                    message: format!("Failed to fetch history for {symbol}: {e}"),
                })
            }
        };

        let quotes = match resp.quotes() {
            Ok(quotes) => quotes,
            Err(yahoo::YahooError::NoQuotes) => return Ok(Vec::new()),
            Err(e) => {
                return Err(CoreError::Api {
                    provider: PROVIDER.into(),
                    message: format!("Failed to parse quotes for {symbol}: {e}"),
                })
            }
        };

        let gmtoffset = match resp.metadata() {
            Ok(meta) => meta.gmtoffset,
            Err(e) => {
                debug!("{PROVIDER}: no metadata for {symbol}, dating bars in UTC: {e}");
                0
            }
        };

        let rows = quotes
            .iter()
            .filter_map(|q| {
                let date = Self::exchange_date(q.timestamp, gmtoffset)?;
                (date >= start && date < end_exclusive)
                    .then(|| ProviderQuote::new(symbol, date, Some(q.close)))
            })
            .collect();

        Ok(rows)
    }
}
