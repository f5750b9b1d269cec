use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::PriceProvider;
use crate::errors::CoreError;
use crate::models::price::ProviderQuote;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage API provider for daily equity closes.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (set via settings as "alphavantage").
/// - **Coverage**: 100k+ global equity symbols.
///
/// `TIME_SERIES_DAILY` has no date parameters, so the full series is requested
/// and clipped to the window locally.
pub struct AlphaVantageProvider {
    client: Client,
    api_key: String,
}

impl AlphaVantageProvider {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Meta Data")]
    meta: Option<MetaData>,

    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,

    #[serde(rename = "Error Message")]
    error_message: Option<String>,

    /// Rate-limit notices arrive as `Note` or `Information` with HTTP 200.
    #[serde(rename = "Note")]
    note: Option<String>,

    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Deserialize)]
struct MetaData {
    #[serde(rename = "2. Symbol")]
    symbol: String,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

/// Parse a `TIME_SERIES_DAILY` JSON body into rows within
/// `[start, end_exclusive)`, sorted by date.
///
/// A close that does not parse as a number is kept as `None`; the row is
/// dropped later during normalization.
pub fn parse_daily_series(
    body: &str,
    requested_symbol: &str,
    start: NaiveDate,
    end_exclusive: NaiveDate,
) -> Result<Vec<ProviderQuote>, CoreError> {
    let resp: TimeSeriesResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse time series for {requested_symbol}: {e}"),
    })?;

    if let Some(msg) = resp.error_message {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("{requested_symbol}: {msg}"),
        });
    }

    let time_series = resp.time_series.ok_or_else(|| {
        let reason = resp
            .note
            .or(resp.information)
            .unwrap_or_else(|| "no time series in response".to_string());
        CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No time series data for {requested_symbol}: {reason}"),
        }
    })?;

    let symbol = resp
        .meta
        .map(|m| m.symbol)
        .unwrap_or_else(|| requested_symbol.to_string());

    let mut rows: Vec<ProviderQuote> = time_series
        .iter()
        .filter_map(|(date_str, data)| {
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").ok()?;
            if date < start || date >= end_exclusive {
                return None;
            }
            Some(ProviderQuote::new(
                symbol.clone(),
                date,
                data.close.trim().parse().ok(),
            ))
        })
        .collect();

    rows.sort_by_key(|r| r.date);
    Ok(rows)
}

#[async_trait]
impl PriceProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_daily_closes(
        &self,
        symbol: &str,
        start: NaiveDate,
        end_exclusive: NaiveDate,
    ) -> Result<Vec<ProviderQuote>, CoreError> {
        let body = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        parse_daily_series(&body, symbol, start, end_exclusive)
    }
}
