pub mod traits;

// API provider implementations
pub mod alphavantage;
pub mod yahoo_finance;

use crate::errors::CoreError;
use crate::models::settings::Settings;

use alphavantage::AlphaVantageProvider;
use traits::PriceProvider;
use yahoo_finance::YahooFinanceProvider;

/// Build the provider named in `settings.provider`.
///
/// - `yahoo`: no API key needed (default)
/// - `alphavantage`: requires `api_keys["alphavantage"]`
pub fn from_settings(settings: &Settings) -> Result<Box<dyn PriceProvider>, CoreError> {
    match settings.provider.as_str() {
        "yahoo" => Ok(Box::new(YahooFinanceProvider::new()?)),
        "alphavantage" => {
            let key = settings.api_keys.get("alphavantage").ok_or_else(|| {
                CoreError::Config("provider 'alphavantage' requires ALPHAVANTAGE_API_KEY".into())
            })?;
            Ok(Box::new(AlphaVantageProvider::new(key.clone())))
        }
        other => Err(CoreError::Config(format!(
            "unknown price provider '{other}' (expected 'yahoo' or 'alphavantage')"
        ))),
    }
}
