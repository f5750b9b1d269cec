// ═══════════════════════════════════════════════════════════════════
// Model Tests — Operation, Transaction, Settings, BackfillSummary
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;
use std::collections::HashMap;

use price_backfill_core::errors::CoreError;
use price_backfill_core::models::settings::{
    Settings, DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_POOL_SIZE,
};
use price_backfill_core::models::summary::BackfillSummary;
use price_backfill_core::models::transaction::{Operation, Transaction};

fn make_date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Operation / Transaction
// ═══════════════════════════════════════════════════════════════════

mod operation {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("BUY".parse::<Operation>(), Ok(Operation::Buy));
        assert_eq!("buy".parse::<Operation>(), Ok(Operation::Buy));
        assert_eq!(" Sell ".parse::<Operation>(), Ok(Operation::Sell));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert_eq!(
            "dividend".parse::<Operation>(),
            Err("unknown operation 'dividend'".to_string())
        );
    }

    #[test]
    fn display_lowercase() {
        assert_eq!(Operation::Buy.to_string(), "buy");
        assert_eq!(Operation::Sell.to_string(), "sell");
    }

    #[test]
    fn serde_lowercase() {
        assert_eq!(serde_json::to_string(&Operation::Sell).unwrap(), "\"sell\"");
        let op: Operation = serde_json::from_str("\"buy\"").unwrap();
        assert_eq!(op, Operation::Buy);
    }

    #[test]
    fn signed_quantity() {
        let d = make_date(2024, 1, 2);
        assert_eq!(Transaction::buy(1, "AAPL", 2.5, d).signed_quantity(), 2.5);
        assert_eq!(Transaction::sell(2, "AAPL", 2.5, d).signed_quantity(), -2.5);
    }

    #[test]
    fn parse_operation_names_ticker() {
        let err = Transaction::parse_operation("AAPL", "SPLIT").unwrap_err();
        match err {
            CoreError::InvalidTransaction { ticker, reason } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(reason, "unknown operation 'split'");
            }
            other => panic!("Expected InvalidTransaction, got {:?}", other),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════
// Settings
// ═══════════════════════════════════════════════════════════════════

mod settings {
    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.provider, "yahoo");
        assert_eq!(s.fetch_timeout_secs, DEFAULT_FETCH_TIMEOUT_SECS);
        assert_eq!(s.pool_size, DEFAULT_POOL_SIZE);
        assert!(s.api_keys.is_empty());
    }

    #[test]
    fn minimal_environment() {
        let s = Settings::from_lookup(lookup(&[("DATABASE_URL", "/tmp/p.db")])).unwrap();
        assert_eq!(s.database_path, "/tmp/p.db");
        assert_eq!(s.provider, "yahoo");
        assert_eq!(s.fetch_timeout_secs, 30);
        assert_eq!(s.pool_size, 4);
    }

    #[test]
    fn sqlite_url_scheme_is_stripped() {
        let s = Settings::from_lookup(lookup(&[("DATABASE_URL", "sqlite://data/p.db")])).unwrap();
        assert_eq!(s.database_path, "data/p.db");
        let s = Settings::from_lookup(lookup(&[("DATABASE_URL", "sqlite:p.db")])).unwrap();
        assert_eq!(s.database_path, "p.db");
    }

    #[test]
    fn missing_database_url() {
        let err = Settings::from_lookup(lookup(&[])).unwrap_err();
        assert_eq!(err.to_string(), "Configuration error: DATABASE_URL is missing");

        let err = Settings::from_lookup(lookup(&[("DATABASE_URL", "sqlite://")])).unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn full_environment() {
        let s = Settings::from_lookup(lookup(&[
            ("DATABASE_URL", "p.db"),
            ("PRICE_PROVIDER", " AlphaVantage "),
            ("ALPHAVANTAGE_API_KEY", "KEY123"),
            ("FETCH_TIMEOUT_SECS", "5"),
            ("DB_POOL_SIZE", "8"),
        ]))
        .unwrap();
        assert_eq!(s.provider, "alphavantage");
        assert_eq!(s.api_keys.get("alphavantage").map(String::as_str), Some("KEY123"));
        assert_eq!(s.fetch_timeout_secs, 5);
        assert_eq!(s.pool_size, 8);
    }

    #[test]
    fn non_positive_numbers_rejected() {
        for (key, raw) in [
            ("FETCH_TIMEOUT_SECS", "0"),
            ("FETCH_TIMEOUT_SECS", "soon"),
            ("DB_POOL_SIZE", "-1"),
        ] {
            let err = Settings::from_lookup(lookup(&[("DATABASE_URL", "p.db"), (key, raw)]))
                .unwrap_err();
            assert_eq!(
                err.to_string(),
                format!("Configuration error: {key} must be a positive integer, got '{raw}'")
            );
        }
    }

    #[test]
    fn overrides_take_precedence() {
        let s = Settings::from_env_with(|key| match key {
            "DATABASE_URL" => Some("override.db".to_string()),
            "PRICE_PROVIDER" => Some("alphavantage".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(s.database_path, "override.db");
        assert_eq!(s.provider, "alphavantage");
    }
}

// ═══════════════════════════════════════════════════════════════════
// BackfillSummary
// ═══════════════════════════════════════════════════════════════════

mod summary {
    use super::*;

    #[test]
    fn totals() {
        let mut s = BackfillSummary {
            tickers_processed: 3,
            ..BackfillSummary::default()
        };
        s.details.insert("AAPL".into(), 5);
        s.details.insert("MSFT".into(), 0);
        s.details.insert("TSLA".into(), 2);

        assert_eq!(s.rows_written(), 7);
        assert_eq!(s.rows_for("MSFT"), Some(0));
        assert_eq!(s.rows_for("VOO"), None);
    }

    #[test]
    fn reset_and_skipped_serialized_when_present() {
        let mut s = BackfillSummary {
            tickers_processed: 2,
            ..BackfillSummary::default()
        };
        s.details.insert("AAPL".into(), 8);
        s.details.insert("MSFT".into(), 0);
        s.reset.insert("AAPL".into());
        s.skipped.insert("MSFT".into(), "bad history".into());

        let value = serde_json::to_value(&s).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "tickers_processed": 2,
                "details": { "AAPL": 8, "MSFT": 0 },
                "reset": ["AAPL"],
                "skipped": { "MSFT": "bad history" }
            })
        );

        let back: BackfillSummary = serde_json::from_value(value).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn minimal_json_deserializes() {
        let s: BackfillSummary =
            serde_json::from_str(r#"{ "tickers_processed": 0, "details": {} }"#).unwrap();
        assert_eq!(s, BackfillSummary::default());
    }
}
