// ═══════════════════════════════════════════════════════════════════
// Error Tests — CoreError variants, Display formatting, From impls
// ═══════════════════════════════════════════════════════════════════

use price_backfill_core::errors::{redact_query, CoreError};

// ── Display formatting ──────────────────────────────────────────────

mod display {
    use super::*;

    #[test]
    fn config() {
        let err = CoreError::Config("DATABASE_URL is missing".into());
        assert_eq!(err.to_string(), "Configuration error: DATABASE_URL is missing");
    }

    #[test]
    fn database() {
        let err = CoreError::Database("no such table: market_prices".into());
        assert_eq!(err.to_string(), "Database error: no such table: market_prices");
    }

    #[test]
    fn pool() {
        let err = CoreError::Pool("timed out waiting for connection".into());
        assert_eq!(
            err.to_string(),
            "Database pool error: timed out waiting for connection"
        );
    }

    #[test]
    fn api_error() {
        let err = CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: "HTTP 429".into(),
        };
        assert_eq!(err.to_string(), "API error (Yahoo Finance): HTTP 429");
    }

    #[test]
    fn network() {
        let err = CoreError::Network("connection refused".into());
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn timeout() {
        let err = CoreError::Timeout {
            symbol: "AAPL".into(),
            seconds: 30,
        };
        assert_eq!(err.to_string(), "Price fetch for AAPL timed out after 30s");
    }

    #[test]
    fn invalid_transaction() {
        let err = CoreError::InvalidTransaction {
            ticker: "AAPL".into(),
            reason: "sell of 10 on 2024-01-04 exceeds the 5 held".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid transaction history for AAPL: sell of 10 on 2024-01-04 exceeds the 5 held"
        );
    }

    #[test]
    fn portfolio_not_found() {
        let err = CoreError::PortfolioNotFound("FirstPortf".into());
        assert_eq!(err.to_string(), "Portfolio not found: FirstPortf");
    }

    #[test]
    fn serialization() {
        assert_eq!(
            CoreError::Serialization("bad".into()).to_string(),
            "Serialization error: bad"
        );
    }
}

// ── Classification ──────────────────────────────────────────────────

mod classification {
    use super::*;

    #[test]
    fn storage_errors_abort() {
        assert!(CoreError::Database("x".into()).is_storage());
        assert!(CoreError::Pool("x".into()).is_storage());
    }

    #[test]
    fn everything_else_is_contained() {
        let contained = vec![
            CoreError::Config("x".into()),
            CoreError::Serialization("x".into()),
            CoreError::Api {
                provider: "p".into(),
                message: "m".into(),
            },
            CoreError::Network("x".into()),
            CoreError::Timeout {
                symbol: "AAPL".into(),
                seconds: 1,
            },
            CoreError::InvalidTransaction {
                ticker: "AAPL".into(),
                reason: "r".into(),
            },
            CoreError::PortfolioNotFound("x".into()),
        ];
        for err in &contained {
            assert!(!err.is_storage(), "{:?} should not be a storage error", err);
        }
    }
}

// ── From impls ──────────────────────────────────────────────────────

mod from_impls {
    use super::*;

    #[test]
    fn from_serde_json_error() {
        let result: Result<serde_json::Value, _> = serde_json::from_str("{{invalid json");
        let core_err: CoreError = result.unwrap_err().into();
        match &core_err {
            CoreError::Serialization(msg) => assert!(!msg.is_empty()),
            other => panic!("Expected Serialization, got {:?}", other),
        }
    }

    #[test]
    fn from_rusqlite_error() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        let sql_err = conn.execute("SELECT * FROM missing_table", []).unwrap_err();
        let core_err: CoreError = sql_err.into();
        match &core_err {
            CoreError::Database(msg) => assert!(msg.contains("missing_table")),
            other => panic!("Expected Database, got {:?}", other),
        }
    }
}

// ── Query redaction ─────────────────────────────────────────────────

mod redaction {
    use super::*;

    #[test]
    fn strips_query_string() {
        let msg = "error sending request for url (https://www.alphavantage.co/query?function=TIME_SERIES_DAILY&apikey=SECRET)";
        let redacted = redact_query(msg);
        assert!(!redacted.contains("SECRET"));
        assert_eq!(
            redacted,
            "error sending request for url (https://www.alphavantage.co/query?<query redacted>"
        );
    }

    #[test]
    fn leaves_plain_messages_alone() {
        assert_eq!(redact_query("connection refused"), "connection refused");
    }
}

// ── std::error::Error ───────────────────────────────────────────────

mod std_error {
    use super::*;

    #[test]
    fn core_error_implements_error_trait() {
        let err: Box<dyn std::error::Error> = Box::new(CoreError::Network("x".into()));
        assert_eq!(err.to_string(), "Network error: x");
    }

    #[test]
    fn core_error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CoreError>();
    }
}
