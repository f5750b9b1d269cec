pub mod backfill_service;
pub mod holding_service;
pub mod price_source;
pub mod range_filter;
pub mod split_reconciler;
pub mod ticker_locks;
