use log::{debug, warn};

use crate::errors::CoreError;
use crate::models::price::PricePoint;
use crate::storage::traits::PriceWriter;

/// Maximum absolute difference between a stored and a freshly fetched close
/// for the same date before the ticker is considered split-adjusted.
///
/// Absorbs rounding noise only. This is a heuristic: a split whose ratio moves
/// the close by less than this goes unnoticed, and a provider correcting a bad
/// close by more than this resets the ticker needlessly.
pub const SPLIT_TOLERANCE: f64 = 0.02;

/// Slack for binary floating point when comparing 2-dp values against
/// [`SPLIT_TOLERANCE`]: 195.00 vs 195.02 must compare as equal to the tolerance.
const COMPARISON_SLACK: f64 = 1e-9;

/// What the reconciler concluded for one ticker.
#[derive(Debug, Clone, PartialEq)]
pub enum SplitCheck {
    /// Nothing stored yet (first run for this ticker).
    NothingStored,
    /// The latest stored date is not part of the fresh window; no comparison made.
    OutsideWindow { stored: PricePoint },
    /// Stored and fresh closes agree within tolerance.
    Consistent { stored: PricePoint },
    /// Mismatch: every stored row of the ticker was deleted.
    Reset {
        stored: PricePoint,
        fresh_close: f64,
        removed: usize,
    },
}

impl SplitCheck {
    pub fn is_reset(&self) -> bool {
        matches!(self, SplitCheck::Reset { .. })
    }
}

/// Detects retroactive split adjustments by comparing the most recent stored
/// close of a ticker with the fresh close for the same date.
///
/// Only that one date is compared. A split inside an already stored range is
/// missed whenever the latest stored date falls outside the fetched window.
pub struct SplitReconciler;

impl SplitReconciler {
    pub fn new() -> Self {
        Self
    }

    /// Compare and, on mismatch, wipe all stored prices of `ticker` so the
    /// following insert repopulates it from adjusted data.
    ///
    /// Run it inside [`PriceRepository::write_section`] together with that
    /// insert; a failed insert then also restores the wiped rows.
    ///
    /// [`PriceRepository::write_section`]: crate::storage::traits::PriceRepository::write_section
    pub fn reconcile(
        &self,
        store: &dyn PriceWriter,
        ticker: &str,
        fresh: &[PricePoint],
    ) -> Result<SplitCheck, CoreError> {
        let Some(stored) = store.latest_price(ticker)? else {
            return Ok(SplitCheck::NothingStored);
        };

        let Some(fresh_point) = fresh.iter().find(|p| p.date == stored.date) else {
            debug!(
                "{ticker}: latest stored date {} outside fetched window, split check skipped",
                stored.date
            );
            return Ok(SplitCheck::OutsideWindow { stored });
        };

        if !closes_differ(stored.close, fresh_point.close) {
            return Ok(SplitCheck::Consistent { stored });
        }

        let fresh_close = fresh_point.close;
        let removed = store.delete_ticker(ticker)?;
        warn!(
            "{ticker} reset: stored close {} on {} vs fresh {fresh_close}; deleted {removed} rows",
            stored.close, stored.date
        );

        Ok(SplitCheck::Reset {
            stored,
            fresh_close,
            removed,
        })
    }
}

impl Default for SplitReconciler {
    fn default() -> Self {
        Self::new()
    }
}

/// True when two closes differ by more than [`SPLIT_TOLERANCE`].
pub fn closes_differ(stored: f64, fresh: f64) -> bool {
    (stored - fresh).abs() > SPLIT_TOLERANCE + COMPARISON_SLACK
}
