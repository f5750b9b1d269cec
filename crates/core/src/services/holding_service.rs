use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::holding::HoldingRange;
use crate::models::transaction::Transaction;

/// Running quantities closer to zero than this are treated as exactly zero,
/// so fractional buy/sell sequences (0.1 + 0.2 − 0.3) close their range.
pub const QUANTITY_EPSILON: f64 = 1e-9;

/// Replays a ticker's transactions and derives the date ranges during which
/// the position was held.
///
/// Pure business logic: no I/O, no API calls.
pub struct HoldingService;

impl HoldingService {
    pub fn new() -> Self {
        Self
    }

    /// Compute the holding ranges of one ticker as of `today`.
    ///
    /// Transactions are replayed in date order (ties keep their input order).
    /// A range opens when the running quantity crosses from ≤0 to >0 and closes
    /// when it falls back to ≤0; the close date is capped at yesterday and a
    /// range whose start lies after that cap is dropped. A position still open
    /// at the end is closed at yesterday.
    ///
    /// Rejects, for the whole ticker:
    /// - a transaction whose quantity is not a finite positive number
    /// - a sell that takes the running quantity below zero
    pub fn holding_ranges(
        &self,
        ticker: &str,
        transactions: &[Transaction],
        today: NaiveDate,
    ) -> Result<Vec<HoldingRange>, CoreError> {
        let Some(yesterday) = today.pred_opt() else {
            return Ok(Vec::new());
        };

        let mut ordered: Vec<&Transaction> = transactions.iter().collect();
        ordered.sort_by_key(|t| t.date); // stable: same-day rows keep storage order

        let mut qty = 0.0_f64;
        let mut range_start: Option<NaiveDate> = None;
        let mut ranges: Vec<HoldingRange> = Vec::new();

        for txn in ordered {
            if !txn.quantity.is_finite() || txn.quantity <= 0.0 {
                return Err(CoreError::InvalidTransaction {
                    ticker: ticker.to_string(),
                    reason: format!(
                        "{} of {} on {} has a non-positive quantity",
                        txn.operation, txn.quantity, txn.date
                    ),
                });
            }

            let prev_qty = qty;
            qty = snap_to_zero(qty + txn.signed_quantity());

            if qty < 0.0 {
                return Err(CoreError::InvalidTransaction {
                    ticker: ticker.to_string(),
                    reason: format!(
                        "sell of {} on {} exceeds the {} held",
                        txn.quantity, txn.date, prev_qty
                    ),
                });
            }

            // Crossed from 0 → positive
            if prev_qty <= 0.0 && qty > 0.0 && range_start.is_none() {
                range_start = Some(txn.date);
            }

            // Crossed from positive → 0
            if prev_qty > 0.0 && qty <= 0.0 {
                if let Some(start) = range_start.take() {
                    push_range(&mut ranges, start, txn.date.min(yesterday));
                }
            }
        }

        // Still holding → range extends to yesterday
        if qty > 0.0 {
            if let Some(start) = range_start {
                push_range(&mut ranges, start, yesterday);
            }
        }

        Ok(ranges)
    }
}

impl Default for HoldingService {
    fn default() -> Self {
        Self::new()
    }
}

fn snap_to_zero(qty: f64) -> f64 {
    if qty.abs() < QUANTITY_EPSILON {
        0.0
    } else {
        qty
    }
}

/// Append `[start, end]` if non-empty, merging it into the previous range when
/// the two overlap or touch (a sell-out and a re-buy on consecutive days or on
/// the same day).
fn push_range(ranges: &mut Vec<HoldingRange>, start: NaiveDate, end: NaiveDate) {
    if start > end {
        return;
    }
    if let Some(last) = ranges.last_mut() {
        let touches = last.end.succ_opt().map_or(true, |next| start <= next);
        if touches {
            last.end = last.end.max(end);
            return;
        }
    }
    ranges.push(HoldingRange::new(start, end));
}
