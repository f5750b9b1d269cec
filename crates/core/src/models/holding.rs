use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A closed date interval `[start, end]` during which a ticker was held.
///
/// Ranges produced for one ticker are disjoint and sorted by `start`.
/// `end` never reaches the run date: an ongoing position is clamped to yesterday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HoldingRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl HoldingRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Inclusive on both bounds.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Smallest window covering every range, used as a single provider request.
/// Returns `None` when `ranges` is empty.
pub fn covering_window(ranges: &[HoldingRange]) -> Option<(NaiveDate, NaiveDate)> {
    let start = ranges.iter().map(|r| r.start).min()?;
    let end = ranges.iter().map(|r| r.end).max()?;
    Some((start, end))
}
