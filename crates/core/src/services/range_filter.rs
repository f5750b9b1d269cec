use crate::models::holding::HoldingRange;
use crate::models::price::PricePoint;

/// Keep only the points whose date lies inside at least one holding range
/// (bounds inclusive). Order is preserved.
///
/// The fetched window covers the gaps between ranges too, so dropping points
/// here is the normal case.
pub fn filter_to_ranges(prices: Vec<PricePoint>, ranges: &[HoldingRange]) -> Vec<PricePoint> {
    prices
        .into_iter()
        .filter(|p| ranges.iter().any(|r| r.contains(p.date)))
        .collect()
}
