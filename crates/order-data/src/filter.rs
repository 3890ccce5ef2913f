//! Date-range and cohort selection over enriched orders.

use order_core::date_range::DateRange;
use order_core::models::{Cohort, EnrichedOrder, EnrichedTable};

/// Rows whose order date lies within `range`, both ends inclusive.
///
/// The comparison is on the calendar date of `order_at`, so every order placed
/// on `range.end()` is kept regardless of its time of day. Returns a new table
/// (possibly empty) in the original row order.
pub fn filter_by_range(table: &EnrichedTable, range: &DateRange) -> EnrichedTable {
    let rows = table
        .rows
        .iter()
        .filter(|r| range.contains(r.order.order_at.date()))
        .cloned()
        .collect();
    table.with_rows(rows)
}

/// Rows belonging to `cohort`.
pub fn cohort_rows(rows: &[EnrichedOrder], cohort: Cohort) -> impl Iterator<Item = &EnrichedOrder> {
    rows.iter().filter(move |r| r.cohort() == cohort)
}
