//! Enrichment of raw orders with their analytical columns.
//!
//! Three passes over the loaded table:
//!
//! 1. classification of `purchase_url` into a [`TrafficSource`];
//! 2. a per-customer window ordered by `(order_at, row_index)` that yields the
//!    running purchase count and the customer's first order timestamp;
//! 3. derived fields: first flag, month / year labels and price segment.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use order_core::models::{
    EnrichedOrder, EnrichedTable, OrderRecord, OrderTable, PriceThresholds, TrafficSource,
};
use tracing::debug;

/// Position of one order inside its customer's history.
#[derive(Debug, Clone, Copy)]
struct WindowSlot {
    purchase_count: u32,
    first_order_date: NaiveDateTime,
}

/// Adds the derived columns to every order of a table.
#[derive(Debug, Clone, Default)]
pub struct Enricher {
    thresholds: PriceThresholds,
}

impl Enricher {
    pub fn new(thresholds: PriceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> PriceThresholds {
        self.thresholds
    }

    /// Enrich `table`, keeping row count and row order.
    pub fn enrich(&self, table: OrderTable) -> EnrichedTable {
        let slots = customer_windows(&table.rows);

        let rows: Vec<EnrichedOrder> = table
            .rows
            .into_iter()
            .zip(slots)
            .map(|(order, slot)| self.enrich_row(order, slot))
            .collect();

        debug!(
            "Enriched {} orders, {} first orders",
            rows.len(),
            rows.iter().filter(|r| r.first_flag).count()
        );

        EnrichedTable {
            headers: table.headers,
            layout: table.layout,
            rows,
        }
    }

    fn enrich_row(&self, order: OrderRecord, slot: WindowSlot) -> EnrichedOrder {
        EnrichedOrder {
            traffic_source: TrafficSource::classify(&order.purchase_url),
            purchase_count: slot.purchase_count,
            first_order_date: slot.first_order_date,
            first_flag: slot.purchase_count == 1,
            month: order.order_at.format("%Y-%m").to_string(),
            year: order.order_at.format("%Y").to_string(),
            price_segment: self.thresholds.segment(order.paid_price),
            order,
        }
    }
}

/// Enrich with the default price thresholds.
pub fn enrich(table: OrderTable) -> EnrichedTable {
    Enricher::default().enrich(table)
}

/// Compute the window slot of every row, indexed like `rows`.
///
/// Each customer's rows are ordered by timestamp with the input row index as
/// tie-break, so equal timestamps keep file order and only the earliest row
/// of a customer gets `purchase_count == 1`.
fn customer_windows(rows: &[OrderRecord]) -> Vec<WindowSlot> {
    let mut partitions: HashMap<&str, Vec<usize>> = HashMap::new();
    for (idx, row) in rows.iter().enumerate() {
        partitions
            .entry(row.customer_num.as_str())
            .or_default()
            .push(idx);
    }

    let mut slots: Vec<Option<WindowSlot>> = vec![None; rows.len()];
    for members in partitions.values_mut() {
        members.sort_by_key(|&idx| (rows[idx].order_at, rows[idx].row_index));
        let first_order_date = rows[members[0]].order_at;
        for (rank, &idx) in members.iter().enumerate() {
            slots[idx] = Some(WindowSlot {
                purchase_count: rank as u32 + 1,
                first_order_date,
            });
        }
    }

    debug!("Window pass over {} customers", partitions.len());

    // Every index belongs to exactly one partition.
    slots.into_iter().flatten().collect()
}
