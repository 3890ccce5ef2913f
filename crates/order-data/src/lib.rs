//! Data pipeline for the order dashboard.
//!
//! Loads the order CSV, enriches every row with its derived analytical
//! columns, filters by resolved date range, reduces the filtered rows into the
//! per-chart summary tables and exports filtered rows back to CSV.

pub mod aggregator;
pub mod analysis;
pub mod enricher;
pub mod export;
pub mod filter;
pub mod reader;

pub use order_core as core;
