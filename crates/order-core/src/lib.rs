//! Domain layer for the order dashboard.
//!
//! Holds the order and enriched-order models, the shared error type, the
//! month/date-range resolver, number formatting helpers and the CLI settings.

pub mod date_range;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;

pub use error::{AnalyticsError, Result};
