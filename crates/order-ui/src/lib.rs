//! Terminal UI layer for the order dashboard.
//!
//! Provides themes, header and status components, chart and record views, a
//! plain-text report renderer, and the interactive event loop built on
//! [`ratatui`].

pub mod app;
pub mod chart_view;
pub mod components;
pub mod table_view;
pub mod text_view;
pub mod themes;

pub use order_core as core;
