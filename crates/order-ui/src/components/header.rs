use crate::themes::Theme;
use order_core::date_range::{DateRange, Selection};
use order_core::formatting::format_count;
use ratatui::text::{Line, Span};

/// Dashboard header rendering three lines:
///
/// 1. Application title.
/// 2. A 60-column `=` separator.
/// 3. `[ mode | months | days | orders ]` for the current selection.
pub struct Header<'a> {
    pub selection: &'a Selection,
    /// Resolved window; `None` when the selection does not resolve.
    pub range: Option<&'a DateRange>,
    pub orders: usize,
    pub theme: &'a Theme,
}

impl<'a> Header<'a> {
    pub fn new(
        selection: &'a Selection,
        range: Option<&'a DateRange>,
        orders: usize,
        theme: &'a Theme,
    ) -> Self {
        Self {
            selection,
            range,
            orders,
            theme,
        }
    }

    /// Months of the selection, e.g. `2024-09 .. 2025-08` or `2024-09`.
    fn months_label(&self) -> String {
        match self.selection {
            Selection::Compare { start, end } => format!("{} .. {}", start, end),
            Selection::Spot { month } => month.to_string(),
        }
    }

    pub fn to_lines(&self) -> Vec<Line<'a>> {
        let range = self
            .range
            .map(|r| r.to_string())
            .unwrap_or_else(|| "invalid range".to_string());

        vec![
            Line::from(Span::styled("ORDER ANALYTICS DASHBOARD", self.theme.header)),
            Line::from(Span::styled("=".repeat(60), self.theme.separator)),
            Line::from(vec![
                Span::styled("[ ", self.theme.label),
                Span::styled(self.selection.mode().as_str(), self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(self.months_label(), self.theme.value),
                Span::styled(" | ", self.theme.label),
                Span::styled(range, self.theme.text),
                Span::styled(" | ", self.theme.label),
                Span::styled(
                    format!("{} orders", format_count(self.orders as u64)),
                    self.theme.value,
                ),
                Span::styled(" ]", self.theme.label),
            ]),
        ]
    }
}
