//! Record preview for the order dashboard TUI.
//!
//! Renders a bordered [`ratatui::widgets::Table`] with the filtered orders
//! and their derived columns, one page at a time.

use ratatui::{
    layout::{Constraint, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use order_core::formatting;
use order_core::models::{EnrichedOrder, EnrichedTable};

use crate::themes::Theme;

/// Maximum number of records the preview scrolls through.
pub const PREVIEW_LIMIT: usize = 100;

const COLUMNS: [&str; 8] = [
    "Customer",
    "Ordered at",
    "Purchase URL",
    "Paid",
    "Source",
    "#",
    "First",
    "Segment",
];

/// Clamp a scroll offset so the last page stays full.
pub fn clamp_offset(total: usize, offset: usize, page: usize) -> usize {
    let shown = total.min(PREVIEW_LIMIT);
    offset.min(shown.saturating_sub(page))
}

/// The rows visible at `offset` for a page of `page` rows.
pub fn preview_rows(table: &EnrichedTable, offset: usize, page: usize) -> &[EnrichedOrder] {
    let shown = table.len().min(PREVIEW_LIMIT);
    let start = clamp_offset(table.len(), offset, page);
    let end = (start + page).min(shown);
    &table.rows[start..end]
}

fn record_cells(row: &EnrichedOrder) -> Vec<Cell<'static>> {
    vec![
        Cell::from(row.order.customer_num.clone()),
        Cell::from(row.order.order_at.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(row.order.purchase_url.clone()),
        Cell::from(formatting::format_number(row.order.paid_price, 0)),
        Cell::from(row.traffic_source.as_str()),
        Cell::from(row.purchase_count.to_string()),
        Cell::from(row.cohort().first_flag().to_string()),
        Cell::from(row.price_segment.as_str()),
    ]
}

/// Render one page of the filtered records into `area`.
///
/// `offset` is clamped so scrolling past the end shows the last page.
pub fn render_preview(
    frame: &mut Frame,
    area: Rect,
    table: &EnrichedTable,
    offset: usize,
    theme: &Theme,
) {
    if table.is_empty() {
        render_no_data(frame, area, theme);
        return;
    }

    // Borders and header take three lines.
    let page = usize::from(area.height.saturating_sub(3)).max(1);
    let start = clamp_offset(table.len(), offset, page);
    let visible = preview_rows(table, start, page);

    let header = Row::new(
        COLUMNS
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    )
    .height(1);

    let rows: Vec<Row> = visible
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let style = if (start + i) % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(record_cells(row)).style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(12),
        Constraint::Length(17),
        Constraint::Min(16),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(4),
        Constraint::Length(6),
        Constraint::Length(8),
    ];

    let title = format!(
        " Records {}-{} of {} ",
        start + 1,
        start + visible.len(),
        formatting::format_count(table.len() as u64)
    );

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(theme.text);

    frame.render_widget(table, area);
}

/// Render a "no data" placeholder when no orders fall in the window.
pub fn render_no_data(frame: &mut Frame, area: Rect, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No orders in the selected period", theme.warning)),
        Line::from(Span::styled(
            "Use ←/→ and ,/. to move the months, Tab to switch mode",
            theme.dim,
        )),
    ];
    frame.render_widget(
        Paragraph::new(ratatui::text::Text::from(text))
            .block(Block::default().borders(Borders::ALL).title(" Records ")),
        area,
    );
}

// ── Tests ──────────────────────────────────────────────────────────────────────
