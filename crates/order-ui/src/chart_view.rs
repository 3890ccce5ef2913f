//! Chart panels of the dashboard.
//!
//! Each `render_*` function draws one [`ChartPanel`]: the chart itself when
//! the panel is ready, a bordered placeholder when the window had no orders.

use std::collections::{BTreeMap, BTreeSet};

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    symbols::Marker,
    text::{Line, Span, Text},
    widgets::{
        Axis, Bar, BarChart, BarGroup, Block, Borders, Cell, Chart, Dataset, GraphType, Paragraph,
        Row, Table,
    },
    Frame,
};

use order_core::formatting::{format_count, format_percent};
use order_core::models::{Cohort, TrafficSource};
use order_data::aggregator::{
    ChannelRepeatRow, CohortSplit, CompositionSlice, MonthlyRepeatRow, TrafficShareRow,
};
use order_data::analysis::{ChartPanel, CompareCharts, ReportCharts, SpotCharts};

use crate::themes::Theme;

// ── Series helpers ────────────────────────────────────────────────────────────

/// Points of a monthly line chart, one line per traffic source.
///
/// `x` is the index of the month in `months`.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySeries {
    pub months: Vec<String>,
    pub lines: Vec<(TrafficSource, Vec<(f64, f64)>)>,
}

/// Arrange traffic-share rows as per-source lines over a shared month axis.
pub fn traffic_share_series(rows: &[TrafficShareRow]) -> MonthlySeries {
    let months: Vec<String> = rows
        .iter()
        .map(|r| r.month.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut lines: BTreeMap<TrafficSource, Vec<(f64, f64)>> = BTreeMap::new();
    for row in rows {
        if let Ok(x) = months.binary_search(&row.month) {
            lines
                .entry(row.traffic_source)
                .or_default()
                .push((x as f64, row.share));
        }
    }

    MonthlySeries {
        months,
        lines: lines.into_iter().collect(),
    }
}

/// First and last month labels of a month axis.
fn month_axis_labels(months: &[String]) -> Vec<String> {
    match months {
        [] => Vec::new(),
        [only] => vec![only.clone()],
        [first, .., last] => vec![first.clone(), last.clone()],
    }
}

fn month_axis_max(months: &[String]) -> f64 {
    months.len().saturating_sub(1).max(1) as f64
}

fn panel_block(title: &str, theme: &Theme) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(theme.separator)
        .title(Span::styled(format!(" {} ", title), theme.header))
}

// ── Placeholder ───────────────────────────────────────────────────────────────

/// Bordered "no data" box shown in place of an empty panel.
pub fn render_placeholder(frame: &mut Frame, area: Rect, title: &str, theme: &Theme) {
    let text = vec![
        Line::from(""),
        Line::from(Span::styled("No orders in the selected period", theme.warning)),
        Line::from(Span::styled("Change the month selection to see data", theme.dim)),
    ];
    frame.render_widget(
        Paragraph::new(Text::from(text))
            .alignment(Alignment::Center)
            .block(panel_block(title, theme)),
        area,
    );
}

// ── Compare mode ──────────────────────────────────────────────────────────────

/// Monthly traffic share as one line per source, y in percent.
pub fn render_traffic_share(
    frame: &mut Frame,
    area: Rect,
    panel: &ChartPanel<Vec<TrafficShareRow>>,
    theme: &Theme,
) {
    let Some(rows) = panel.data() else {
        render_placeholder(frame, area, panel.title(), theme);
        return;
    };

    let series = traffic_share_series(rows);
    let datasets: Vec<Dataset> = series
        .lines
        .iter()
        .map(|(source, points)| {
            Dataset::default()
                .name(source.as_str())
                .marker(Marker::Braille)
                .graph_type(GraphType::Line)
                .style(theme.source_style(*source))
                .data(points)
        })
        .collect();

    let chart = Chart::new(datasets)
        .block(panel_block(panel.title(), theme))
        .x_axis(
            Axis::default()
                .style(theme.axis)
                .bounds([0.0, month_axis_max(&series.months)])
                .labels(month_axis_labels(&series.months)),
        )
        .y_axis(
            Axis::default()
                .title("%")
                .style(theme.axis)
                .bounds([0.0, 100.0])
                .labels(["0", "50", "100"]),
        );
    frame.render_widget(chart, area);
}

/// New and repeat bars per month above a repeat-rate line.
pub fn render_repeat_rate(
    frame: &mut Frame,
    area: Rect,
    panel: &ChartPanel<Vec<MonthlyRepeatRow>>,
    theme: &Theme,
) {
    let Some(rows) = panel.data() else {
        render_placeholder(frame, area, panel.title(), theme);
        return;
    };

    let block = panel_block(panel.title(), theme);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [legend_area, bars_area, rate_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Percentage(55),
        Constraint::Min(4),
    ])
    .areas(inner);

    let legend = Line::from(vec![
        Span::styled("■ new", theme.new_cohort),
        Span::raw("  "),
        Span::styled("■ repeat", theme.repeat_cohort),
        Span::raw("  "),
        Span::styled("• repeat rate %", theme.repeat_rate),
    ]);
    frame.render_widget(Paragraph::new(legend), legend_area);

    let mut bars = BarChart::default().bar_width(3).bar_gap(0).group_gap(2);
    for row in rows {
        let group = [
            cohort_bar(row.counts.new, Cohort::New, theme),
            cohort_bar(row.counts.repeat, Cohort::Repeat, theme),
        ];
        bars = bars.data(
            BarGroup::default()
                .label(Line::from(row.month.clone()))
                .bars(&group),
        );
    }
    frame.render_widget(bars, bars_area);

    let months: Vec<String> = rows.iter().map(|r| r.month.clone()).collect();
    let points: Vec<(f64, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, r.repeat_rate))
        .collect();
    let rate = Chart::new(vec![Dataset::default()
        .name("repeat rate")
        .marker(Marker::Braille)
        .graph_type(GraphType::Line)
        .style(theme.repeat_rate)
        .data(&points)])
    .x_axis(
        Axis::default()
            .style(theme.axis)
            .bounds([0.0, month_axis_max(&months)])
            .labels(month_axis_labels(&months)),
    )
    .y_axis(
        Axis::default()
            .style(theme.axis)
            .bounds([0.0, 100.0])
            .labels(["0%", "100%"]),
    );
    frame.render_widget(rate, rate_area);
}

fn cohort_bar(value: u64, cohort: Cohort, theme: &Theme) -> Bar<'static> {
    Bar::default()
        .value(value)
        .style(theme.cohort_style(cohort))
        .text_value(format_count(value))
}

// ── Spot mode ─────────────────────────────────────────────────────────────────

/// Horizontal bars of a channel composition.
pub fn render_composition(
    frame: &mut Frame,
    area: Rect,
    panel: &ChartPanel<Vec<CompositionSlice>>,
    theme: &Theme,
) {
    let Some(slices) = panel.data() else {
        render_placeholder(frame, area, panel.title(), theme);
        return;
    };

    let bars: Vec<Bar> = slices
        .iter()
        .map(|s| {
            Bar::default()
                .value(s.count)
                .label(Line::from(s.traffic_source.as_str()))
                .style(theme.source_style(s.traffic_source))
                .text_value(format!(
                    "{} ({})",
                    format_count(s.count),
                    format_percent(s.share)
                ))
        })
        .collect();

    let chart = BarChart::default()
        .block(panel_block(panel.title(), theme))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

/// New vs. repeat bars for the whole window.
pub fn render_cohort_split(
    frame: &mut Frame,
    area: Rect,
    panel: &ChartPanel<CohortSplit>,
    theme: &Theme,
) {
    let Some(split) = panel.data() else {
        render_placeholder(frame, area, panel.title(), theme);
        return;
    };

    let bars = [
        (Cohort::New, split.counts.new, split.new_share),
        (Cohort::Repeat, split.counts.repeat, split.repeat_share),
    ]
    .map(|(cohort, count, share)| {
        Bar::default()
            .value(count)
            .label(Line::from(cohort.as_str()))
            .style(theme.cohort_style(cohort))
            .text_value(format!("{} ({})", format_count(count), format_percent(share)))
    });

    let chart = BarChart::default()
        .block(panel_block(panel.title(), theme))
        .direction(Direction::Horizontal)
        .bar_width(1)
        .bar_gap(1)
        .data(BarGroup::default().bars(&bars));
    frame.render_widget(chart, area);
}

/// Per-channel new / repeat counts with the repeat rate.
pub fn render_channel_repeat(
    frame: &mut Frame,
    area: Rect,
    panel: &ChartPanel<Vec<ChannelRepeatRow>>,
    theme: &Theme,
) {
    let Some(channels) = panel.data() else {
        render_placeholder(frame, area, panel.title(), theme);
        return;
    };

    let header = Row::new(
        ["Source", "New", "Repeat", "Total", "Repeat rate"]
            .iter()
            .map(|h| Cell::from(*h).style(theme.table_header)),
    );

    let rows: Vec<Row> = channels
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let style = if i % 2 == 0 {
                theme.table_row
            } else {
                theme.table_row_alt
            };
            Row::new(vec![
                Cell::from(c.traffic_source.as_str()).style(theme.source_style(c.traffic_source)),
                Cell::from(format_count(c.counts.new)),
                Cell::from(format_count(c.counts.repeat)),
                Cell::from(format_count(c.total())),
                Cell::from(format_percent(c.repeat_rate)).style(theme.repeat_rate),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(12),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(panel_block(panel.title(), theme))
        .style(theme.text);
    frame.render_widget(table, area);
}

// ── Layout ────────────────────────────────────────────────────────────────────

/// Draw every chart of a report into `area`.
pub fn render_report_charts(frame: &mut Frame, area: Rect, charts: &ReportCharts, theme: &Theme) {
    match charts {
        ReportCharts::Compare(c) => render_compare(frame, area, c, theme),
        ReportCharts::Spot(s) => render_spot(frame, area, s, theme),
    }
}

fn render_compare(frame: &mut Frame, area: Rect, charts: &CompareCharts, theme: &Theme) {
    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [left, right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);

    render_traffic_share(frame, left, &charts.new_flow, theme);
    render_traffic_share(frame, right, &charts.repeat_flow, theme);
    render_repeat_rate(frame, bottom, &charts.repeat_rate, theme);
}

fn render_spot(frame: &mut Frame, area: Rect, charts: &SpotCharts, theme: &Theme) {
    let [top, bottom] =
        Layout::vertical([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(area);
    let [top_left, top_right] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(top);
    let [bottom_left, bottom_right] =
        Layout::horizontal([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(bottom);

    render_composition(frame, top_left, &charts.new_composition, theme);
    render_composition(frame, top_right, &charts.repeat_composition, theme);
    render_cohort_split(frame, bottom_left, &charts.cohort_split, theme);
    render_channel_repeat(frame, bottom_right, &charts.channel_repeat, theme);
}

// ── Tests ─────────────────────────────────────────────────────────────────────
