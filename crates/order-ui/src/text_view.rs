//! Plain-text rendering of a report for `--print`.

use std::fmt::Write;

use order_core::formatting::{format_count, format_percent};
use order_data::aggregator::{
    ChannelRepeatRow, CohortSplit, CompositionSlice, MonthlyRepeatRow, TrafficShareRow,
};
use order_data::analysis::{ChartPanel, DashboardReport, ReportCharts};

const EMPTY_NOTE: &str = "  (no orders in the selected period)\n";

/// Render every summary table of `report` as aligned plain text.
pub fn render_report_text(report: &DashboardReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Order dashboard: {} ({})", report.selection, report.range);
    let _ = writeln!(out, "Orders in range: {}", format_count(report.filtered.len() as u64));

    match &report.charts {
        ReportCharts::Compare(c) => {
            section(&mut out, &c.new_flow, |o, rows| traffic_share_table(o, rows));
            section(&mut out, &c.repeat_rate, |o, rows| repeat_rate_table(o, rows));
            section(&mut out, &c.repeat_flow, |o, rows| traffic_share_table(o, rows));
        }
        ReportCharts::Spot(s) => {
            section(&mut out, &s.new_composition, |o, rows| composition_table(o, rows));
            section(&mut out, &s.repeat_composition, |o, rows| composition_table(o, rows));
            section(&mut out, &s.cohort_split, cohort_split_table);
            section(&mut out, &s.channel_repeat, |o, rows| channel_table(o, rows));
        }
    }
    out
}

fn section<T>(out: &mut String, panel: &ChartPanel<T>, body: impl FnOnce(&mut String, &T)) {
    let _ = writeln!(out, "\n== {} ==", panel.title());
    match panel.data() {
        Some(data) => body(out, data),
        None => out.push_str(EMPTY_NOTE),
    }
}

fn traffic_share_table(out: &mut String, rows: &[TrafficShareRow]) {
    let _ = writeln!(out, "  {:<8} {:<10} {:>8} {:>8}", "month", "source", "orders", "share");
    for r in rows {
        let _ = writeln!(
            out,
            "  {:<8} {:<10} {:>8} {:>8}",
            r.month,
            r.traffic_source.as_str(),
            format_count(r.count),
            format_percent(r.share)
        );
    }
}

fn repeat_rate_table(out: &mut String, rows: &[MonthlyRepeatRow]) {
    let _ = writeln!(
        out,
        "  {:<8} {:>8} {:>8} {:>8} {:>12}",
        "month", "new", "repeat", "total", "repeat rate"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "  {:<8} {:>8} {:>8} {:>8} {:>12}",
            r.month,
            format_count(r.counts.new),
            format_count(r.counts.repeat),
            format_count(r.counts.total()),
            format_percent(r.repeat_rate)
        );
    }
}

fn composition_table(out: &mut String, slices: &[CompositionSlice]) {
    let _ = writeln!(out, "  {:<10} {:>8} {:>8}", "source", "orders", "share");
    for s in slices {
        let _ = writeln!(
            out,
            "  {:<10} {:>8} {:>8}",
            s.traffic_source.as_str(),
            format_count(s.count),
            format_percent(s.share)
        );
    }
}

fn cohort_split_table(out: &mut String, split: &CohortSplit) {
    let _ = writeln!(out, "  {:<10} {:>8} {:>8}", "cohort", "orders", "share");
    let _ = writeln!(
        out,
        "  {:<10} {:>8} {:>8}",
        "new",
        format_count(split.counts.new),
        format_percent(split.new_share)
    );
    let _ = writeln!(
        out,
        "  {:<10} {:>8} {:>8}",
        "repeat",
        format_count(split.counts.repeat),
        format_percent(split.repeat_share)
    );
}

fn channel_table(out: &mut String, rows: &[ChannelRepeatRow]) {
    let _ = writeln!(
        out,
        "  {:<10} {:>8} {:>8} {:>8} {:>12}",
        "source", "new", "repeat", "total", "repeat rate"
    );
    for r in rows {
        let _ = writeln!(
            out,
            "  {:<10} {:>8} {:>8} {:>8} {:>12}",
            r.traffic_source.as_str(),
            format_count(r.counts.new),
            format_count(r.counts.repeat),
            format_count(r.total()),
            format_percent(r.repeat_rate)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_core::date_range::{AnalysisMode, Selection};
    use order_data::analysis::DashboardSession;
    use order_data::enricher::enrich;
    use order_data::reader::read_orders;

    const SAMPLE: &str = "customer_num,order_at,purchase_url,paid_price\n\
        C1,2024-09-01 10:00:00,ad_1,2500\n\
        C2,2024-09-03 12:00:00,ins_a,1800\n\
        C1,2024-09-20 09:00:00,rp_dm_1,3200\n\
        C3,2024-10-02 15:00:00,tik_promo,4100\n";

    fn session() -> DashboardSession {
        DashboardSession::new(enrich(read_orders(SAMPLE.as_bytes()).unwrap()))
    }

    #[test]
    fn test_compare_text_lists_sections() {
        let sel = Selection::from_tokens(AnalysisMode::Compare, "2024-09", "2024-10", "").unwrap();
        let text = render_report_text(&session().submit(&sel).unwrap());

        assert!(text.starts_with("Order dashboard: compare 2024-09 .. 2024-10"));
        assert!(text.contains("Orders in range: 4"));
        assert!(text.contains("== Monthly traffic share: new customers =="));
        assert!(text.contains("== Repeat orders and repeat rate by month =="));
        // September: 2 new, 1 repeat.
        assert!(text.contains("  2024-09         2        1        3        33.3%"));
    }

    #[test]
    fn test_spot_text_marks_empty_sections() {
        let sel = Selection::from_tokens(AnalysisMode::Spot, "", "", "2024-10").unwrap();
        let text = render_report_text(&session().submit(&sel).unwrap());

        assert!(text.contains("== Repeat customer traffic composition ==\n  (no orders"));
        assert!(text.contains("tiktok"));
        assert!(text.contains("100.0%"));
    }

    #[test]
    fn test_empty_window_text() {
        let sel = Selection::from_tokens(AnalysisMode::Spot, "", "", "2023-01").unwrap();
        let text = render_report_text(&session().submit(&sel).unwrap());
        assert!(text.contains("Orders in range: 0"));
        assert_eq!(text.matches("(no orders in the selected period)").count(), 4);
    }
}
