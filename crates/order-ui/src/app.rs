//! Main application state and TUI event loop for the order dashboard.
//!
//! [`App`] owns the dashboard session, the current month selection and the
//! report computed for it. Every key that changes the selection triggers one
//! synchronous recompute.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph},
    Frame, Terminal,
};
use tracing::{debug, info, warn};

use order_core::date_range::{AnalysisMode, MonthToken, Selection};
use order_core::error::{AnalyticsError, Result};
use order_core::settings::Settings;
use order_data::analysis::{DashboardReport, DashboardSession};
use order_data::export::export_csv;

use crate::chart_view;
use crate::components::header::Header;
use crate::components::status_bar::{StatusBar, StatusKind, StatusMessage};
use crate::table_view::{self, PREVIEW_LIMIT};
use crate::themes::Theme;

/// File written by the export key, relative to the working directory.
pub const EXPORT_FILE: &str = "order_export.csv";

/// Rows moved per PgUp / PgDn.
const SCROLL_STEP: usize = 10;

fn terminal_error(e: io::Error) -> AnalyticsError {
    AnalyticsError::Terminal(e.to_string())
}

// ── App ───────────────────────────────────────────────────────────────────────

/// Root application state for the dashboard TUI.
pub struct App {
    pub theme: Theme,
    pub session: DashboardSession,
    pub mode: AnalysisMode,
    /// Compare-mode months.
    pub start: MonthToken,
    pub end: MonthToken,
    /// Spot-mode month.
    pub month: MonthToken,
    /// Report of the current selection, `None` while it does not resolve.
    pub report: Option<DashboardReport>,
    pub status: Option<StatusMessage>,
    /// First preview row shown.
    pub scroll: usize,
    pub export_path: PathBuf,
    /// Set to `true` to break out of the event loop on the next iteration.
    pub should_quit: bool,
}

impl App {
    /// Build the app and compute the first report.
    pub fn new(
        session: DashboardSession,
        theme_name: &str,
        mode: AnalysisMode,
        start: MonthToken,
        end: MonthToken,
        month: MonthToken,
    ) -> Self {
        let status = match (session.months().first(), session.months().last()) {
            (Some(first), Some(last)) => Some(StatusMessage::info(format!(
                "Data covers {} .. {} ({} months)",
                first,
                last,
                session.months().len()
            ))),
            _ => Some(StatusMessage::info("The order file has no rows")),
        };

        let mut app = Self {
            theme: Theme::from_name(theme_name),
            session,
            mode,
            start,
            end,
            month,
            report: None,
            status,
            scroll: 0,
            export_path: PathBuf::from(EXPORT_FILE),
            should_quit: false,
        };
        app.refresh();
        app
    }

    /// Build the app from CLI settings.
    ///
    /// Tokens of the selected mode must parse; the other mode's tokens fall
    /// back to the selected months when malformed.
    pub fn from_settings(session: DashboardSession, settings: &Settings) -> Result<Self> {
        let (start, end, month) = match settings.selection()? {
            Selection::Compare { start, end } => {
                (start, end, settings.month.parse().unwrap_or(start))
            }
            Selection::Spot { month } => (
                settings.start.parse().unwrap_or(month),
                settings.end.parse().unwrap_or(month),
                month,
            ),
        };
        Ok(Self::new(
            session,
            &settings.theme,
            settings.mode,
            start,
            end,
            month,
        ))
    }

    /// The selection described by the current mode and months.
    pub fn selection(&self) -> Selection {
        match self.mode {
            AnalysisMode::Compare => Selection::Compare {
                start: self.start,
                end: self.end,
            },
            AnalysisMode::Spot => Selection::Spot { month: self.month },
        }
    }

    /// Recompute the report; input errors go to the status line.
    pub fn refresh(&mut self) {
        let selection = self.selection();
        match self.session.submit(&selection) {
            Ok(report) => {
                self.report = Some(report);
                self.scroll = 0;
                if matches!(&self.status, Some(s) if s.kind == StatusKind::Error) {
                    self.status = None;
                }
            }
            Err(e) => {
                warn!("Selection {} rejected: {}", selection, e);
                self.report = None;
                self.status = Some(StatusMessage::error(e.to_string()));
            }
        }
    }

    // ── Key handling ──────────────────────────────────────────────────────────

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.kind != KeyEventKind::Press {
            return;
        }

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Char('Q') => self.should_quit = true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.mode = match self.mode {
                    AnalysisMode::Compare => AnalysisMode::Spot,
                    AnalysisMode::Spot => AnalysisMode::Compare,
                };
                self.refresh();
            }
            KeyCode::Left => self.step_month(false),
            KeyCode::Right => self.step_month(true),
            KeyCode::Char(',') if self.mode == AnalysisMode::Compare => {
                self.start = self.start.previous();
                self.refresh();
            }
            KeyCode::Char('.') if self.mode == AnalysisMode::Compare => {
                self.start = self.start.next();
                self.refresh();
            }
            KeyCode::Char('e') | KeyCode::Char('E') => self.export(),
            KeyCode::PageDown => {
                let max = self.filtered_len().min(PREVIEW_LIMIT).saturating_sub(1);
                self.scroll = (self.scroll + SCROLL_STEP).min(max);
            }
            KeyCode::PageUp => self.scroll = self.scroll.saturating_sub(SCROLL_STEP),
            _ => {}
        }
    }

    /// Move the spot month, or the compare end month.
    fn step_month(&mut self, forward: bool) {
        let target = match self.mode {
            AnalysisMode::Spot => &mut self.month,
            AnalysisMode::Compare => &mut self.end,
        };
        *target = if forward {
            target.next()
        } else {
            target.previous()
        };
        debug!("Selection moved to {}", self.selection());
        self.refresh();
    }

    /// Write the current filtered rows to [`Self::export_path`].
    pub fn export(&mut self) {
        let Some(report) = &self.report else {
            self.status = Some(StatusMessage::error("Nothing to export"));
            return;
        };
        self.status = Some(match export_csv(&report.filtered, &self.export_path) {
            Ok(()) => StatusMessage::success(format!(
                "Exported {} rows to {}",
                report.filtered.len(),
                self.export_path.display()
            )),
            Err(e) => StatusMessage::error(e.to_string()),
        });
    }

    fn filtered_len(&self) -> usize {
        self.report.as_ref().map_or(0, |r| r.filtered.len())
    }

    // ── Event loop ────────────────────────────────────────────────────────────

    /// Run the interactive dashboard until `q` / `Ctrl+C`.
    pub fn run(mut self) -> Result<()> {
        enable_raw_mode().map_err(terminal_error)?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).map_err(terminal_error)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).map_err(terminal_error)?;

        info!("Dashboard started in {} mode", self.mode);
        let result = self.event_loop(&mut terminal);

        // Restore terminal state unconditionally.
        disable_raw_mode().map_err(terminal_error)?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen).map_err(terminal_error)?;
        terminal.show_cursor().map_err(terminal_error)?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        let tick_rate = Duration::from_millis(250);

        while !self.should_quit {
            terminal
                .draw(|frame| self.render(frame))
                .map_err(terminal_error)?;

            if event::poll(tick_rate).map_err(terminal_error)? {
                if let Event::Key(key) = event::read().map_err(terminal_error)? {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    /// Render the current application state into `frame`.
    pub fn render(&self, frame: &mut Frame) {
        let [header_area, body_area, footer_area] = Layout::vertical([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(2),
        ])
        .areas(frame.area());

        let selection = self.selection();
        let header = Header::new(
            &selection,
            self.report.as_ref().map(|r| &r.range),
            self.filtered_len(),
            &self.theme,
        );
        frame.render_widget(Paragraph::new(Text::from(header.to_lines())), header_area);

        match &self.report {
            Some(report) => {
                let [charts_area, preview_area] =
                    Layout::vertical([Constraint::Percentage(65), Constraint::Percentage(35)])
                        .areas(body_area);
                chart_view::render_report_charts(frame, charts_area, &report.charts, &self.theme);
                table_view::render_preview(
                    frame,
                    preview_area,
                    &report.filtered,
                    self.scroll,
                    &self.theme,
                );
            }
            None => self.render_unresolved(frame, body_area),
        }

        let footer = StatusBar::new(self.status.as_ref(), &self.theme);
        frame.render_widget(Paragraph::new(Text::from(footer.to_lines())), footer_area);
    }

    fn render_unresolved(&self, frame: &mut Frame, area: Rect) {
        let text = vec![
            Line::from(""),
            Line::from(Span::styled(
                "The current month selection does not form a valid range",
                self.theme.warning,
            )),
            Line::from(Span::styled(
                "Move the start month with , and . or the end month with ←/→",
                self.theme.dim,
            )),
        ];
        frame.render_widget(
            Paragraph::new(Text::from(text))
                .block(Block::default().borders(Borders::ALL).title(" Dashboard ")),
            area,
        );
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use order_data::analysis::ReportCharts;
    use order_data::enricher::enrich;
    use order_data::reader::read_orders;
    use ratatui::backend::TestBackend;
    use tempfile::TempDir;

    const SAMPLE: &str = "customer_num,order_at,purchase_url,paid_price\n\
        C1,2024-09-01 10:00:00,ad_1,2500\n\
        C2,2024-09-03 12:00:00,ins_a,1800\n\
        C1,2024-09-20 09:00:00,rp_dm_1,3200\n\
        C3,2024-10-02 15:00:00,tik_promo,4100\n\
        C2,2024-10-08 18:00:00,rp_mg,2900\n";

    fn token(s: &str) -> MonthToken {
        s.parse().unwrap()
    }

    fn session() -> DashboardSession {
        DashboardSession::new(enrich(read_orders(SAMPLE.as_bytes()).unwrap()))
    }

    fn make_app(mode: AnalysisMode) -> App {
        App::new(
            session(),
            "dark",
            mode,
            token("2024-09"),
            token("2024-10"),
            token("2024-09"),
        )
    }

    fn press(app: &mut App, code: KeyCode) {
        app.handle_key(KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect()
    }

    // ── Construction ──────────────────────────────────────────────────────────

    #[test]
    fn test_app_new_computes_report() {
        let app = make_app(AnalysisMode::Compare);
        let report = app.report.as_ref().unwrap();
        assert_eq!(report.filtered.len(), 5);
        assert!(matches!(report.charts, ReportCharts::Compare(_)));
        assert_eq!(
            app.status,
            Some(StatusMessage::info("Data covers 2024-09 .. 2024-10 (2 months)"))
        );
        assert!(!app.should_quit);
    }

    #[test]
    fn test_from_settings_falls_back_for_other_mode_tokens() {
        let settings = Settings::parse_from([
            "order-dashboard",
            "--mode",
            "spot",
            "--month",
            "2024-10",
            "--start",
            "bogus",
        ]);
        let app = App::from_settings(session(), &settings).unwrap();
        assert_eq!(app.month, token("2024-10"));
        assert_eq!(app.start, token("2024-10"));
        assert_eq!(app.end, token("2025-08"));
    }

    #[test]
    fn test_from_settings_rejects_bad_selected_token() {
        let settings = Settings::parse_from(["order-dashboard", "--mode", "spot", "--month", "10/24"]);
        let err = App::from_settings(session(), &settings).err().unwrap();
        assert!(matches!(err, AnalyticsError::MonthToken(_)));
    }

    // ── Keys ──────────────────────────────────────────────────────────────────

    #[test]
    fn test_quit_keys() {
        let mut app = make_app(AnalysisMode::Spot);
        press(&mut app, KeyCode::Char('q'));
        assert!(app.should_quit);

        let mut app = make_app(AnalysisMode::Spot);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        assert!(app.should_quit);
    }

    #[test]
    fn test_tab_toggles_mode() {
        let mut app = make_app(AnalysisMode::Compare);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.mode, AnalysisMode::Spot);
        let report = app.report.as_ref().unwrap();
        assert!(matches!(report.charts, ReportCharts::Spot(_)));
        assert_eq!(report.filtered.len(), 3);
    }

    #[test]
    fn test_arrows_move_spot_month() {
        let mut app = make_app(AnalysisMode::Spot);
        press(&mut app, KeyCode::Right);
        assert_eq!(app.month, token("2024-10"));
        assert_eq!(app.report.as_ref().unwrap().filtered.len(), 2);

        press(&mut app, KeyCode::Left);
        press(&mut app, KeyCode::Left);
        assert_eq!(app.month, token("2024-08"));
        assert!(app.report.as_ref().unwrap().is_empty());
    }

    #[test]
    fn test_reversed_range_reported_in_status() {
        let mut app = make_app(AnalysisMode::Compare);
        press(&mut app, KeyCode::Char('.'));
        press(&mut app, KeyCode::Char('.'));
        assert_eq!(app.start, token("2024-11"));
        assert!(app.report.is_none());
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);
        assert!(!app.should_quit);

        press(&mut app, KeyCode::Char(','));
        assert!(app.report.is_some());
        assert!(app.status.is_none());
    }

    #[test]
    fn test_start_keys_ignored_in_spot_mode() {
        let mut app = make_app(AnalysisMode::Spot);
        press(&mut app, KeyCode::Char('.'));
        assert_eq!(app.start, token("2024-09"));
    }

    #[test]
    fn test_page_keys_scroll_within_rows() {
        let mut app = make_app(AnalysisMode::Compare);
        press(&mut app, KeyCode::PageDown);
        assert_eq!(app.scroll, 4);
        press(&mut app, KeyCode::PageUp);
        assert_eq!(app.scroll, 0);
    }

    #[test]
    fn test_export_writes_filtered_rows() {
        let dir = TempDir::new().unwrap();
        let mut app = make_app(AnalysisMode::Spot);
        app.export_path = dir.path().join("export.csv");

        press(&mut app, KeyCode::Char('e'));
        let status = app.status.as_ref().unwrap();
        assert_eq!(status.kind, StatusKind::Success);
        assert!(status.text.starts_with("Exported 3 rows"));

        let bytes = std::fs::read(&app.export_path).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_export_failure_reported_in_status() {
        let dir = TempDir::new().unwrap();
        let mut app = make_app(AnalysisMode::Spot);
        app.export_path = dir.path().join("missing").join("export.csv");

        app.export();
        assert_eq!(app.status.as_ref().unwrap().kind, StatusKind::Error);
    }

    // ── Render ────────────────────────────────────────────────────────────────

    #[test]
    fn test_render_compare_does_not_panic() {
        let app = make_app(AnalysisMode::Compare);
        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("ORDER ANALYTICS DASHBOARD"));
        assert!(text.contains("Monthly traffic share: new customers"));
    }

    #[test]
    fn test_render_spot_empty_month_shows_placeholders() {
        let mut app = make_app(AnalysisMode::Spot);
        app.month = token("2023-01");
        app.refresh();

        let mut terminal = Terminal::new(TestBackend::new(140, 45)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        assert!(buffer_text(&terminal).contains("No orders in the selected period"));
    }

    #[test]
    fn test_render_unresolved_selection() {
        let mut app = make_app(AnalysisMode::Compare);
        app.start = token("2025-01");
        app.refresh();

        let mut terminal = Terminal::new(TestBackend::new(120, 30)).unwrap();
        terminal.draw(|frame| app.render(frame)).unwrap();
        let text = buffer_text(&terminal);
        assert!(text.contains("does not form a valid range"));
        assert!(text.contains("invalid range"));
    }
}
