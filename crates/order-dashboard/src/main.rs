mod bootstrap;

use std::path::Path;

use anyhow::{Context, Result};
use order_core::date_range::Selection;
use order_core::settings::Settings;
use order_data::analysis::DashboardSession;
use order_data::export::export_csv;
use order_ui::app::App;
use order_ui::text_view::render_report_text;

fn main() -> Result<()> {
    let settings = Settings::load_with_last_used();

    let app_dir = bootstrap::ensure_directories()?;
    let log_target =
        bootstrap::log_target(settings.log_file.as_deref(), !settings.print, &app_dir);
    bootstrap::setup_logging(&settings.log_level, &log_target)?;

    tracing::info!("Order dashboard v{} starting", env!("CARGO_PKG_VERSION"));
    for warning in &settings.config_warnings {
        tracing::warn!("{}", warning);
    }
    tracing::info!(
        "Data: {}, Mode: {}, Theme: {}",
        settings.data.display(),
        settings.mode,
        settings.theme
    );

    let thresholds = settings.price_thresholds()?;
    let session = DashboardSession::load(&settings.data, thresholds)
        .with_context(|| format!("could not load orders from {}", settings.data.display()))?;
    let selection = settings.selection()?;

    if settings.export.is_some() || settings.print {
        let output = run_batch(&session, &selection, settings.export.as_deref(), settings.print)?;
        if let Some(text) = output {
            print!("{}", text);
            return Ok(());
        }
    }

    App::from_settings(session, &settings)?.run()?;
    tracing::info!("Order dashboard exiting");
    Ok(())
}

/// Build the report once, export it when asked, and return the text to print
/// in `--print` mode.
fn run_batch(
    session: &DashboardSession,
    selection: &Selection,
    export: Option<&Path>,
    print: bool,
) -> Result<Option<String>> {
    let report = session.submit(selection)?;
    let mut text = String::new();

    if let Some(path) = export {
        export_csv(&report.filtered, path)?;
        tracing::info!("Exported {} rows to {}", report.filtered.len(), path.display());
        text.push_str(&format!(
            "Exported {} rows to {}\n",
            report.filtered.len(),
            path.display()
        ));
    }

    if !print {
        return Ok(None);
    }
    text.push_str(&render_report_text(&report));
    Ok(Some(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use order_core::date_range::AnalysisMode;
    use order_data::enricher::enrich;
    use order_data::reader::read_orders;
    use tempfile::TempDir;

    const SAMPLE: &str = "customer_num,order_at,purchase_url,paid_price\n\
        C1,2024-09-01 10:00:00,ad_1,2500\n\
        C2,2024-09-03 12:00:00,ins_a,1800\n\
        C1,2024-10-20 09:00:00,rp_dm_1,3200\n";

    fn session() -> DashboardSession {
        DashboardSession::new(enrich(read_orders(SAMPLE.as_bytes()).unwrap()))
    }

    fn september() -> Selection {
        Selection::from_tokens(AnalysisMode::Spot, "", "", "2024-09").unwrap()
    }

    #[test]
    fn test_run_batch_export_and_print_share_one_report() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("out.csv");

        let text = run_batch(&session(), &september(), Some(&path), true)
            .unwrap()
            .expect("print output");

        assert!(text.starts_with(&format!("Exported 2 rows to {}\n", path.display())));
        assert!(text.contains("Orders in range: 2"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written.lines().count(), 3, "header plus two rows");
    }

    #[test]
    fn test_run_batch_export_only_prints_nothing() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("out.csv");

        let output = run_batch(&session(), &september(), Some(&path), false).unwrap();
        assert!(output.is_none());
        assert!(path.exists());
    }

    #[test]
    fn test_run_batch_print_only() {
        let text = run_batch(&session(), &september(), None, true)
            .unwrap()
            .expect("print output");
        assert!(text.starts_with("Order dashboard: spot 2024-09"));
    }
}
