use clap::{CommandFactory, Parser};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::date_range::{AnalysisMode, MonthToken, Selection};
use crate::error::{AnalyticsError, Result};
use crate::models::PriceThresholds;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Order analytics dashboard: traffic sources, repeat rates and cohorts
#[derive(Parser, Debug, Clone)]
#[command(
    name = "order-dashboard",
    about = "Order analytics dashboard: traffic sources, repeat rates and cohorts",
    version
)]
pub struct Settings {
    /// Order CSV file
    #[arg(long, default_value = "data/sample_orders.csv")]
    pub data: PathBuf,

    /// Analysis mode
    #[arg(long, value_enum, default_value_t = AnalysisMode::Compare)]
    pub mode: AnalysisMode,

    /// First month of the comparison range (YYYY-MM)
    #[arg(long, default_value = "2024-09")]
    pub start: String,

    /// Last month of the comparison range (YYYY-MM)
    #[arg(long, default_value = "2025-08")]
    pub end: String,

    /// Target month for spot mode (YYYY-MM)
    #[arg(long, default_value = "2024-09")]
    pub month: String,

    /// Paid amounts below this are the low price segment
    #[arg(long, default_value_t = PriceThresholds::DEFAULT_LOW)]
    pub low_price: f64,

    /// Paid amounts above this are the high price segment
    #[arg(long, default_value_t = PriceThresholds::DEFAULT_HIGH)]
    pub high_price: f64,

    /// Write the filtered records to this CSV file
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Print the summary tables to stdout instead of starting the TUI
    #[arg(long)]
    pub print: bool,

    /// Display theme
    #[arg(long, default_value = "auto", value_parser = ["light", "dark", "classic", "auto"])]
    pub theme: String,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL"])]
    pub log_level: String,

    /// Log file path
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,

    /// Clear saved configuration
    #[arg(long)]
    pub clear: bool,

    /// Problems met while reading or writing the last-used file, reported
    /// once logging is up.
    #[arg(skip)]
    pub config_warnings: Vec<String>,
}

// ── LastUsedParams ─────────────────────────────────────────────────────────────

/// Persisted last-used parameters saved to `~/.order-dashboard/last_used.json`.
#[derive(Debug, Serialize, Deserialize, Default, Clone)]
pub struct LastUsedParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<AnalysisMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
}

impl LastUsedParams {
    /// Default path of the persisted config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// The config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".order-dashboard").join("last_used.json")
    }

    /// Load persisted params from an explicit path.
    /// Returns `Default` when the file is absent or cannot be parsed.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        serde_json::from_str(&content).unwrap_or_default()
    }

    /// Atomically write params to an explicit path, creating parent
    /// directories if needed.
    pub fn save_to(&self, path: &Path) -> std::result::Result<(), std::io::Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;

        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        Ok(())
    }

    /// Delete the config file at an explicit path if it exists.
    pub fn clear_at(path: &Path) -> std::result::Result<(), std::io::Error> {
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse CLI arguments, merge with last-used params where no explicit CLI
    /// value was provided, and persist the result.
    pub fn load_with_last_used() -> Self {
        Self::load_with_last_used_impl(
            std::env::args_os().collect(),
            &LastUsedParams::config_path(),
        )
    }

    /// Full implementation: accepts args and an explicit config path so that
    /// tests can redirect to a temporary directory.
    pub fn load_with_last_used_impl(
        args: Vec<std::ffi::OsString>,
        config_path: &Path,
    ) -> Self {
        let matches = Settings::command().get_matches_from(args.clone());
        let mut settings = Settings::parse_from(args);

        if settings.clear {
            if let Err(e) = LastUsedParams::clear_at(config_path) {
                settings
                    .config_warnings
                    .push(format!("Could not clear {}: {}", config_path.display(), e));
            }
            return Self::apply_debug(settings);
        }

        let last = LastUsedParams::load_from(config_path);

        // NOTE: clap stores the arg id using the field name, not the flag.
        if !is_arg_explicitly_set(&matches, "data") {
            if let Some(v) = last.data {
                settings.data = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "mode") {
            if let Some(v) = last.mode {
                settings.mode = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "start") {
            if let Some(v) = last.start.filter(|v| is_month_token(v)) {
                settings.start = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "end") {
            if let Some(v) = last.end.filter(|v| is_month_token(v)) {
                settings.end = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "month") {
            if let Some(v) = last.month.filter(|v| is_month_token(v)) {
                settings.month = v;
            }
        }
        if !is_arg_explicitly_set(&matches, "theme") {
            if let Some(v) = last.theme {
                settings.theme = v;
            }
        }

        settings = Self::apply_debug(settings);

        let params = LastUsedParams::from(&settings);
        if let Err(e) = params.save_to(config_path) {
            settings
                .config_warnings
                .push(format!("Could not persist settings to {}: {}", config_path.display(), e));
        }

        settings
    }

    /// The month selection described by `mode`, `start`, `end` and `month`.
    pub fn selection(&self) -> Result<Selection> {
        Selection::from_tokens(self.mode, &self.start, &self.end, &self.month)
    }

    /// Validated price tier boundaries.
    pub fn price_thresholds(&self) -> Result<PriceThresholds> {
        if !self.low_price.is_finite() || !self.high_price.is_finite() {
            return Err(AnalyticsError::Config(
                "price thresholds must be finite numbers".to_string(),
            ));
        }
        if self.low_price > self.high_price {
            return Err(AnalyticsError::Config(format!(
                "--low-price ({}) must not exceed --high-price ({})",
                self.low_price, self.high_price
            )));
        }
        Ok(PriceThresholds::new(self.low_price, self.high_price))
    }

    /// `--debug` overrides the log level.
    fn apply_debug(mut settings: Settings) -> Settings {
        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }
        settings
    }
}

// ── Conversion ─────────────────────────────────────────────────────────────────

impl From<&Settings> for LastUsedParams {
    fn from(s: &Settings) -> Self {
        LastUsedParams {
            data: Some(s.data.clone()),
            mode: Some(s.mode),
            start: is_month_token(&s.start).then(|| s.start.clone()),
            end: is_month_token(&s.end).then(|| s.end.clone()),
            month: is_month_token(&s.month).then(|| s.month.clone()),
            theme: Some(s.theme.clone()),
        }
    }
}

/// Malformed tokens are never persisted or merged back.
fn is_month_token(s: &str) -> bool {
    s.parse::<MonthToken>().is_ok()
}

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value or environment variable).
fn is_arg_explicitly_set(matches: &clap::ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tmp_config_path(tmp: &TempDir) -> PathBuf {
        LastUsedParams::config_path_in(tmp.path())
    }

    #[test]
    fn test_last_used_params_save_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        let params = LastUsedParams {
            data: Some(PathBuf::from("/srv/orders.csv")),
            mode: Some(AnalysisMode::Spot),
            start: Some("2024-10".to_string()),
            end: Some("2025-03".to_string()),
            month: Some("2024-12".to_string()),
            theme: Some("dark".to_string()),
        };
        params.save_to(&path).expect("save");

        let loaded = LastUsedParams::load_from(&path);
        assert_eq!(loaded.data, Some(PathBuf::from("/srv/orders.csv")));
        assert_eq!(loaded.mode, Some(AnalysisMode::Spot));
        assert_eq!(loaded.start.as_deref(), Some("2024-10"));
        assert_eq!(loaded.end.as_deref(), Some("2025-03"));
        assert_eq!(loaded.month.as_deref(), Some("2024-12"));
        assert_eq!(loaded.theme.as_deref(), Some("dark"));
    }

    #[test]
    fn test_last_used_params_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded = LastUsedParams::load_from(&tmp_config_path(&tmp));
        assert!(loaded.data.is_none());
        assert!(loaded.mode.is_none());
        assert!(loaded.month.is_none());
    }

    #[test]
    fn test_last_used_params_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp_config_path(&tmp);
        LastUsedParams::default().save_to(&path).expect("save");
        assert!(path.exists());

        LastUsedParams::clear_at(&path).expect("clear");
        assert!(!path.exists());
    }

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["order-dashboard"]);

        assert_eq!(settings.data, PathBuf::from("data/sample_orders.csv"));
        assert_eq!(settings.mode, AnalysisMode::Compare);
        assert_eq!(settings.start, "2024-09");
        assert_eq!(settings.end, "2025-08");
        assert_eq!(settings.month, "2024-09");
        assert_eq!(settings.low_price, 3000.0);
        assert_eq!(settings.high_price, 6000.0);
        assert!(settings.export.is_none());
        assert!(!settings.print);
        assert_eq!(settings.theme, "auto");
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
        assert!(!settings.clear);
    }

    #[test]
    fn test_settings_cli_spot_mode() {
        let settings =
            Settings::parse_from(["order-dashboard", "--mode", "spot", "--month", "2025-01"]);
        let selection = settings.selection().unwrap();
        assert_eq!(selection.mode(), AnalysisMode::Spot);
        assert_eq!(selection.resolve().unwrap().to_string(), "2025-01-01 to 2025-01-31");
    }

    #[test]
    fn test_settings_selection_surfaces_bad_token() {
        let settings = Settings::parse_from(["order-dashboard", "--start", "2024-9"]);
        let err = settings.selection().unwrap_err();
        assert!(matches!(err, AnalyticsError::MonthToken(_)));
    }

    #[test]
    fn test_settings_price_thresholds_validation() {
        let ok = Settings::parse_from(["order-dashboard", "--low-price", "1000"]);
        assert_eq!(ok.price_thresholds().unwrap().low, 1000.0);

        let bad = Settings::parse_from([
            "order-dashboard",
            "--low-price",
            "7000",
            "--high-price",
            "6000",
        ]);
        assert!(matches!(
            bad.price_thresholds().unwrap_err(),
            AnalyticsError::Config(_)
        ));
    }

    #[test]
    fn test_load_with_last_used_merges_persisted_values() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            mode: Some(AnalysisMode::Spot),
            month: Some("2025-02".to_string()),
            theme: Some("light".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["order-dashboard".into()], &config_path);
        assert_eq!(settings.mode, AnalysisMode::Spot);
        assert_eq!(settings.month, "2025-02");
        assert_eq!(settings.theme, "light");
    }

    #[test]
    fn test_load_with_last_used_cli_overrides_persisted() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            mode: Some(AnalysisMode::Spot),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings = Settings::load_with_last_used_impl(
            vec!["order-dashboard".into(), "--mode".into(), "compare".into()],
            &config_path,
        );
        assert_eq!(settings.mode, AnalysisMode::Compare);
    }

    #[test]
    fn test_load_with_last_used_clear_removes_file() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams::default()
            .save_to(&config_path)
            .expect("save");

        Settings::load_with_last_used_impl(
            vec!["order-dashboard".into(), "--clear".into()],
            &config_path,
        );
        assert!(!config_path.exists(), "file must be gone after --clear");
    }

    #[test]
    fn test_load_with_last_used_debug_overrides_log_level() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let settings = Settings::load_with_last_used_impl(
            vec!["order-dashboard".into(), "--debug".into()],
            &config_path,
        );
        assert_eq!(settings.log_level, "DEBUG");
    }

    #[test]
    fn test_load_with_last_used_persists_after_run() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        Settings::load_with_last_used_impl(
            vec!["order-dashboard".into(), "--month".into(), "2024-11".into()],
            &config_path,
        );

        let loaded = LastUsedParams::load_from(&config_path);
        assert_eq!(loaded.month.as_deref(), Some("2024-11"));
    }

    #[test]
    fn test_bad_token_fails_one_run_only() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);

        let first = Settings::load_with_last_used_impl(
            vec!["order-dashboard".into(), "--start".into(), "2024-9".into()],
            &config_path,
        );
        assert!(matches!(
            first.selection().unwrap_err(),
            AnalyticsError::MonthToken(_)
        ));
        assert!(LastUsedParams::load_from(&config_path).start.is_none());

        let second =
            Settings::load_with_last_used_impl(vec!["order-dashboard".into()], &config_path);
        assert_eq!(second.start, "2024-09");
        assert!(second.selection().is_ok());
    }

    #[test]
    fn test_malformed_persisted_token_is_ignored() {
        let tmp = TempDir::new().expect("tempdir");
        let config_path = tmp_config_path(&tmp);
        LastUsedParams {
            start: Some("2024-9".to_string()),
            month: Some("2025-03".to_string()),
            ..Default::default()
        }
        .save_to(&config_path)
        .expect("save");

        let settings =
            Settings::load_with_last_used_impl(vec!["order-dashboard".into()], &config_path);
        assert_eq!(settings.start, "2024-09");
        assert_eq!(settings.month, "2025-03");
        assert!(settings.selection().is_ok());
    }

    #[test]
    fn test_save_failure_is_reported_as_warning() {
        let tmp = TempDir::new().expect("tempdir");
        // A directory where the config file should be makes the rename fail.
        let config_path = tmp.path().join("last_used.json");
        std::fs::create_dir_all(config_path.join("occupied")).expect("dir");

        let settings =
            Settings::load_with_last_used_impl(vec!["order-dashboard".into()], &config_path);
        assert_eq!(settings.config_warnings.len(), 1);
        assert!(settings.config_warnings[0].starts_with("Could not persist settings"));
    }

    #[test]
    fn test_successful_run_has_no_warnings() {
        let tmp = TempDir::new().expect("tempdir");
        let settings = Settings::load_with_last_used_impl(
            vec!["order-dashboard".into()],
            &tmp_config_path(&tmp),
        );
        assert!(settings.config_warnings.is_empty());
    }
}
