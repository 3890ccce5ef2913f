use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the order dashboard.
#[derive(Error, Debug)]
pub enum AnalyticsError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be created or written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The CSV reader or writer rejected the data.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A column the pipeline depends on is absent from the header row.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    /// An order timestamp did not match any recognised format.
    #[error("Invalid timestamp at row {row}: {value}")]
    TimestampParse { row: usize, value: String },

    /// A field could not be converted to the type its column requires.
    #[error("Invalid value for {column} at row {row}: {value}")]
    InvalidValue {
        row: usize,
        column: String,
        value: String,
    },

    /// A month token was not of the form `YYYY-MM`.
    #[error("Invalid month token (expected YYYY-MM): {0}")]
    MonthToken(String),

    /// A resolved range starts after it ends.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidRange {
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    },

    /// An error originating from the terminal / TUI layer.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AnalyticsError {
    /// `true` for errors caused by user-supplied input (bad tokens, bad
    /// columns or fields) as opposed to environment failures.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            AnalyticsError::MissingColumn(_)
                | AnalyticsError::TimestampParse { .. }
                | AnalyticsError::InvalidValue { .. }
                | AnalyticsError::MonthToken(_)
                | AnalyticsError::InvalidRange { .. }
        )
    }
}

/// Convenience alias used throughout the dashboard crates.
pub type Result<T> = std::result::Result<T, AnalyticsError>;
