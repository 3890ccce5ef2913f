//! CSV loading for the order dashboard.
//!
//! Reads the order file into an [`OrderTable`], locating the required columns
//! by header name and keeping every other column verbatim.

use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use order_core::error::{AnalyticsError, Result};
use order_core::models::{columns, ColumnLayout, OrderRecord, OrderTable};
use tracing::{debug, info};

/// Date-time patterns accepted for `order_at`, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Date-only patterns; the time is taken as midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Load the order CSV at `path`.
///
/// Fails when the file cannot be opened, a required column is missing, or any
/// row carries an unparseable timestamp or paid amount.
pub fn load_orders(path: &Path) -> Result<OrderTable> {
    let file = std::fs::File::open(path).map_err(|source| AnalyticsError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;

    let table = read_orders(std::io::BufReader::new(file))?;
    info!("Loaded {} orders from {}", table.len(), path.display());
    Ok(table)
}

/// Parse order CSV data from any reader. The first row must be the header.
pub fn read_orders<R: Read>(reader: R) -> Result<OrderTable> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    let layout = locate_columns(&headers)?;

    let mut rows = Vec::new();
    for (row_index, record) in rdr.records().enumerate() {
        let record = record?;
        rows.push(parse_record(row_index, &record, layout)?);
    }

    debug!("Parsed {} rows with {} columns", rows.len(), headers.len());

    Ok(OrderTable {
        headers,
        layout,
        rows,
    })
}

/// Parse a raw `order_at` value into a wall-clock timestamp.
///
/// RFC 3339 values keep their local time and drop the offset.
pub fn parse_order_timestamp(value: &str) -> Option<NaiveDateTime> {
    let s = value.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_local());
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return date.and_hms_opt(0, 0, 0);
        }
    }

    None
}

// ── Internal helpers ──────────────────────────────────────────────────────────

/// Find the positions of the required columns in `headers`.
fn locate_columns(headers: &[String]) -> Result<ColumnLayout> {
    let find = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or_else(|| AnalyticsError::MissingColumn(name.to_string()))
    };

    Ok(ColumnLayout {
        customer: find(columns::CUSTOMER)?,
        order_at: find(columns::ORDER_AT)?,
        purchase_url: find(columns::PURCHASE_URL)?,
        paid_price: find(columns::PAID_PRICE)?,
    })
}

/// Convert one CSV record into an [`OrderRecord`].
///
/// Error row numbers are 1-based data rows (the header is not counted).
fn parse_record(
    row_index: usize,
    record: &csv::StringRecord,
    layout: ColumnLayout,
) -> Result<OrderRecord> {
    let row = row_index + 1;
    let field = |idx: usize| record.get(idx).unwrap_or_default();

    let raw_ts = field(layout.order_at);
    let order_at = parse_order_timestamp(raw_ts).ok_or_else(|| AnalyticsError::TimestampParse {
        row,
        value: raw_ts.to_string(),
    })?;

    let raw_price = field(layout.paid_price);
    let paid_price = parse_paid_price(raw_price).ok_or_else(|| AnalyticsError::InvalidValue {
        row,
        column: columns::PAID_PRICE.to_string(),
        value: raw_price.to_string(),
    })?;

    Ok(OrderRecord {
        row_index,
        customer_num: field(layout.customer).to_string(),
        order_at,
        purchase_url: field(layout.purchase_url).to_string(),
        paid_price,
        fields: record.iter().map(str::to_string).collect(),
    })
}

/// A finite, non-negative amount.
fn parse_paid_price(value: &str) -> Option<f64> {
    let amount: f64 = value.trim().parse().ok()?;
    if amount.is_finite() && amount >= 0.0 {
        Some(amount)
    } else {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Timelike};
    use std::io::Write;
    use tempfile::TempDir;

    const HEADER: &str = "order_id,customer_num,order_at,purchase_url,paid_price,product_code";

    fn csv_text(lines: &[&str]) -> String {
        let mut text = String::from(HEADER);
        for line in lines {
            text.push('\n');
            text.push_str(line);
        }
        text
    }

    fn write_csv(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "{}", content).unwrap();
        path
    }

    // ── read_orders ───────────────────────────────────────────────────────────

    #[test]
    fn test_read_orders_basic() {
        let text = csv_text(&[
            "1,C001,2024-09-01 10:00:00,ad_123,2500,P1",
            "2,C002,2024-09-02 11:30:00,rp_mg,4800,P2",
        ]);
        let table = read_orders(text.as_bytes()).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.headers.len(), 6);
        assert_eq!(table.layout.customer, 1);
        assert_eq!(table.layout.paid_price, 4);

        let first = &table.rows[0];
        assert_eq!(first.row_index, 0);
        assert_eq!(first.customer_num, "C001");
        assert_eq!(first.purchase_url, "ad_123");
        assert_eq!(first.paid_price, 2500.0);
        assert_eq!(first.fields[5], "P1");
        assert_eq!(
            first.order_at,
            NaiveDate::from_ymd_opt(2024, 9, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap()
        );
    }

    #[test]
    fn test_read_orders_columns_in_any_order() {
        let text = "paid_price,purchase_url,order_at,customer_num\n100,shop_x,2024-10-05,C9";
        let table = read_orders(text.as_bytes()).unwrap();
        assert_eq!(table.layout.customer, 3);
        assert_eq!(table.rows[0].customer_num, "C9");
        assert_eq!(table.rows[0].order_at.hour(), 0);
    }

    #[test]
    fn test_read_orders_strips_bom_from_header() {
        let text = "\u{feff}customer_num,order_at,purchase_url,paid_price\nC1,2024-09-01,ad_1,10";
        let table = read_orders(text.as_bytes()).unwrap();
        assert_eq!(table.headers[0], "customer_num");
    }

    #[test]
    fn test_read_orders_missing_column() {
        let text = "customer_num,order_at,paid_price\nC1,2024-09-01,100";
        let err = read_orders(text.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalyticsError::MissingColumn(c) if c == "purchase_url"));
    }

    #[test]
    fn test_read_orders_bad_timestamp_names_row() {
        let text = csv_text(&[
            "1,C001,2024-09-01 10:00:00,ad_123,2500,P1",
            "2,C002,not-a-date,ad_123,2500,P1",
        ]);
        let err = read_orders(text.as_bytes()).unwrap_err();
        match err {
            AnalyticsError::TimestampParse { row, value } => {
                assert_eq!(row, 2);
                assert_eq!(value, "not-a-date");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_read_orders_negative_price_rejected() {
        let text = csv_text(&["1,C001,2024-09-01 10:00:00,ad_123,-1,P1"]);
        let err = read_orders(text.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidValue { row: 1, .. }));
    }

    #[test]
    fn test_read_orders_non_numeric_price_rejected() {
        let text = csv_text(&["1,C001,2024-09-01 10:00:00,ad_123,free,P1"]);
        let err = read_orders(text.as_bytes()).unwrap_err();
        assert!(err.is_input_error());
    }

    #[test]
    fn test_read_orders_header_only() {
        let table = read_orders(HEADER.as_bytes()).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn test_read_orders_ragged_row_is_csv_error() {
        let text = csv_text(&["1,C001,2024-09-01 10:00:00"]);
        let err = read_orders(text.as_bytes()).unwrap_err();
        assert!(matches!(err, AnalyticsError::Csv(_)));
    }

    // ── load_orders ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_orders_from_file() {
        let dir = TempDir::new().unwrap();
        let path = write_csv(
            dir.path(),
            "orders.csv",
            &csv_text(&["1,C001,2024-09-01 10:00:00,ad_123,2500,P1"]),
        );
        let table = load_orders(&path).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_load_orders_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.csv");
        let err = load_orders(&path).unwrap_err();
        assert!(matches!(err, AnalyticsError::FileRead { .. }));
        assert!(err.to_string().contains("absent.csv"));
    }

    // ── parse_order_timestamp ─────────────────────────────────────────────────

    #[test]
    fn test_parse_order_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 9, 1)
            .unwrap()
            .and_hms_opt(10, 15, 30)
            .unwrap();
        for s in [
            "2024-09-01 10:15:30",
            "2024-09-01T10:15:30",
            "2024/09/01 10:15:30",
            " 2024-09-01 10:15:30 ",
            "2024-09-01T10:15:30+09:00",
            "2024-09-01T10:15:30Z",
        ] {
            assert_eq!(parse_order_timestamp(s), Some(expected), "format {s:?}");
        }
    }

    #[test]
    fn test_parse_order_timestamp_fractional_and_minutes() {
        assert!(parse_order_timestamp("2024-09-01 10:15:30.250").is_some());
        let dt = parse_order_timestamp("2024-09-01 10:15").unwrap();
        assert_eq!(dt.minute(), 15);
    }

    #[test]
    fn test_parse_order_timestamp_rejects_garbage() {
        assert!(parse_order_timestamp("").is_none());
        assert!(parse_order_timestamp("2024-13-01").is_none());
        assert!(parse_order_timestamp("tomorrow").is_none());
    }
}
