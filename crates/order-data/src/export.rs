//! CSV export of enriched orders.
//!
//! Output is UTF-8 with a leading byte-order mark so spreadsheet applications
//! detect the encoding. Columns are the original header in its original order
//! followed by the derived columns.

use std::io::Write;
use std::path::Path;

use order_core::error::{AnalyticsError, Result};
use order_core::models::{columns, EnrichedOrder, EnrichedTable};
use tracing::info;

/// UTF-8 byte-order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Timestamp layout used for `order_at` and `first_order_date`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write `table` as BOM-prefixed CSV to `writer`.
pub fn write_csv<W: Write>(table: &EnrichedTable, mut writer: W) -> Result<()> {
    writer.write_all(UTF8_BOM)?;

    let mut wtr = csv::Writer::from_writer(writer);
    let header = table
        .headers
        .iter()
        .map(String::as_str)
        .chain(columns::DERIVED);
    wtr.write_record(header)?;

    for row in &table.rows {
        wtr.write_record(export_fields(table, row))?;
    }

    wtr.flush()?;
    Ok(())
}

/// Render `table` into an in-memory CSV buffer.
pub fn to_csv_bytes(table: &EnrichedTable) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    Ok(buf)
}

/// Write `table` to the file at `path`, replacing it if present.
pub fn export_csv(table: &EnrichedTable, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path).map_err(|source| AnalyticsError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    write_csv(table, std::io::BufWriter::new(file))?;
    info!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}

/// The output fields of one row: original fields with `order_at` normalised,
/// then the derived values.
fn export_fields(table: &EnrichedTable, row: &EnrichedOrder) -> Vec<String> {
    let mut fields: Vec<String> = row
        .order
        .fields
        .iter()
        .enumerate()
        .map(|(idx, value)| {
            if idx == table.layout.order_at {
                row.order.order_at.format(TIMESTAMP_FORMAT).to_string()
            } else {
                value.clone()
            }
        })
        .collect();

    fields.extend([
        row.traffic_source.to_string(),
        row.purchase_count.to_string(),
        row.first_order_date.format(TIMESTAMP_FORMAT).to_string(),
        row.cohort().first_flag().to_string(),
        row.month.clone(),
        row.year.clone(),
        row.price_segment.to_string(),
    ]);
    fields
}
