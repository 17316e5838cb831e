//! CSV parsing of measurement files into labeled tables.
//!
//! Files are comma-separated with a header row naming at least two columns.
//! Cells that are empty, `nan` or not a number (timestamps, notes) become
//! missing values, so such columns never block plotting the numeric ones.
//! Repeated header names get a `.1`, `.2`, ... suffix.

use std::collections::HashSet;
use std::sync::Arc;

use dash_core::error::{DashError, Result};
use dash_core::models::{DatasetRow, LabeledTable, ObjectKey};
use tracing::debug;

/// Fewest columns a measurement file may have.
pub const MIN_COLUMNS: usize = 2;

/// Parse `content` (the bytes behind `key`) and tag every row with `label`.
///
/// Structural problems (no header, too few columns, extra fields, invalid
/// UTF-8) are reported as [`DashError::DataUnavailable`] for `key`.
pub fn read_table(key: &ObjectKey, content: &[u8], label: &str) -> Result<LabeledTable> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content);

    let headers = reader
        .headers()
        .map_err(|e| DashError::unavailable(key.as_str(), format!("header: {}", e)))?
        .clone();
    let columns = dedupe_columns(headers.iter());

    if columns.len() < MIN_COLUMNS || headers.iter().all(|h| h.is_empty()) {
        return Err(DashError::unavailable(
            key.as_str(),
            format!(
                "expected at least {} columns, found {}",
                MIN_COLUMNS,
                columns.len()
            ),
        ));
    }

    let label: Arc<str> = Arc::from(label);
    let mut rows = Vec::new();
    let mut text_cells = 0usize;

    for (i, record) in reader.records().enumerate() {
        // Line 1 is the header.
        let line = i + 2;
        let record =
            record.map_err(|e| DashError::unavailable(key.as_str(), format!("line {}: {}", line, e)))?;

        if record.len() > columns.len() {
            return Err(DashError::unavailable(
                key.as_str(),
                format!(
                    "line {}: {} fields for {} columns",
                    line,
                    record.len(),
                    columns.len()
                ),
            ));
        }

        let cells = record.iter().map(Some).chain(std::iter::repeat(None));
        let values: Vec<Option<f64>> = cells
            .take(columns.len())
            .map(|cell| {
                let value = parse_cell(cell);
                if value.is_none() && cell.is_some_and(|c| !is_blank(c)) {
                    text_cells += 1;
                }
                value
            })
            .collect();

        rows.push(DatasetRow {
            values,
            label: Arc::clone(&label),
        });
    }

    debug!(
        "Parsed {} rows x {} columns from {} ({} non-numeric cells)",
        rows.len(),
        columns.len(),
        key,
        text_cells
    );

    Ok(LabeledTable {
        columns,
        label,
        rows,
    })
}

/// Numeric value of a cell; anything else is a missing value.
fn parse_cell(cell: Option<&str>) -> Option<f64> {
    cell.filter(|s| !is_blank(s))
        .and_then(|s| s.parse::<f64>().ok())
}

fn is_blank(cell: &str) -> bool {
    cell.is_empty() || cell.eq_ignore_ascii_case("nan")
}

/// Suffix repeated header names so every column keeps its own slot:
/// `a,a,b,a` becomes `a,a.1,b,a.2`.
fn dedupe_columns<'a>(headers: impl Iterator<Item = &'a str>) -> Vec<String> {
    let headers: Vec<&str> = headers.collect();
    let mut taken: HashSet<String> = HashSet::new();
    let mut columns = Vec::with_capacity(headers.len());
    for header in headers {
        let mut name = header.to_string();
        let mut n = 1;
        while !taken.insert(name.clone()) {
            name = format!("{}.{}", header, n);
            n += 1;
        }
        columns.push(name);
    }
    columns
}
