use chrono::DateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

// ── ObjectKey ─────────────────────────────────────────────────────────────────

/// Name of a stored measurement file, e.g.
/// `"test-data/output2024-01-01T10:00:00Z_2024-01-01T12:00:00Z"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ObjectKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ── TimeInterval ──────────────────────────────────────────────────────────────

/// The span of time a measurement file covers, exactly as encoded in its key.
///
/// `start <= end` is not enforced: a key written with its timestamps swapped
/// decodes to a reversed interval and [`TimeInterval::duration`] goes negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeInterval {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl TimeInterval {
    pub fn new(start: DateTime<Tz>, end: DateTime<Tz>) -> Self {
        Self { start, end }
    }

    /// `end - start`; negative for reversed intervals.
    pub fn duration(&self) -> chrono::Duration {
        self.end.signed_duration_since(self.start)
    }

    pub fn is_reversed(&self) -> bool {
        self.end < self.start
    }

    /// `true` when either endpoint lies in `[window_start, window_end]`.
    pub fn touches(&self, window_start: &DateTime<Tz>, window_end: &DateTime<Tz>) -> bool {
        let inside = |t: &DateTime<Tz>| window_start <= t && t <= window_end;
        inside(&self.start) || inside(&self.end)
    }
}

// ── Rows and tables ───────────────────────────────────────────────────────────

/// One parsed CSV record tagged with the label of the file it came from.
///
/// `values` is positional against the owning table's column list; empty cells
/// are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetRow {
    pub values: Vec<Option<f64>>,
    pub label: Arc<str>,
}

impl DatasetRow {
    /// Value at column position `idx`, `None` when absent or empty.
    pub fn get(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().flatten()
    }
}

/// The parsed content of a single object, every row carrying the same label.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    pub columns: Vec<String>,
    pub label: Arc<str>,
    pub rows: Vec<DatasetRow>,
}

impl LabeledTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Rows of several tables concatenated in request order.
///
/// Columns are the union of the source columns in first-seen order; a row
/// from a table lacking some column reads `None` there.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedDataset {
    pub columns: Vec<String>,
    pub rows: Vec<DatasetRow>,
}

impl AggregatedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append all rows of `table`, re-projecting them onto the unified columns.
    pub fn append(&mut self, table: &LabeledTable) {
        let mapping: Vec<usize> = table
            .columns
            .iter()
            .map(|name| self.column_slot(name))
            .collect();

        if mapping.iter().enumerate().all(|(src, &dst)| src == dst) {
            self.rows.extend(table.rows.iter().cloned());
            return;
        }

        let width = self.columns.len();
        self.rows.extend(table.rows.iter().map(|row| {
            let mut values = vec![None; width];
            for (src, &dst) in mapping.iter().enumerate() {
                values[dst] = row.get(src);
            }
            DatasetRow {
                values,
                label: Arc::clone(&row.label),
            }
        }));
    }

    /// Distinct labels in first-seen order.
    pub fn labels(&self) -> Vec<Arc<str>> {
        let mut seen: Vec<Arc<str>> = Vec::new();
        for row in &self.rows {
            if !seen.iter().any(|l| *l == row.label) {
                seen.push(Arc::clone(&row.label));
            }
        }
        seen
    }

    fn column_slot(&mut self, name: &str) -> usize {
        match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        }
    }
}

// ── KeyOption ─────────────────────────────────────────────────────────────────

/// A selectable file: its human label plus the key it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyOption {
    pub label: String,
    pub key: ObjectKey,
}
