//! Binning an aggregated dataset into one histogram series per label.
//!
//! Rows are binned on the x column over equal-width bins shared by all
//! series; each bin sums the y column of the rows that fall into it. Rows
//! missing either value are skipped.

use dash_core::error::{DashError, Result};
use dash_core::models::AggregatedDataset;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub sum: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramSeries {
    pub label: String,
    pub bins: Vec<HistogramBin>,
}

impl HistogramSeries {
    pub fn total(&self) -> f64 {
        self.bins.iter().map(|b| b.sum).sum()
    }
}

/// Histogram of `y` summed over bins of `x`, one series per label.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub x_column: String,
    pub y_column: String,
    pub series: Vec<HistogramSeries>,
}

impl Histogram {
    /// Bin `dataset` into `bins` equal-width buckets of `x_column`.
    ///
    /// An empty dataset yields a histogram with no series. Series appear in
    /// first-seen label order.
    pub fn build(
        dataset: &AggregatedDataset,
        x_column: &str,
        y_column: &str,
        bins: usize,
    ) -> Result<Self> {
        if bins == 0 {
            return Err(DashError::Config("bins must be positive".to_string()));
        }

        let mut histogram = Self {
            x_column: x_column.to_string(),
            y_column: y_column.to_string(),
            series: Vec::new(),
        };
        if dataset.is_empty() {
            return Ok(histogram);
        }

        let x_idx = dataset
            .column_index(x_column)
            .ok_or_else(|| DashError::UnknownColumn(x_column.to_string()))?;
        let y_idx = dataset
            .column_index(y_column)
            .ok_or_else(|| DashError::UnknownColumn(y_column.to_string()))?;

        let points: Vec<(&str, f64, f64)> = dataset
            .rows
            .iter()
            .filter_map(|row| {
                let x = row.get(x_idx).filter(|v| v.is_finite())?;
                let y = row.get(y_idx).filter(|v| v.is_finite())?;
                Some((&*row.label, x, y))
            })
            .collect();

        let (min, max) = if points.is_empty() {
            (0.0, 0.0)
        } else {
            points
                .iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &(_, x, _)| {
                    (lo.min(x), hi.max(x))
                })
        };
        let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

        let empty_bins: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                lower: min + width * i as f64,
                upper: min + width * (i + 1) as f64,
                count: 0,
                sum: 0.0,
            })
            .collect();

        for label in dataset.labels() {
            histogram.series.push(HistogramSeries {
                label: label.to_string(),
                bins: empty_bins.clone(),
            });
        }

        for (label, x, y) in points {
            let idx = (((x - min) / width).floor() as usize).min(bins - 1);
            if let Some(series) = histogram.series.iter_mut().find(|s| s.label == label) {
                let bin = &mut series.bins[idx];
                bin.count += 1;
                bin.sum += y;
            }
        }

        Ok(histogram)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_core::models::{DatasetRow, LabeledTable};
    use std::sync::Arc;

    fn table(label: &str, rows: &[(f64, f64)]) -> LabeledTable {
        let label: Arc<str> = Arc::from(label);
        LabeledTable {
            columns: vec!["Frequency".to_string(), "Voltage".to_string()],
            label: Arc::clone(&label),
            rows: rows
                .iter()
                .map(|&(x, y)| DatasetRow {
                    values: vec![Some(x), Some(y)],
                    label: Arc::clone(&label),
                })
                .collect(),
        }
    }

    #[test]
    fn test_empty_dataset_gives_empty_histogram() {
        let h = Histogram::build(&AggregatedDataset::new(), "Frequency", "Voltage", 10).unwrap();
        assert!(h.is_empty());
        assert_eq!(h.x_column, "Frequency");
    }

    #[test]
    fn test_zero_bins_rejected() {
        assert!(Histogram::build(&AggregatedDataset::new(), "x", "y", 0).is_err());
    }

    #[test]
    fn test_unknown_column() {
        let mut ds = AggregatedDataset::new();
        ds.append(&table("a", &[(1.0, 1.0)]));
        let err = Histogram::build(&ds, "Frequency", "Current", 4).unwrap_err();
        assert!(matches!(err, DashError::UnknownColumn(c) if c == "Current"));
    }

    #[test]
    fn test_sums_y_per_bin_and_label() {
        let mut ds = AggregatedDataset::new();
        ds.append(&table("a", &[(0.0, 1.0), (1.0, 2.0), (10.0, 4.0)]));
        ds.append(&table("b", &[(5.0, 8.0)]));

        let h = Histogram::build(&ds, "Frequency", "Voltage", 2).unwrap();
        assert_eq!(h.series.len(), 2);

        let a = &h.series[0];
        assert_eq!(a.label, "a");
        assert_eq!((a.bins[0].count, a.bins[0].sum), (2, 3.0));
        // Max value lands in the last bin.
        assert_eq!((a.bins[1].count, a.bins[1].sum), (1, 4.0));
        assert_eq!(a.total(), 7.0);

        let b = &h.series[1];
        assert_eq!((b.bins[1].count, b.bins[1].sum), (1, 8.0));
        assert_eq!(b.bins[0].count, 0);
        assert_eq!(b.bins[0].lower, 0.0);
        assert_eq!(b.bins[1].upper, 10.0);
    }

    #[test]
    fn test_single_x_value() {
        let mut ds = AggregatedDataset::new();
        ds.append(&table("a", &[(3.0, 1.0), (3.0, 2.0)]));
        let h = Histogram::build(&ds, "Frequency", "Voltage", 5).unwrap();
        assert_eq!(h.series[0].bins[0].count, 2);
        assert_eq!(h.series[0].total(), 3.0);
    }

    #[test]
    fn test_rows_missing_values_skipped() {
        let label: Arc<str> = Arc::from("a");
        let mut ds = AggregatedDataset::new();
        ds.append(&LabeledTable {
            columns: vec!["Frequency".to_string(), "Voltage".to_string()],
            label: Arc::clone(&label),
            rows: vec![
                DatasetRow {
                    values: vec![Some(1.0), None],
                    label: Arc::clone(&label),
                },
                DatasetRow {
                    values: vec![Some(2.0), Some(5.0)],
                    label: Arc::clone(&label),
                },
            ],
        });
        let h = Histogram::build(&ds, "Frequency", "Voltage", 1).unwrap();
        assert_eq!(h.series[0].bins[0].count, 1);
        assert_eq!(h.series[0].total(), 5.0);
    }
}
