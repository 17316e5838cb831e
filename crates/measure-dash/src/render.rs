//! Plain-text rendering of command results.

use dash_core::models::KeyOption;
use dash_data::aggregator::KeyFailure;
use dash_data::histogram::Histogram;

/// Widest bar drawn for the largest bin.
const BAR_WIDTH: usize = 40;

/// One `label  key` line per selectable file.
pub fn render_options(options: &[KeyOption]) -> String {
    if options.is_empty() {
        return "No files in the selected window.\n".to_string();
    }
    let mut out = String::new();
    for option in options {
        out.push_str(&format!("{}\t{}\n", option.label, option.key));
    }
    out
}

/// Per-label bin table with proportional `#` bars.
///
/// An empty histogram renders as an empty plot, not an error.
pub fn render_histogram(histogram: &Histogram) -> String {
    let mut out = format!(
        "Histogram of sum({}) by {}\n",
        histogram.y_column, histogram.x_column
    );
    if histogram.is_empty() {
        out.push_str("(no data)\n");
        return out;
    }

    let peak = histogram
        .series
        .iter()
        .flat_map(|s| s.bins.iter())
        .map(|b| b.sum.abs())
        .fold(0.0_f64, f64::max);

    for series in &histogram.series {
        out.push_str(&format!("\n{}\n", series.label));
        for bin in &series.bins {
            let len = if peak > 0.0 {
                ((bin.sum.abs() / peak) * BAR_WIDTH as f64).round() as usize
            } else {
                0
            };
            out.push_str(&format!(
                "  [{:>12.3}, {:>12.3})  n={:<6} sum={:<14.4} {}\n",
                bin.lower,
                bin.upper,
                bin.count,
                bin.sum,
                "#".repeat(len)
            ));
        }
    }
    out
}

/// One line per key that was left out of a plot.
pub fn render_failures(failures: &[KeyFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("skipped {}: {}\n", f.key, f.error))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dash_core::error::DashError;
    use dash_core::models::ObjectKey;
    use dash_data::histogram::{HistogramBin, HistogramSeries};

    #[test]
    fn test_render_options_empty() {
        assert_eq!(render_options(&[]), "No files in the selected window.\n");
    }

    #[test]
    fn test_render_options_lines() {
        let options = vec![KeyOption {
            label: "L".to_string(),
            key: ObjectKey::from("test-data/output1"),
        }];
        assert_eq!(render_options(&options), "L\ttest-data/output1\n");
    }

    #[test]
    fn test_render_empty_histogram() {
        let h = Histogram {
            x_column: "Frequency".to_string(),
            y_column: "Voltage".to_string(),
            series: vec![],
        };
        let text = render_histogram(&h);
        assert!(text.contains("sum(Voltage) by Frequency"));
        assert!(text.contains("(no data)"));
    }

    #[test]
    fn test_render_histogram_scales_bars() {
        let h = Histogram {
            x_column: "x".to_string(),
            y_column: "y".to_string(),
            series: vec![HistogramSeries {
                label: "run".to_string(),
                bins: vec![
                    HistogramBin {
                        lower: 0.0,
                        upper: 1.0,
                        count: 1,
                        sum: 2.0,
                    },
                    HistogramBin {
                        lower: 1.0,
                        upper: 2.0,
                        count: 1,
                        sum: 1.0,
                    },
                ],
            }],
        };
        let text = render_histogram(&h);
        assert!(text.contains(&"#".repeat(BAR_WIDTH)));
        assert!(text.contains(&format!(" {}\n", "#".repeat(BAR_WIDTH / 2))));
        assert!(text.contains("\nrun\n"));
    }

    #[test]
    fn test_render_failures() {
        let failures = vec![KeyFailure {
            key: ObjectKey::from("k"),
            error: DashError::unavailable("k", "gone"),
        }];
        assert_eq!(
            render_failures(&failures),
            "skipped k: Data unavailable for k: gone\n"
        );
    }
}
