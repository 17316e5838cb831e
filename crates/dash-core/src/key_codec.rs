//! Decoding of measurement-file keys into the time interval they cover.
//!
//! A key looks like `"<folder>/output<start>Z<sep><end>Z<rest>"`: two
//! timestamps, each terminated by a `Z`. The separator is either one
//! non-digit character (`_`), or one or two characters of any kind closed by
//! another `Z` (`_Z`, `5Z`, `A Z`). Anything after the second `Z` is ignored.
//! Keys are only ever decoded here, never built.

use regex::Regex;

use crate::error::{DashError, Result};
use crate::models::{ObjectKey, TimeInterval};
use crate::time_utils::{epoch_seconds, format_label_time, TimezoneHandler};

/// Text joining the two ends of a label.
pub const LABEL_SEPARATOR: &str = " <=> ";

/// Builds the listing prefix for a folder: `"<folder>/output"`.
pub fn key_prefix(folder: &str) -> String {
    format!("{}/output", folder)
}

// ── KeyCodec ──────────────────────────────────────────────────────────────────

/// Pure decoder for keys under one folder prefix and one fixed timezone.
#[derive(Debug, Clone)]
pub struct KeyCodec {
    prefix: String,
    pattern: Regex,
    tz: TimezoneHandler,
}

impl KeyCodec {
    /// Create a codec for keys stored under `folder`.
    pub fn new(folder: &str, tz: TimezoneHandler) -> Result<Self> {
        let prefix = key_prefix(folder);
        let grammar = format!(
            r"^{}(?P<start>[^Z]+)Z(?:[^Z]{{1,2}}Z|[^0-9Z])?(?P<end>[^Z]+)Z",
            regex::escape(&prefix)
        );
        let pattern = Regex::new(&grammar)
            .map_err(|e| DashError::Config(format!("key grammar for {}: {}", folder, e)))?;
        Ok(Self {
            prefix,
            pattern,
            tz,
        })
    }

    /// The `"<folder>/output"` prefix every data key starts with.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn timezone(&self) -> &TimezoneHandler {
        &self.tz
    }

    /// Decode the interval a key covers, in the codec's timezone.
    ///
    /// Embedded offsets are discarded; the endpoints are returned in the order
    /// they appear in the key.
    pub fn decode(&self, key: &ObjectKey) -> Result<TimeInterval> {
        let raw = key.as_str();
        if !raw.starts_with(&self.prefix) {
            return Err(DashError::malformed(
                raw,
                format!("missing prefix \"{}\"", self.prefix),
            ));
        }

        let caps = self.pattern.captures(raw).ok_or_else(|| {
            DashError::malformed(raw, "expected two Z-terminated timestamps")
        })?;

        let start = self.parse_endpoint(raw, &caps["start"], "start")?;
        let end = self.parse_endpoint(raw, &caps["end"], "end")?;
        Ok(TimeInterval::new(start, end))
    }

    /// Human-readable rendering of the key's interval, e.g.
    /// `"2024 Jan 01(Mon), 10:00.00AM <=> 2024 Jan 01(Mon), 12:00.00PM"`.
    pub fn label(&self, key: &ObjectKey) -> Result<String> {
        self.decode(key).map(|interval| label_interval(&interval))
    }

    /// Both endpoints as seconds since the Unix epoch.
    pub fn epoch_seconds(&self, key: &ObjectKey) -> Result<(f64, f64)> {
        let interval = self.decode(key)?;
        Ok((epoch_seconds(&interval.start), epoch_seconds(&interval.end)))
    }

    fn parse_endpoint(
        &self,
        key: &str,
        text: &str,
        which: &str,
    ) -> Result<chrono::DateTime<chrono_tz::Tz>> {
        let naive = TimezoneHandler::parse_naive(text).ok_or_else(|| {
            DashError::malformed(key, format!("unparseable {} timestamp \"{}\"", which, text))
        })?;
        Ok(self.tz.localize_forward(naive))
    }
}

/// Render an already-decoded interval as a label.
pub fn label_interval(interval: &TimeInterval) -> String {
    [
        format_label_time(&interval.start),
        format_label_time(&interval.end),
    ]
    .join(LABEL_SEPARATOR)
}
