use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, Offset, TimeZone};
use chrono_tz::Tz;
use tracing::debug;

use crate::error::{DashError, Result};

/// Timezone the acquisition hardware stamps its files in.
pub const DEFAULT_TIMEZONE: &str = "Canada/Mountain";

/// strftime layout of one side of a label, e.g. `2024 Jan 01(Mon), 10:00.00AM`.
pub const LABEL_TIME_FORMAT: &str = "%Y %b %d(%a), %I:%M.%S%p";

/// Layouts accepted for naive date-times, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
];

/// Layouts accepted for bare dates; they resolve to midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

// ── TimezoneHandler ───────────────────────────────────────────────────────────

/// Parses wall-clock timestamps and pins them to one named timezone.
///
/// Any offset embedded in the input is discarded: the wall-clock reading is
/// kept and the handler's zone is attached to it.
#[derive(Debug, Clone, Copy)]
pub struct TimezoneHandler {
    tz: Tz,
}

impl TimezoneHandler {
    /// Create a handler for the given IANA timezone name.
    pub fn new(tz_name: &str) -> Result<Self> {
        let tz = tz_name
            .parse::<Tz>()
            .map_err(|_| DashError::Config(format!("unknown timezone \"{}\"", tz_name)))?;
        Ok(Self { tz })
    }

    /// Validate that `tz_name` is a recognised IANA timezone identifier.
    pub fn validate_timezone(tz_name: &str) -> bool {
        tz_name.parse::<Tz>().is_ok()
    }

    /// The zone attached to every parsed value.
    pub fn tz(&self) -> Tz {
        self.tz
    }

    /// Parse a loosely ISO-8601 string into a naive wall-clock value.
    ///
    /// Handles a trailing `Z`, fixed offsets, fractional seconds and bare
    /// dates. Returns `None` for empty strings or unrecognised formats.
    pub fn parse_naive(s: &str) -> Option<NaiveDateTime> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        let normalised = match s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
            Some(stripped) => format!("{}+00:00", stripped),
            None => s.to_string(),
        };
        if let Ok(dt) = DateTime::parse_from_rfc3339(&normalised) {
            return Some(dt.naive_local());
        }

        let bare = s.trim_end_matches(['Z', 'z']);
        for fmt in DATETIME_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(bare, fmt) {
                return Some(naive);
            }
        }
        for fmt in DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(bare, fmt) {
                return date.and_hms_opt(0, 0, 0);
            }
        }

        debug!("TimezoneHandler: could not parse timestamp \"{}\"", s);
        None
    }

    /// Attach the handler's zone to a wall-clock value.
    ///
    /// Ambiguous readings (DST fall-back) resolve to the earlier instant;
    /// readings inside a DST gap do not exist and are rejected.
    pub fn localize(&self, naive: NaiveDateTime) -> Result<DateTime<Tz>> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => Ok(dt),
            LocalResult::Ambiguous(earliest, _) => Ok(earliest),
            LocalResult::None => Err(DashError::TimestampParse(format!(
                "{} does not exist in {}",
                naive,
                self.tz.name()
            ))),
        }
    }

    /// Like [`TimezoneHandler::localize`], but never fails: a reading inside
    /// a DST gap is read with the offset in force just before the gap, which
    /// moves it forward by the gap's length.
    pub fn localize_forward(&self, naive: NaiveDateTime) -> DateTime<Tz> {
        match self.tz.from_local_datetime(&naive) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => {
                let before = self
                    .tz
                    .offset_from_utc_datetime(&(naive - Duration::days(1)))
                    .fix();
                let utc = naive - Duration::seconds(i64::from(before.local_minus_utc()));
                self.tz.from_utc_datetime(&utc)
            }
        }
    }

    /// Parse `s` and attach the handler's zone.
    pub fn parse_in_zone(&self, s: &str) -> Result<DateTime<Tz>> {
        let naive =
            Self::parse_naive(s).ok_or_else(|| DashError::TimestampParse(s.to_string()))?;
        self.localize(naive)
    }
}

impl Default for TimezoneHandler {
    fn default() -> Self {
        Self {
            tz: chrono_tz::Canada::Mountain,
        }
    }
}

// ── Formatting ────────────────────────────────────────────────────────────────

/// Render one end of a label, e.g. `"2024 Jan 01(Mon), 10:00.00AM"`.
pub fn format_label_time(dt: &DateTime<Tz>) -> String {
    dt.format(LABEL_TIME_FORMAT).to_string()
}

/// Seconds since the Unix epoch, including the sub-second part.
pub fn epoch_seconds(dt: &DateTime<Tz>) -> f64 {
    dt.timestamp() as f64 + f64::from(dt.timestamp_subsec_nanos()) / 1_000_000_000.0
}

// ── Tests ──────────────────────────────────────────────────────────────────────
