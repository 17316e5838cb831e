//! Requests asking the acquisition process to record a new measurement file.
//!
//! The wire payload is `"<day>-<hour>-<minute1>_<second1>-<minute2>_<second2>"`
//! with the day as `YYYY-MM-DD` and every other field as two zero-padded
//! digits, e.g. `"2024-01-01-10-05_00-06_30"`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};

/// How many past days the capture form offers.
pub const SELECTABLE_DAYS: i64 = 7;

/// One capture slice: a day, an hour, and a start/end minute:second pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRequest {
    pub day: NaiveDate,
    pub hour: u8,
    pub minute1: u8,
    pub second1: u8,
    pub minute2: u8,
    pub second2: u8,
}

impl CaptureRequest {
    /// Build and validate a request.
    pub fn new(
        day: NaiveDate,
        hour: u8,
        (minute1, second1): (u8, u8),
        (minute2, second2): (u8, u8),
    ) -> Result<Self> {
        let request = Self {
            day,
            hour,
            minute1,
            second1,
            minute2,
            second2,
        };
        request.validate()?;
        Ok(request)
    }

    /// Reject fields outside their clock range.
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("hour", self.hour, 24),
            ("minute1", self.minute1, 60),
            ("second1", self.second1, 60),
            ("minute2", self.minute2, 60),
            ("second2", self.second2, 60),
        ];
        for (name, value, limit) in checks {
            if value >= limit {
                return Err(DashError::InvalidCaptureRequest(format!(
                    "{} must be below {}, got {}",
                    name, limit, value
                )));
            }
        }
        Ok(())
    }

    /// Render the request in its wire form.
    pub fn encode(&self) -> String {
        format!(
            "{}-{:02}-{:02}_{:02}-{:02}_{:02}",
            self.day.format("%Y-%m-%d"),
            self.hour,
            self.minute1,
            self.second1,
            self.minute2,
            self.second2
        )
    }

    /// UTF-8 bytes of [`CaptureRequest::encode`], ready to publish.
    pub fn payload(&self) -> Vec<u8> {
        self.encode().into_bytes()
    }
}

/// Days offered by the capture form: yesterday back through a week ago.
pub fn selectable_days(today: NaiveDate) -> Vec<NaiveDate> {
    (1..=SELECTABLE_DAYS)
        .filter_map(|i| today.checked_sub_signed(chrono::Duration::days(i)))
        .collect()
}

/// Reject a capture day the form would not offer relative to `today`.
pub fn check_selectable(day: NaiveDate, today: NaiveDate) -> Result<()> {
    let days = selectable_days(today);
    if days.contains(&day) {
        return Ok(());
    }
    let (newest, oldest) = match (days.first(), days.last()) {
        (Some(newest), Some(oldest)) => (*newest, *oldest),
        _ => {
            return Err(DashError::InvalidCaptureRequest(format!(
                "no selectable days before {}",
                today
            )))
        }
    };
    Err(DashError::InvalidCaptureRequest(format!(
        "day {} is outside {} ..= {}",
        day, oldest, newest
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_encode_zero_pads() {
        let req = CaptureRequest::new(jan(1), 9, (5, 0), (6, 30)).unwrap();
        assert_eq!(req.encode(), "2024-01-01-09-05_00-06_30");
        assert_eq!(req.payload(), b"2024-01-01-09-05_00-06_30".to_vec());
    }

    #[test]
    fn test_rejects_out_of_range_fields() {
        assert!(CaptureRequest::new(jan(1), 24, (0, 0), (0, 0)).is_err());
        assert!(CaptureRequest::new(jan(1), 0, (60, 0), (0, 0)).is_err());
        assert!(CaptureRequest::new(jan(1), 0, (0, 0), (0, 60)).is_err());
    }

    #[test]
    fn test_selectable_days() {
        let days = selectable_days(jan(10));
        assert_eq!(days.len(), 7);
        assert_eq!(days[0], jan(9));
        assert_eq!(days[6], jan(3));
    }

    #[test]
    fn test_check_selectable_accepts_last_week_only() {
        assert!(check_selectable(jan(9), jan(10)).is_ok());
        assert!(check_selectable(jan(3), jan(10)).is_ok());

        let today = check_selectable(jan(10), jan(10)).unwrap_err();
        assert!(matches!(today, DashError::InvalidCaptureRequest(_)));
        let msg = check_selectable(jan(2), jan(10)).unwrap_err().to_string();
        assert!(msg.contains("2024-01-03 ..= 2024-01-09"), "{}", msg);
    }
}
