//! Narrowing an object listing to the files that touch a date window.

use chrono::DateTime;
use chrono_tz::Tz;
use tracing::debug;

use crate::key_codec::{label_interval, KeyCodec};
use crate::models::{KeyOption, ObjectKey};

/// Keys whose decoded start OR end lies in `[window_start, window_end]`.
///
/// Input order is preserved. Keys that do not decode cannot be data files and
/// are dropped without error.
pub fn filter(
    codec: &KeyCodec,
    keys: &[ObjectKey],
    window_start: &DateTime<Tz>,
    window_end: &DateTime<Tz>,
) -> Vec<ObjectKey> {
    options(codec, keys, window_start, window_end)
        .into_iter()
        .map(|option| option.key)
        .collect()
}

/// Same selection as [`filter`], paired with each key's label.
pub fn options(
    codec: &KeyCodec,
    keys: &[ObjectKey],
    window_start: &DateTime<Tz>,
    window_end: &DateTime<Tz>,
) -> Vec<KeyOption> {
    keys.iter()
        .filter_map(|key| match codec.decode(key) {
            Ok(interval) if interval.touches(window_start, window_end) => Some(KeyOption {
                label: label_interval(&interval),
                key: key.clone(),
            }),
            Ok(_) => None,
            Err(e) => {
                debug!(error = %e, "skipping undecodable key");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::TimezoneHandler;
    use chrono::TimeZone;
    use chrono_tz::Canada::Mountain;

    fn codec() -> KeyCodec {
        KeyCodec::new("test-data", TimezoneHandler::default()).unwrap()
    }

    fn day(d: u32) -> DateTime<Tz> {
        Mountain.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap()
    }

    fn k(start_day: u32, end_day: u32) -> ObjectKey {
        ObjectKey::new(format!(
            "test-data/output2024-01-{:02}T00:00:00Z_2024-01-{:02}T00:00:00Z",
            start_day, end_day
        ))
    }

    #[test]
    fn test_filter_gap_between_files_is_empty() {
        let keys = vec![k(1, 2), k(5, 6)];
        assert!(filter(&codec(), &keys, &day(3), &day(4)).is_empty());
    }

    #[test]
    fn test_filter_preserves_input_order() {
        let keys = vec![k(5, 6), k(1, 2), k(3, 4)];
        let kept = filter(&codec(), &keys, &day(1), &day(6));
        assert_eq!(kept, keys);
    }

    #[test]
    fn test_filter_start_or_end_inside() {
        let keys = vec![k(1, 3), k(3, 5), k(6, 7)];
        // Window [2, 4]: first via end (3), second via start (3).
        let kept = filter(&codec(), &keys, &day(2), &day(4));
        assert_eq!(kept, vec![k(1, 3), k(3, 5)]);
    }

    #[test]
    fn test_filter_inclusive_on_exact_boundary() {
        let keys = vec![k(1, 2)];
        assert_eq!(filter(&codec(), &keys, &day(2), &day(2)), keys);
        assert_eq!(filter(&codec(), &keys, &day(1), &day(1)), keys);
    }

    #[test]
    fn test_filter_reversed_interval_checked_per_endpoint() {
        let keys = vec![k(4, 1)];
        assert_eq!(filter(&codec(), &keys, &day(4), &day(5)), keys);
    }

    #[test]
    fn test_filter_keeps_key_stamped_inside_dst_gap() {
        let keys = vec![ObjectKey::from(
            "test-data/output2024-03-10T02:15:00Z_2024-03-10T02:45:00Z",
        )];
        let start = Mountain.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap();
        let end = Mountain.with_ymd_and_hms(2024, 3, 11, 0, 0, 0).unwrap();
        assert_eq!(filter(&codec(), &keys, &start, &end), keys);
    }

    #[test]
    fn test_filter_drops_malformed_keys_silently() {
        let keys = vec![
            ObjectKey::from("test-data/readme.txt"),
            k(1, 2),
            ObjectKey::from("test-data/output2024-01-01T00:00:00Z"),
        ];
        assert_eq!(filter(&codec(), &keys, &day(1), &day(2)), vec![k(1, 2)]);
    }

    #[test]
    fn test_filter_empty_input() {
        assert!(filter(&codec(), &[], &day(1), &day(2)).is_empty());
    }

    #[test]
    fn test_options_carry_labels() {
        let opts = options(&codec(), &[k(1, 2)], &day(1), &day(2));
        assert_eq!(opts.len(), 1);
        assert_eq!(
            opts[0].label,
            "2024 Jan 01(Mon), 12:00.00AM <=> 2024 Jan 02(Tue), 12:00.00AM"
        );
        assert_eq!(opts[0].key, k(1, 2));
    }
}
