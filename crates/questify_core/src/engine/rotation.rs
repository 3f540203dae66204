//! Daily assignment staleness check.
//!
//! Days are bucketed by calendar date in a fixed reference offset supplied
//! by configuration, never the host's local zone.

use crate::model::EpochMillis;
use chrono::{DateTime, FixedOffset, NaiveDate};

/// Calendar date of `at` in `zone`.
///
/// Returns `None` when the timestamp is outside chrono's representable range.
pub fn day_bucket(at: EpochMillis, zone: FixedOffset) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(at).map(|utc| utc.with_timezone(&zone).date_naive())
}

/// Returns whether the user's quest set must be regenerated at `now`.
///
/// True when nothing was assigned yet, when the assigned list is empty, or
/// when `last_assigned_at` and `now` fall on different calendar days.
/// Unrepresentable timestamps count as stale.
pub fn needs_refresh(
    last_assigned_at: Option<EpochMillis>,
    now: EpochMillis,
    has_non_empty_task_list: bool,
    zone: FixedOffset,
) -> bool {
    let Some(last_assigned_at) = last_assigned_at else {
        return true;
    };
    if !has_non_empty_task_list {
        return true;
    }

    match (day_bucket(last_assigned_at, zone), day_bucket(now, zone)) {
        (Some(last_day), Some(today)) => last_day != today,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::{day_bucket, needs_refresh};
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    fn utc() -> FixedOffset {
        FixedOffset::east_opt(0).unwrap()
    }

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> i64 {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .timestamp_millis()
    }

    #[test]
    fn missing_assignment_needs_refresh() {
        assert!(needs_refresh(None, at(2024, 5, 1, 12, 0), true, utc()));
        assert!(needs_refresh(None, at(2024, 5, 1, 12, 0), false, utc()));
    }

    #[test]
    fn empty_task_list_needs_refresh_even_on_same_day() {
        let now = at(2024, 5, 1, 12, 0);
        assert!(needs_refresh(Some(now - 60_000), now, false, utc()));
    }

    #[test]
    fn crossing_midnight_needs_refresh() {
        let last = at(2024, 4, 30, 23, 59);
        let now = at(2024, 5, 1, 0, 1);
        assert!(needs_refresh(Some(last), now, true, utc()));
    }

    #[test]
    fn same_calendar_day_keeps_assignment() {
        let last = at(2024, 5, 1, 0, 1);
        let now = at(2024, 5, 1, 23, 59);
        assert!(!needs_refresh(Some(last), now, true, utc()));
    }

    #[test]
    fn same_day_number_in_another_month_needs_refresh() {
        let last = at(2024, 4, 1, 9, 0);
        let now = at(2024, 5, 1, 9, 0);
        assert!(needs_refresh(Some(last), now, true, utc()));
    }

    #[test]
    fn reference_offset_moves_the_day_boundary() {
        let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
        let last = at(2024, 5, 1, 21, 30);
        let now = at(2024, 5, 1, 22, 30);

        assert!(!needs_refresh(Some(last), now, true, utc()));
        assert!(needs_refresh(Some(last), now, true, plus_two));
        assert_eq!(
            day_bucket(now, plus_two),
            NaiveDate::from_ymd_opt(2024, 5, 2)
        );
    }

    #[test]
    fn unrepresentable_timestamp_is_stale_not_a_panic() {
        assert!(needs_refresh(Some(i64::MAX), 0, true, utc()));
    }
}
