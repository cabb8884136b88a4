//! Consecutive-unreachable-day tracking for phone numbers.
//!
//! A number becomes ineffective after N consecutive calling days of
//! unreachable results with no intervening reachable result. Holidays do not
//! break the streak. Once flagged, the number stays excluded until the
//! refresh window elapses, after which the counter resets to zero.

use super::domain::{BucketConfig, ConnectionKind, IneffectiveCounter};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeSet;

/// Fold one call result into the counter. At most one increment per
/// calendar day per skiptrace; replayed callbacks for the same day are
/// no-ops.
pub fn record_result(
    counter: &mut IneffectiveCounter,
    kind: ConnectionKind,
    date: NaiveDate,
    holidays: &BTreeSet<NaiveDate>,
    threshold_days: u32,
) {
    match kind {
        ConnectionKind::Reachable => {
            counter.consecutive_days = 0;
            counter.last_unreachable = None;
            counter.flag_as_unreachable_date = None;
        }
        ConnectionKind::Unreachable => {
            match counter.last_unreachable {
                Some(last) if last == date => return,
                Some(last) if streak_continues(last, date, holidays) => {
                    counter.consecutive_days += 1;
                }
                _ => {
                    counter.consecutive_days = 1;
                }
            }
            counter.last_unreachable = Some(date);

            if counter.consecutive_days >= threshold_days
                && counter.flag_as_unreachable_date.is_none()
            {
                counter.flag_as_unreachable_date = Some(date);
            }
        }
    }
}

/// The streak continues when every day strictly between the last unreachable
/// day and today is a holiday. Adjacent days have an empty gap and always
/// continue.
fn streak_continues(last: NaiveDate, date: NaiveDate, holidays: &BTreeSet<NaiveDate>) -> bool {
    if date <= last {
        return false;
    }
    let mut day = last + Duration::days(1);
    while day < date {
        if !holidays.contains(&day) {
            return false;
        }
        day += Duration::days(1);
    }
    true
}

/// Reset the counter when the refresh window has elapsed since flagging.
/// Returns true if a reset happened.
pub fn maybe_refresh(counter: &mut IneffectiveCounter, as_of: NaiveDate, refresh_days: i64) -> bool {
    if let Some(flagged) = counter.flag_as_unreachable_date {
        if (as_of - flagged).num_days() > refresh_days {
            counter.consecutive_days = 0;
            counter.last_unreachable = None;
            counter.flag_as_unreachable_date = None;
            return true;
        }
    }
    false
}

/// Whether the number should be excluded from dialing as of `as_of`,
/// honoring the bucket's threshold and refresh window.
pub fn is_ineffective(counter: &IneffectiveCounter, bucket: &BucketConfig, as_of: NaiveDate) -> bool {
    match counter.flag_as_unreachable_date {
        Some(flagged) => (as_of - flagged).num_days() <= bucket.ineffective_refresh_days,
        None => counter.consecutive_days >= bucket.ineffective_threshold_days,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, d).expect("valid date")
    }

    fn bucket(threshold: u32, refresh: i64) -> BucketConfig {
        BucketConfig {
            name: "B1".to_string(),
            dpd_min: 1,
            dpd_max: 11,
            min_outstanding: 0,
            risk_range: None,
            ineffective_threshold_days: threshold,
            ineffective_refresh_days: refresh,
            batch_size: 500,
        }
    }

    #[test]
    fn consecutive_unreachable_days_accumulate() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays = BTreeSet::new();
        record_result(&mut counter, ConnectionKind::Unreachable, day(1), &holidays, 3);
        record_result(&mut counter, ConnectionKind::Unreachable, day(2), &holidays, 3);
        assert_eq!(counter.consecutive_days, 2);
        assert_eq!(counter.flag_as_unreachable_date, None);
    }

    #[test]
    fn reachable_result_resets_the_streak() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays = BTreeSet::new();
        record_result(&mut counter, ConnectionKind::Unreachable, day(1), &holidays, 3);
        record_result(&mut counter, ConnectionKind::Unreachable, day(2), &holidays, 3);
        record_result(&mut counter, ConnectionKind::Reachable, day(3), &holidays, 3);
        assert_eq!(counter.consecutive_days, 0);
        assert_eq!(counter.last_unreachable, None);
    }

    #[test]
    fn holiday_gap_does_not_break_the_streak() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays: BTreeSet<_> = [day(2)].into_iter().collect();
        record_result(&mut counter, ConnectionKind::Unreachable, day(1), &holidays, 3);
        // No call happens on the holiday itself.
        record_result(&mut counter, ConnectionKind::Unreachable, day(3), &holidays, 3);
        assert_eq!(counter.consecutive_days, 2);
    }

    #[test]
    fn non_holiday_gap_restarts_the_streak() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays = BTreeSet::new();
        record_result(&mut counter, ConnectionKind::Unreachable, day(1), &holidays, 3);
        record_result(&mut counter, ConnectionKind::Unreachable, day(4), &holidays, 3);
        assert_eq!(counter.consecutive_days, 1);
    }

    #[test]
    fn same_day_replay_does_not_double_count() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays = BTreeSet::new();
        record_result(&mut counter, ConnectionKind::Unreachable, day(1), &holidays, 3);
        record_result(&mut counter, ConnectionKind::Unreachable, day(1), &holidays, 3);
        assert_eq!(counter.consecutive_days, 1);
    }

    #[test]
    fn reaching_threshold_sets_flag_date() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays = BTreeSet::new();
        for d in 1..=3 {
            record_result(&mut counter, ConnectionKind::Unreachable, day(d), &holidays, 3);
        }
        assert_eq!(counter.flag_as_unreachable_date, Some(day(3)));
        assert!(is_ineffective(&counter, &bucket(3, 30), day(10)));
    }

    #[test]
    fn refresh_window_elapsing_makes_number_dialable_again() {
        let mut counter = IneffectiveCounter::new(1);
        let holidays = BTreeSet::new();
        for d in 1..=3 {
            record_result(&mut counter, ConnectionKind::Unreachable, day(d), &holidays, 3);
        }
        let b = bucket(3, 5);
        assert!(is_ineffective(&counter, &b, day(8)));
        assert!(!is_ineffective(&counter, &b, day(9)));

        assert!(maybe_refresh(&mut counter, day(9), 5));
        assert_eq!(counter.consecutive_days, 0);
        assert_eq!(counter.flag_as_unreachable_date, None);
    }
}
