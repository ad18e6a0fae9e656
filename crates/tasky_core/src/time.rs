//! Clock and calendar helpers.
//!
//! # Invariants
//! - `now_ms` never goes backwards within one process, even if the wall clock
//!   is adjusted.
//! - Calendar arithmetic runs in UTC. Month/year steps clamp to the last valid
//!   day of the target month (Jan 31 + 1 month = Feb 28/29).

use crate::model::task::Repeat;
use chrono::{DateTime, Days, Months, Utc};
use std::sync::atomic::{AtomicI64, Ordering};

static LAST_NOW_MS: AtomicI64 = AtomicI64::new(i64::MIN);

/// Current wall-clock time in Unix epoch milliseconds, non-decreasing.
pub fn now_ms() -> i64 {
    let wall = Utc::now().timestamp_millis();
    let previous = LAST_NOW_MS.fetch_max(wall, Ordering::AcqRel);
    previous.max(wall)
}

/// Due date of the occurrence after `due_ms` for a repeat rule.
///
/// Returns `None` for custom rules (no fixed step) or out-of-range dates.
pub fn next_occurrence(due_ms: i64, repeat: Repeat) -> Option<i64> {
    let due = DateTime::<Utc>::from_timestamp_millis(due_ms)?;
    let next = match repeat {
        Repeat::Daily => due.checked_add_days(Days::new(1)),
        Repeat::Weekly => due.checked_add_days(Days::new(7)),
        Repeat::Monthly => due.checked_add_months(Months::new(1)),
        Repeat::Yearly => due.checked_add_months(Months::new(12)),
        Repeat::Custom => None,
    }?;
    Some(next.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::{next_occurrence, now_ms};
    use crate::model::task::Repeat;
    use chrono::{TimeZone, Utc};

    const DAY_MS: i64 = 86_400_000;

    fn utc_ms(year: i32, month: u32, day: u32) -> i64 {
        Utc.with_ymd_and_hms(year, month, day, 9, 30, 0)
            .single()
            .expect("valid date")
            .timestamp_millis()
    }

    #[test]
    fn now_is_non_decreasing() {
        let first = now_ms();
        let second = now_ms();
        assert!(second >= first);
    }

    #[test]
    fn daily_and_weekly_add_whole_days() {
        let due = utc_ms(2025, 3, 8);
        assert_eq!(next_occurrence(due, Repeat::Daily), Some(due + DAY_MS));
        assert_eq!(next_occurrence(due, Repeat::Weekly), Some(due + 7 * DAY_MS));
    }

    #[test]
    fn monthly_and_yearly_step_calendar_units() {
        assert_eq!(
            next_occurrence(utc_ms(2025, 1, 15), Repeat::Monthly),
            Some(utc_ms(2025, 2, 15))
        );
        assert_eq!(
            next_occurrence(utc_ms(2025, 1, 31), Repeat::Monthly),
            Some(utc_ms(2025, 2, 28))
        );
        assert_eq!(
            next_occurrence(utc_ms(2024, 2, 29), Repeat::Yearly),
            Some(utc_ms(2025, 2, 28))
        );
    }

    #[test]
    fn custom_has_no_next_occurrence() {
        assert_eq!(next_occurrence(utc_ms(2025, 1, 1), Repeat::Custom), None);
    }
}
