//! Calendar arithmetic shared by the recurrence rules and the budget ledger.
//!
//! All functions are pure. Month and year steps clamp to the last valid day
//! of a shorter target month instead of overflowing into the next month.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, Utc};
use chrono_tz::Tz;

/// Converts a UTC instant to the calendar date observed in `tz`.
///
/// This is the single source of truth for deriving "today" from a timestamp.
pub fn local_date_from_utc(instant: DateTime<Utc>, tz: Tz) -> NaiveDate {
    instant.with_timezone(&tz).date_naive()
}

/// The current calendar date in `tz`.
pub fn today_in(tz: Tz) -> NaiveDate {
    local_date_from_utc(Utc::now(), tz)
}

/// Number of days in the given month, accounting for leap years.
pub fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first_of_next| first_of_next.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}

pub fn add_days(date: NaiveDate, days: u64) -> Option<NaiveDate> {
    date.checked_add_days(Days::new(days))
}

pub fn add_weeks(date: NaiveDate, weeks: u64) -> Option<NaiveDate> {
    weeks
        .checked_mul(7)
        .and_then(|days| date.checked_add_days(Days::new(days)))
}

/// Adds calendar months, clamping the day to the end of a shorter month.
///
/// `2024-01-31 + 1 month` is `2024-02-29`, not `2024-03-02`.
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

/// Adds calendar years. `Feb 29` lands on `Feb 28` in a non-leap target year.
pub fn add_years(date: NaiveDate, years: u32) -> Option<NaiveDate> {
    years
        .checked_mul(12)
        .and_then(|months| date.checked_add_months(Months::new(months)))
}

/// Whole months between the year-month of `from` and the year-month of `to`.
/// Negative when `to` is in an earlier month.
pub fn months_between(from: NaiveDate, to: NaiveDate) -> i64 {
    let from_idx = i64::from(from.year()) * 12 + i64::from(from.month0());
    let to_idx = i64::from(to.year()) * 12 + i64::from(to.month0());
    to_idx - from_idx
}

/// Every date from `start` to `end`, both inclusive. Empty when `start > end`.
pub fn get_days_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    if start > end {
        return Vec::new();
    }
    let mut days = Vec::new();
    let mut current = start;
    while current <= end {
        days.push(current);
        if let Some(next) = current.succ_opt() {
            current = next;
        } else {
            break;
        }
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2023, 2), 28);
        assert_eq!(days_in_month(2024, 4), 30);
        assert_eq!(days_in_month(2024, 12), 31);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
    }

    #[test]
    fn test_add_months_clamps_to_month_end() {
        assert_eq!(add_months(d(2024, 1, 31), 1), Some(d(2024, 2, 29)));
        assert_eq!(add_months(d(2023, 1, 31), 1), Some(d(2023, 2, 28)));
        assert_eq!(add_months(d(2024, 3, 31), 1), Some(d(2024, 4, 30)));
        assert_eq!(add_months(d(2024, 11, 15), 3), Some(d(2025, 2, 15)));
    }

    #[test]
    fn test_add_years_clamps_leap_day() {
        assert_eq!(add_years(d(2024, 2, 29), 1), Some(d(2025, 2, 28)));
        assert_eq!(add_years(d(2024, 2, 29), 4), Some(d(2028, 2, 29)));
        assert_eq!(add_years(d(2024, 6, 10), 1), Some(d(2025, 6, 10)));
    }

    #[test]
    fn test_add_days_and_weeks() {
        assert_eq!(add_days(d(2024, 12, 31), 1), Some(d(2025, 1, 1)));
        assert_eq!(add_weeks(d(2024, 1, 1), 2), Some(d(2024, 1, 15)));
    }

    #[test]
    fn test_months_between() {
        assert_eq!(months_between(d(2024, 1, 31), d(2024, 3, 1)), 2);
        assert_eq!(months_between(d(2024, 11, 1), d(2025, 2, 28)), 3);
        assert_eq!(months_between(d(2024, 5, 1), d(2024, 4, 30)), -1);
    }

    #[test]
    fn test_get_days_between() {
        let days = get_days_between(d(2024, 2, 27), d(2024, 3, 1));
        assert_eq!(
            days,
            vec![d(2024, 2, 27), d(2024, 2, 28), d(2024, 2, 29), d(2024, 3, 1)]
        );
        assert!(get_days_between(d(2024, 3, 2), d(2024, 3, 1)).is_empty());
    }

    #[test]
    fn test_local_date_from_utc_crosses_midnight() {
        let instant = DateTime::parse_from_rfc3339("2024-03-01T02:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(
            local_date_from_utc(instant, chrono_tz::America::New_York),
            d(2024, 2, 29)
        );
        assert_eq!(local_date_from_utc(instant, chrono_tz::UTC), d(2024, 3, 1));
    }
}
