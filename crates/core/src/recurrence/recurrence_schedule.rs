//! Firing-date arithmetic for recurrence rules.
//!
//! A rule fires on `start_date` and then once per period. Monthly and yearly
//! periods are added to the previous firing, not to `start_date`, so a rule
//! that gets clamped to a short month keeps the clamped day from then on:
//! `2024-01-31 -> 2024-02-29 -> 2024-03-29 -> 2024-04-29`.

use chrono::NaiveDate;

use super::recurrence_model::{Frequency, RecurrenceRule, Terminator};
use crate::utils::time_utils::{add_days, add_months, add_weeks, add_years, months_between};

/// One period after `date`.
pub fn step(frequency: Frequency, date: NaiveDate) -> Option<NaiveDate> {
    match frequency {
        Frequency::Daily => add_days(date, 1),
        Frequency::Weekly => add_weeks(date, 1),
        Frequency::Monthly => add_months(date, 1),
        Frequency::Yearly => add_years(date, 1),
    }
}

/// First date of the firing sequence that is on or after `as_of`.
///
/// Daily and weekly periods have a fixed length and are computed directly.
/// Calendar periods walk forward from `start_date`; the walk is bounded by the
/// number of months between the two dates.
pub fn first_firing_on_or_after(
    frequency: Frequency,
    start_date: NaiveDate,
    as_of: NaiveDate,
) -> Option<NaiveDate> {
    if start_date >= as_of {
        return Some(start_date);
    }
    let elapsed_days = (as_of - start_date).num_days() as u64;
    match frequency {
        Frequency::Daily => add_days(start_date, elapsed_days),
        Frequency::Weekly => add_weeks(start_date, elapsed_days.div_ceil(7)),
        Frequency::Monthly | Frequency::Yearly => {
            // A sticky walk can never need more steps than elapsed months + 1.
            let max_steps = months_between(start_date, as_of).max(0) + 1;
            let mut current = start_date;
            for _ in 0..max_steps {
                if current >= as_of {
                    break;
                }
                current = step(frequency, current)?;
            }
            Some(current)
        }
    }
}

/// Next date on which `rule` is due, or `None` once the rule has terminated.
///
/// `occurrences` must be the actual number of transactions already
/// materialized for the rule. A rule whose start date is `as_of` is due on
/// `as_of`.
pub fn next_firing_date(
    rule: &RecurrenceRule,
    occurrences: u64,
    as_of: NaiveDate,
) -> Option<NaiveDate> {
    if let Terminator::OccurrenceCap(cap) = rule.terminator {
        if occurrences >= u64::from(cap) {
            return None;
        }
    }

    let candidate = first_firing_on_or_after(rule.frequency, rule.start_date, as_of)?;

    match rule.terminator {
        Terminator::EndDate(end) if candidate > end => None,
        _ => Some(candidate),
    }
}
