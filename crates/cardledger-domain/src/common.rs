//! Shared traits, calendar utilities, and money helpers for card bookkeeping.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Number of decimal places carried by currency values.
pub const CURRENCY_SCALE: u32 = 2;

/// Highest day of month accepted for closing and due days.
pub const MAX_BILLING_DAY: u32 = 28;

/// Exposes a stable identifier for stored entities.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Associates an entity with the account owner it belongs to.
pub trait Owned {
    fn owner_id(&self) -> Uuid;
}

/// A day of month restricted to `1..=28` so it exists in every month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DayOfMonth(u32);

impl DayOfMonth {
    pub fn new(day: u32) -> Option<Self> {
        (1..=MAX_BILLING_DAY).contains(&day).then_some(Self(day))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<u32> for DayOfMonth {
    type Error = String;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        DayOfMonth::new(value)
            .ok_or_else(|| format!("day {value} outside 1..={MAX_BILLING_DAY}"))
    }
}

impl From<DayOfMonth> for u32 {
    fn from(day: DayOfMonth) -> Self {
        day.0
    }
}

impl fmt::Display for DayOfMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns `true` when `value` carries no more than two decimal places.
pub fn is_cent_precise(value: Decimal) -> bool {
    value.round_dp(CURRENCY_SCALE) == value
}

/// Advances `date` by `months` calendar months, clamping the day to the
/// last day of the target month (Jan 31 + 1 month = Feb 28/29). `None`
/// when the result leaves chrono's calendar.
pub fn shift_month(date: NaiveDate, months: i32) -> Option<NaiveDate> {
    let index = (date.year() * 12 + date.month0() as i32).checked_add(months)?;
    let year = index.div_euclid(12);
    let month = index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Number of days in the given month, `None` for an out-of-range year.
pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    let last_current = first_next - Duration::days(1);
    Some(last_current.day())
}

/// Last representable second of `date` (23:59:59).
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn shift_month_clamps_to_month_end() {
        assert_eq!(shift_month(date(2024, 1, 31), 1), Some(date(2024, 2, 29)));
        assert_eq!(shift_month(date(2023, 1, 31), 1), Some(date(2023, 2, 28)));
        assert_eq!(shift_month(date(2024, 3, 31), 1), Some(date(2024, 4, 30)));
    }

    #[test]
    fn shift_month_rolls_years_both_ways() {
        assert_eq!(shift_month(date(2024, 11, 15), 3), Some(date(2025, 2, 15)));
        assert_eq!(shift_month(date(2024, 1, 15), -1), Some(date(2023, 12, 15)));
        assert_eq!(shift_month(date(2024, 5, 10), 0), Some(date(2024, 5, 10)));
    }

    #[test]
    fn shift_month_past_the_calendar_is_none() {
        assert_eq!(shift_month(date(2024, 5, 10), i32::MAX), None);
        assert_eq!(shift_month(date(2024, 5, 10), i32::MIN), None);
    }

    #[test]
    fn day_of_month_rejects_days_missing_from_february() {
        assert!(DayOfMonth::new(0).is_none());
        assert!(DayOfMonth::new(29).is_none());
        assert_eq!(DayOfMonth::new(28).map(DayOfMonth::get), Some(28));
    }

    #[test]
    fn day_of_month_deserialization_is_checked() {
        let ok: DayOfMonth = serde_json::from_str("5").unwrap();
        assert_eq!(ok.get(), 5);
        assert!(serde_json::from_str::<DayOfMonth>("31").is_err());
    }

    #[test]
    fn cent_precision() {
        assert!(is_cent_precise(dec!(10.25)));
        assert!(is_cent_precise(dec!(10.250)));
        assert!(!is_cent_precise(dec!(10.255)));
    }
}
