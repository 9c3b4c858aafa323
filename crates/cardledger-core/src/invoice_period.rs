//! Maps purchase dates onto card billing cycles.

use cardledger_domain::{end_of_day, BillingCycle, CycleRange, DayOfMonth};
use chrono::{Datelike, NaiveDate};

use crate::CoreError;

pub struct InvoicePeriodResolver;

impl InvoicePeriodResolver {
    /// Cycle a purchase on `date` is billed in. Purchases after the closing
    /// day belong to the next month's invoice.
    pub fn resolve_period(date: NaiveDate, closing_day: DayOfMonth) -> BillingCycle {
        let cycle = BillingCycle {
            year: date.year(),
            month: date.month(),
        };
        if date.day() > closing_day.get() {
            cycle.next()
        } else {
            cycle
        }
    }

    /// `(previous closing, closing]`, both at the end of the closing day.
    pub fn cycle_range(
        cycle: BillingCycle,
        closing_day: DayOfMonth,
    ) -> Result<CycleRange, CoreError> {
        let closing = Self::closing_date(cycle, closing_day)?;
        let previous_closing = Self::closing_date(cycle.previous(), closing_day)?;
        Ok(CycleRange {
            previous_closing: end_of_day(previous_closing),
            closing: end_of_day(closing),
        })
    }

    pub fn closing_date(
        cycle: BillingCycle,
        closing_day: DayOfMonth,
    ) -> Result<NaiveDate, CoreError> {
        cycle
            .day(closing_day.get())
            .ok_or_else(|| out_of_calendar(cycle))
    }

    pub fn due_date(cycle: BillingCycle, due_day: DayOfMonth) -> Result<NaiveDate, CoreError> {
        cycle.day(due_day.get()).ok_or_else(|| out_of_calendar(cycle))
    }
}

fn out_of_calendar(cycle: BillingCycle) -> CoreError {
    CoreError::Validation(format!("billing cycle {cycle} is outside the supported calendar"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn day(d: u32) -> DayOfMonth {
        DayOfMonth::new(d).unwrap()
    }

    fn cycle(month: u32, year: i32) -> BillingCycle {
        BillingCycle::new(month, year).unwrap()
    }

    #[test]
    fn closing_day_itself_stays_in_current_cycle() {
        assert_eq!(
            InvoicePeriodResolver::resolve_period(date(2024, 3, 5), day(5)),
            cycle(3, 2024)
        );
        assert_eq!(
            InvoicePeriodResolver::resolve_period(date(2024, 3, 1), day(5)),
            cycle(3, 2024)
        );
    }

    #[test]
    fn day_after_closing_rolls_to_next_cycle() {
        assert_eq!(
            InvoicePeriodResolver::resolve_period(date(2024, 3, 6), day(5)),
            cycle(4, 2024)
        );
    }

    #[test]
    fn december_purchase_after_closing_rolls_into_january() {
        assert_eq!(
            InvoicePeriodResolver::resolve_period(date(2024, 12, 6), day(5)),
            cycle(1, 2025)
        );
    }

    #[test]
    fn range_spans_previous_closing_to_closing() {
        let range = InvoicePeriodResolver::cycle_range(cycle(1, 2024), day(5)).unwrap();
        assert_eq!(range.previous_closing, end_of_day(date(2023, 12, 5)));
        assert_eq!(range.closing, end_of_day(date(2024, 1, 5)));
    }

    #[test]
    fn every_date_lands_in_exactly_the_range_of_its_cycle() {
        let closing = day(5);
        let mut current = date(2023, 11, 1);
        while current <= date(2025, 2, 28) {
            let owner = InvoicePeriodResolver::resolve_period(current, closing);
            for candidate in [owner.previous(), owner, owner.next()] {
                let range = InvoicePeriodResolver::cycle_range(candidate, closing).unwrap();
                assert_eq!(range.contains(current), candidate == owner, "{current} in {candidate}");
            }
            current = current.succ_opt().unwrap();
        }
    }

    #[test]
    fn due_date_uses_cycle_month() {
        assert_eq!(
            InvoicePeriodResolver::due_date(cycle(2, 2024), day(15)).unwrap(),
            date(2024, 2, 15)
        );
    }
}
