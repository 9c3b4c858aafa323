//! Splits a card purchase into dated installment line items.

use cardledger_domain::{
    is_cent_precise, shift_month, Installment, LineItem, NewCardPurchase, CURRENCY_SCALE,
};
use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use uuid::Uuid;

use crate::CoreError;

/// Pure planner: a purchase in, its installments out. Nothing is persisted here.
pub struct InstallmentPlanner;

impl InstallmentPlanner {
    /// Produces one line item per installment.
    ///
    /// Every installment but the last carries the total divided by the count,
    /// truncated to cents; the last one absorbs the remainder so the values
    /// add up to `purchase.total` exactly. Installment `i` is dated `i - 1`
    /// months after the purchase, clamped to the end of shorter months.
    pub fn plan(owner_id: Uuid, purchase: &NewCardPurchase) -> Result<Vec<LineItem>, CoreError> {
        Self::validate(purchase)?;

        let count = purchase.installments;
        if count == 1 {
            return Ok(vec![LineItem {
                id: Uuid::new_v4(),
                owner_id,
                card_id: purchase.card_id,
                category_id: purchase.category_id,
                name: purchase.name.clone(),
                value: purchase.total,
                date: purchase.date,
                installment: Installment::SINGLE,
                group_id: None,
            }]);
        }

        let (base, last) = Self::split(purchase.total, count);
        let group_id = Uuid::new_v4();
        let mut items = Vec::new();
        for index in 1..=count {
            let date = Self::installment_date(purchase, index)?;
            let installment = Installment { index, count };
            items.push(LineItem {
                id: Uuid::new_v4(),
                owner_id,
                card_id: purchase.card_id,
                category_id: purchase.category_id,
                name: format!("{} ({index}/{count})", purchase.name),
                value: if installment.is_last() { last } else { base },
                date,
                installment,
                group_id: Some(group_id),
            });
        }

        Self::verify_total(&items, purchase.total)?;
        tracing::debug!(
            group = %group_id,
            count,
            base = %base,
            last = %last,
            "planned installments"
        );
        Ok(items)
    }

    /// Returns `(base, last)` installment values for `count > 1`.
    pub fn split(total: Decimal, count: u32) -> (Decimal, Decimal) {
        let hundred = Decimal::ONE_HUNDRED;
        let base = (total / Decimal::from(count) * hundred).floor() / hundred;
        let remainder = total - base * Decimal::from(count - 1);
        let last = remainder
            .round_dp_with_strategy(CURRENCY_SCALE, RoundingStrategy::MidpointAwayFromZero);
        (base, last)
    }

    fn validate(purchase: &NewCardPurchase) -> Result<(), CoreError> {
        if purchase.name.trim().is_empty() {
            return Err(CoreError::Validation("purchase name is required".into()));
        }
        if purchase.total <= Decimal::ZERO {
            return Err(CoreError::Validation(format!(
                "purchase total must be positive, got {}",
                purchase.total
            )));
        }
        if !is_cent_precise(purchase.total) {
            return Err(CoreError::Validation(format!(
                "purchase total {} has more than two decimal places",
                purchase.total
            )));
        }
        if purchase.installments == 0 {
            return Err(CoreError::Validation(
                "installment count must be at least 1".into(),
            ));
        }
        Self::installment_date(purchase, purchase.installments)?;
        Ok(())
    }

    /// Date of installment `index`, `index - 1` months after the purchase.
    fn installment_date(purchase: &NewCardPurchase, index: u32) -> Result<NaiveDate, CoreError> {
        i32::try_from(index - 1)
            .ok()
            .and_then(|offset| shift_month(purchase.date, offset))
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "installment {index} of {} falls outside the supported calendar",
                    purchase.installments
                ))
            })
    }

    fn verify_total(items: &[LineItem], total: Decimal) -> Result<(), CoreError> {
        let sum: Decimal = items.iter().map(|item| item.value).sum();
        if sum != total {
            return Err(CoreError::InvariantViolation(format!(
                "installments sum to {sum}, purchase total is {total}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn purchase(total: Decimal, date: NaiveDate, installments: u32) -> NewCardPurchase {
        NewCardPurchase::new(Uuid::new_v4(), "Laptop", total, date).in_installments(installments)
    }

    #[test]
    fn single_payment_keeps_name_and_has_no_group() {
        let items = InstallmentPlanner::plan(
            Uuid::new_v4(),
            &purchase(dec!(59.90), date(2024, 3, 2), 1),
        )
        .unwrap();

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.name, "Laptop");
        assert_eq!(item.value, dec!(59.90));
        assert_eq!(item.installment, Installment::SINGLE);
        assert!(item.group_id.is_none());
    }

    #[test]
    fn last_installment_absorbs_remainder() {
        let items = InstallmentPlanner::plan(
            Uuid::new_v4(),
            &purchase(dec!(100.00), date(2024, 1, 10), 3),
        )
        .unwrap();

        let values: Vec<Decimal> = items.iter().map(|i| i.value).collect();
        assert_eq!(values, vec![dec!(33.33), dec!(33.33), dec!(33.34)]);
        let dates: Vec<NaiveDate> = items.iter().map(|i| i.date).collect();
        assert_eq!(
            dates,
            vec![date(2024, 1, 10), date(2024, 2, 10), date(2024, 3, 10)]
        );
        let names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Laptop (1/3)", "Laptop (2/3)", "Laptop (3/3)"]);
    }

    #[test]
    fn installments_share_one_group_and_cover_every_index() {
        let items = InstallmentPlanner::plan(
            Uuid::new_v4(),
            &purchase(dec!(250.00), date(2024, 6, 1), 4),
        )
        .unwrap();

        let group = items[0].group_id.expect("group id");
        assert!(items.iter().all(|i| i.group_id == Some(group)));
        let indexes: Vec<u32> = items.iter().map(|i| i.installment.index).collect();
        assert_eq!(indexes, vec![1, 2, 3, 4]);
        assert!(items.iter().all(|i| i.installment.count == 4));
    }

    #[test]
    fn month_end_purchase_clamps_into_leap_february() {
        let items = InstallmentPlanner::plan(
            Uuid::new_v4(),
            &purchase(dec!(10.00), date(2024, 1, 31), 2),
        )
        .unwrap();

        assert_eq!(items[1].date, date(2024, 2, 29));
    }

    #[test]
    fn clamping_does_not_drift_the_later_installments() {
        let items = InstallmentPlanner::plan(
            Uuid::new_v4(),
            &purchase(dec!(40.00), date(2023, 1, 31), 4),
        )
        .unwrap();

        let dates: Vec<NaiveDate> = items.iter().map(|i| i.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2023, 1, 31),
                date(2023, 2, 28),
                date(2023, 3, 31),
                date(2023, 4, 30)
            ]
        );
    }

    #[test]
    fn sums_are_exact_across_many_totals_and_counts() {
        let owner = Uuid::new_v4();
        for cents in [1_i64, 7, 99, 100, 1001, 3333, 9999, 123_457, 1_000_000] {
            let total = Decimal::new(cents, 2);
            for count in 1..=24 {
                let items =
                    InstallmentPlanner::plan(owner, &purchase(total, date(2024, 1, 31), count))
                        .unwrap();
                assert_eq!(items.len(), count as usize);
                let sum: Decimal = items.iter().map(|i| i.value).sum();
                assert_eq!(sum, total, "total {total} in {count}");
                assert!(items.windows(2).all(|w| w[0].date <= w[1].date));
            }
        }
    }

    #[test]
    fn counts_running_past_the_calendar_are_rejected_up_front() {
        let owner = Uuid::new_v4();
        for count in [u32::MAX, i32::MAX as u32 + 1, i32::MAX as u32, 5_000_000] {
            let purchase = purchase(dec!(10.00), date(2024, 1, 1), count);
            let err = InstallmentPlanner::plan(owner, &purchase).expect_err("must reject");
            assert!(matches!(err, CoreError::Validation(_)), "count {count}: {err:?}");
        }
    }

    #[test]
    fn rejects_invalid_purchases() {
        let owner = Uuid::new_v4();
        let day = date(2024, 1, 1);
        for bad in [
            purchase(dec!(0), day, 1),
            purchase(dec!(-5.00), day, 1),
            purchase(dec!(1.005), day, 2),
            purchase(dec!(10.00), day, 0),
        ] {
            let err = InstallmentPlanner::plan(owner, &bad).expect_err("must reject");
            assert!(matches!(err, CoreError::Validation(_)), "unexpected: {err:?}");
        }

        let mut unnamed = purchase(dec!(10.00), day, 1);
        unnamed.name = "  ".into();
        assert!(matches!(
            InstallmentPlanner::plan(owner, &unnamed),
            Err(CoreError::Validation(_))
        ));
    }
}
