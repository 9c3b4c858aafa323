//! Billing cycles and the per-cycle invoice charge derived from line items.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;
use crate::line_item::LineItem;

/// Default label prefix for booked invoice charges.
pub const DEFAULT_INVOICE_LABEL: &str = "Invoice";

/// One statement period of a card, identified by the month its invoice closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BillingCycle {
    pub year: i32,
    pub month: u32,
}

impl BillingCycle {
    pub fn new(month: u32, year: i32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn next(self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }

    pub fn previous(self) -> Self {
        if self.month == 1 {
            Self {
                year: self.year - 1,
                month: 12,
            }
        } else {
            Self {
                year: self.year,
                month: self.month - 1,
            }
        }
    }

    /// Calendar date inside this cycle's month, `None` when the day does not exist.
    pub fn day(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }
}

impl fmt::Display for BillingCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{}", self.month, self.year)
    }
}

/// Half-open span `(previous_closing, closing]` of one billing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleRange {
    pub previous_closing: NaiveDateTime,
    pub closing: NaiveDateTime,
}

impl CycleRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        let instant = date.and_time(chrono::NaiveTime::MIN);
        instant > self.previous_closing && instant <= self.closing
    }
}

/// Composite identity of an invoice charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InvoiceKey {
    pub card_id: Uuid,
    pub cycle: BillingCycle,
}

impl InvoiceKey {
    pub fn new(card_id: Uuid, cycle: BillingCycle) -> Self {
        Self { card_id, cycle }
    }
}

/// Ledger entry booking the total of one card cycle against its settlement account.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceCharge {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub settlement_account_id: Uuid,
    pub key: InvoiceKey,
    pub name: String,
    pub value: Decimal,
    pub due_date: NaiveDate,
}

impl InvoiceCharge {
    /// Formats the charge label, e.g. `Invoice Gold - 02/2024`.
    pub fn label(prefix: &str, card_name: &str, cycle: BillingCycle) -> String {
        format!("{prefix} {card_name} - {cycle}")
    }

    pub fn card_id(&self) -> Uuid {
        self.key.card_id
    }

    pub fn cycle(&self) -> BillingCycle {
        self.key.cycle
    }
}

impl Identifiable for InvoiceCharge {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for InvoiceCharge {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Live view of one card cycle, computed from its line items.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceStatement {
    pub card_id: Uuid,
    pub cycle: BillingCycle,
    pub closing_date: NaiveDate,
    pub due_date: NaiveDate,
    pub items: Vec<LineItem>,
    pub total: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::end_of_day;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn cycle_navigation_rolls_over_year_boundaries() {
        let december = BillingCycle::new(12, 2024).unwrap();
        assert_eq!(december.next(), BillingCycle::new(1, 2025).unwrap());
        assert_eq!(december.next().previous(), december);
        assert!(BillingCycle::new(13, 2024).is_none());
    }

    #[test]
    fn cycle_display_zero_pads_month() {
        let cycle = BillingCycle::new(3, 2024).unwrap();
        assert_eq!(cycle.to_string(), "03/2024");
        assert_eq!(
            InvoiceCharge::label(DEFAULT_INVOICE_LABEL, "Gold", cycle),
            "Invoice Gold - 03/2024"
        );
    }

    #[test]
    fn cycles_order_chronologically() {
        let dec = BillingCycle::new(12, 2023).unwrap();
        let jan = BillingCycle::new(1, 2024).unwrap();
        assert!(dec < jan);
    }

    #[test]
    fn range_excludes_previous_closing_day() {
        let range = CycleRange {
            previous_closing: end_of_day(date(2024, 1, 5)),
            closing: end_of_day(date(2024, 2, 5)),
        };
        assert!(!range.contains(date(2024, 1, 5)));
        assert!(range.contains(date(2024, 1, 6)));
        assert!(range.contains(date(2024, 2, 5)));
        assert!(!range.contains(date(2024, 2, 6)));
    }
}
