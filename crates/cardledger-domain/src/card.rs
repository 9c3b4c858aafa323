//! Credit card definitions and their billing calendar.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A credit card whose purchases are grouped into monthly invoices.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Card {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    pub limit: Decimal,
    /// Purchases dated after this day roll into the next invoice.
    pub closing_day: DayOfMonth,
    pub due_day: DayOfMonth,
    /// Bank account that pays the invoice. Without it no invoice charge is booked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settlement_account_id: Option<Uuid>,
}

impl Card {
    pub fn new(
        owner_id: Uuid,
        name: impl Into<String>,
        limit: Decimal,
        closing_day: DayOfMonth,
        due_day: DayOfMonth,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            color: None,
            limit,
            closing_day,
            due_day,
            settlement_account_id: None,
        }
    }

    pub fn with_settlement_account(mut self, account_id: Uuid) -> Self {
        self.settlement_account_id = Some(account_id);
        self
    }

    pub fn settles_invoices(&self) -> bool {
        self.settlement_account_id.is_some()
    }
}

impl Identifiable for Card {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for Card {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Card summary enriched with its outstanding purchases.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CardUsage {
    pub card: Card,
    pub total_spent: Decimal,
    pub available_limit: Decimal,
}

/// Raw card settings supplied on creation; days are checked by the card service.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCard {
    pub name: String,
    pub color: Option<String>,
    pub limit: Decimal,
    pub closing_day: u32,
    pub due_day: u32,
    pub settlement_account_id: Option<Uuid>,
}

/// Partial card changes; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CardUpdate {
    pub name: Option<String>,
    pub color: Option<String>,
    pub limit: Option<Decimal>,
    pub closing_day: Option<u32>,
    pub due_day: Option<u32>,
    /// `Some(None)` detaches the settlement account.
    pub settlement_account_id: Option<Option<Uuid>>,
}
