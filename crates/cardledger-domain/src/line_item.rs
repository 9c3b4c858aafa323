//! Credit card purchase installments.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

/// A single credit card charge: either a whole purchase or one installment of it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub card_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub name: String,
    pub value: Decimal,
    pub date: NaiveDate,
    pub installment: Installment,
    /// Shared by every installment of one purchase; absent for single payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<Uuid>,
}

impl Identifiable for LineItem {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for LineItem {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

/// Position of a line item inside its purchase, `index` of `count`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Installment {
    pub index: u32,
    pub count: u32,
}

impl Installment {
    pub const SINGLE: Installment = Installment { index: 1, count: 1 };

    pub fn is_last(self) -> bool {
        self.index == self.count
    }
}

/// Partial changes applied to a stored line item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemUpdate {
    pub name: Option<String>,
    pub value: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

impl LineItemUpdate {
    pub fn apply(&self, item: &mut LineItem) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(value) = self.value {
            item.value = value;
        }
        if let Some(date) = self.date {
            item.date = date;
        }
        if let Some(category_id) = self.category_id {
            item.category_id = Some(category_id);
        }
    }
}

/// A card purchase as entered by the user, before it is split into installments.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCardPurchase {
    pub card_id: Uuid,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub total: Decimal,
    pub date: NaiveDate,
    pub installments: u32,
}

impl NewCardPurchase {
    pub fn new(card_id: Uuid, name: impl Into<String>, total: Decimal, date: NaiveDate) -> Self {
        Self {
            card_id,
            category_id: None,
            name: name.into(),
            total,
            date,
            installments: 1,
        }
    }

    pub fn in_installments(mut self, installments: u32) -> Self {
        self.installments = installments;
        self
    }

    pub fn with_category(mut self, category_id: Uuid) -> Self {
        self.category_id = Some(category_id);
        self
    }
}
