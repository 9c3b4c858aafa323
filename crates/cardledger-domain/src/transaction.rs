//! Bank ledger entries, including the ones booked for card invoices.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;
use crate::invoice::{InvoiceCharge, InvoiceKey};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub bank_account_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<Uuid>,
    pub name: String,
    pub value: Decimal,
    pub date: NaiveDate,
    pub kind: TransactionKind,
    /// Set only on entries generated for a card invoice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceKey>,
}

impl Transaction {
    pub fn new(
        owner_id: Uuid,
        bank_account_id: Uuid,
        name: impl Into<String>,
        value: Decimal,
        date: NaiveDate,
        kind: TransactionKind,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            bank_account_id,
            destination_account_id: None,
            category_id: None,
            name: name.into(),
            value,
            date,
            kind,
            invoice: None,
        }
    }

    /// Returns `true` for entries owned by the invoice reconciliation lifecycle.
    pub fn is_invoice_charge(&self) -> bool {
        self.invoice.is_some()
    }

    /// Reinterprets an invoice-backed entry as its charge.
    pub fn as_invoice_charge(&self) -> Option<InvoiceCharge> {
        let key = self.invoice?;
        Some(InvoiceCharge {
            id: self.id,
            owner_id: self.owner_id,
            settlement_account_id: self.bank_account_id,
            key,
            name: self.name.clone(),
            value: self.value,
            due_date: self.date,
        })
    }
}

impl From<InvoiceCharge> for Transaction {
    fn from(charge: InvoiceCharge) -> Self {
        Self {
            id: charge.id,
            owner_id: charge.owner_id,
            bank_account_id: charge.settlement_account_id,
            destination_account_id: None,
            category_id: None,
            name: charge.name,
            value: charge.value,
            date: charge.due_date,
            kind: TransactionKind::Expense,
            invoice: Some(charge.key),
        }
    }
}

impl Identifiable for Transaction {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for Transaction {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Direction of money movement for a ledger entry.
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
            TransactionKind::Transfer => "Transfer",
        };
        f.write_str(label)
    }
}

/// Values for creating or replacing a generic ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionDraft {
    pub bank_account_id: Uuid,
    pub destination_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: String,
    pub value: Decimal,
    pub date: NaiveDate,
    pub kind: TransactionKind,
}
