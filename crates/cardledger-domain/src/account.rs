//! Bank accounts that settle card invoices and hold ledger entries.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::*;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BankAccount {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub initial_balance: Decimal,
    pub kind: BankAccountKind,
}

impl BankAccount {
    pub fn new(owner_id: Uuid, name: impl Into<String>, kind: BankAccountKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner_id,
            name: name.into(),
            initial_balance: Decimal::ZERO,
            kind,
        }
    }
}

impl Identifiable for BankAccount {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Owned for BankAccount {
    fn owner_id(&self) -> Uuid {
        self.owner_id
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BankAccountKind {
    Checking,
    Investment,
    Cash,
}

impl fmt::Display for BankAccountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BankAccountKind::Checking => "Checking",
            BankAccountKind::Investment => "Investment",
            BankAccountKind::Cash => "Cash",
        };
        f.write_str(label)
    }
}
