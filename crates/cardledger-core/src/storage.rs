//! Narrow persistence contracts consumed by the services.
//!
//! Every lookup is scoped by owner: a record belonging to someone else is
//! reported exactly like a missing one.

use cardledger_domain::{
    BankAccount, Card, Category, CycleRange, InvoiceCharge, InvoiceKey, LineItem, Transaction,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::CoreError;

/// What a cycle recompute did to the charge row.
#[derive(Debug, Clone, PartialEq)]
pub enum ChargeWrite {
    Upserted(InvoiceCharge),
    Deleted { removed: bool },
}

pub trait CardStore: Send + Sync {
    fn find_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<Option<Card>, CoreError>;
    fn list_cards(&self, owner_id: Uuid) -> Result<Vec<Card>, CoreError>;
    fn insert_card(&self, card: Card) -> Result<Card, CoreError>;
    fn update_card(&self, card: Card) -> Result<Card, CoreError>;
    /// Removes the card together with its line items and invoice charges.
    fn delete_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<bool, CoreError>;
}

pub trait LineItemStore: Send + Sync {
    fn create_item(&self, item: LineItem) -> Result<LineItem, CoreError>;
    /// Inserts all installments of one purchase as a single write.
    fn create_items(&self, items: Vec<LineItem>) -> Result<usize, CoreError>;
    fn find_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<Option<LineItem>, CoreError>;
    fn find_items_in_range(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        range: &CycleRange,
    ) -> Result<Vec<LineItem>, CoreError>;
    fn find_items_by_group(&self, owner_id: Uuid, group_id: Uuid)
        -> Result<Vec<LineItem>, CoreError>;
    fn list_items_by_card(&self, owner_id: Uuid, card_id: Uuid)
        -> Result<Vec<LineItem>, CoreError>;
    fn update_item(&self, item: LineItem) -> Result<LineItem, CoreError>;
    fn delete_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<bool, CoreError>;
    fn delete_items_by_group(&self, owner_id: Uuid, group_id: Uuid) -> Result<usize, CoreError>;
}

pub trait InvoiceChargeStore: Send + Sync {
    /// Inserts the charge, or refreshes name, value and due date of the row
    /// already holding `charge.key`. Find-and-write must be atomic per key.
    fn upsert_charge(&self, charge: InvoiceCharge) -> Result<InvoiceCharge, CoreError>;
    fn delete_charge(&self, key: &InvoiceKey) -> Result<bool, CoreError>;
    /// Sums the owner's line items of `key.card_id` inside `range` and, in
    /// the same critical section, upserts `build(total)` or deletes the row
    /// when the total is zero. No item write may land between the two.
    fn recompute_charge(
        &self,
        owner_id: Uuid,
        key: &InvoiceKey,
        range: &CycleRange,
        build: &dyn Fn(Decimal) -> InvoiceCharge,
    ) -> Result<ChargeWrite, CoreError>;
    fn find_charge(&self, key: &InvoiceKey) -> Result<Option<InvoiceCharge>, CoreError>;
    fn list_charges(&self, owner_id: Uuid, card_id: Uuid) -> Result<Vec<InvoiceCharge>, CoreError>;
}

pub trait BankAccountStore: Send + Sync {
    fn find_account(&self, owner_id: Uuid, account_id: Uuid)
        -> Result<Option<BankAccount>, CoreError>;
    fn insert_account(&self, account: BankAccount) -> Result<BankAccount, CoreError>;
    fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<BankAccount>, CoreError>;
}

pub trait CategoryStore: Send + Sync {
    fn find_category(&self, owner_id: Uuid, category_id: Uuid)
        -> Result<Option<Category>, CoreError>;
    fn insert_category(&self, category: Category) -> Result<Category, CoreError>;
}

pub trait TransactionStore: Send + Sync {
    fn find_transaction(&self, owner_id: Uuid, id: Uuid)
        -> Result<Option<Transaction>, CoreError>;
    fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction, CoreError>;
    fn update_transaction(&self, transaction: Transaction) -> Result<Transaction, CoreError>;
    fn delete_transaction(&self, owner_id: Uuid, id: Uuid) -> Result<bool, CoreError>;
    fn list_transactions(&self, owner_id: Uuid) -> Result<Vec<Transaction>, CoreError>;
}
