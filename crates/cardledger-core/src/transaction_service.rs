//! Generic ledger entries on bank accounts.
//!
//! Entries booked for card invoices live in the same table but belong to the
//! invoice reconciler; this path refuses to edit or delete them.

use cardledger_domain::{is_cent_precise, Transaction, TransactionKind, TransactionDraft};
use chrono::Datelike;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    ownership::{BankAccountOwnership, CategoryOwnership, OwnershipGuard, TransactionOwnership},
    storage::{BankAccountStore, CategoryStore, TransactionStore},
    CoreError, ResourceKind,
};

pub struct TransactionService<'a> {
    accounts: &'a dyn BankAccountStore,
    categories: &'a dyn CategoryStore,
    transactions: &'a dyn TransactionStore,
}

impl<'a> TransactionService<'a> {
    pub fn new<S>(store: &'a S) -> Self
    where
        S: BankAccountStore + CategoryStore + TransactionStore,
    {
        Self {
            accounts: store,
            categories: store,
            transactions: store,
        }
    }

    pub fn create(
        &self,
        owner_id: Uuid,
        draft: TransactionDraft,
    ) -> Result<Transaction, CoreError> {
        let draft = self.validate_draft(owner_id, draft)?;
        let mut transaction = Transaction::new(
            owner_id,
            draft.bank_account_id,
            draft.name,
            draft.value,
            draft.date,
            draft.kind,
        );
        transaction.destination_account_id = draft.destination_account_id;
        transaction.category_id = draft.category_id;
        self.transactions.insert_transaction(transaction)
    }

    pub fn update(
        &self,
        owner_id: Uuid,
        transaction_id: Uuid,
        draft: TransactionDraft,
    ) -> Result<Transaction, CoreError> {
        TransactionOwnership(self.transactions).validate(owner_id, transaction_id)?;
        let mut transaction = self.editable(owner_id, transaction_id)?;
        let draft = self.validate_draft(owner_id, draft)?;

        transaction.bank_account_id = draft.bank_account_id;
        transaction.destination_account_id = draft.destination_account_id;
        transaction.category_id = draft.category_id;
        transaction.name = draft.name;
        transaction.value = draft.value;
        transaction.date = draft.date;
        transaction.kind = draft.kind;
        self.transactions.update_transaction(transaction)
    }

    pub fn remove(&self, owner_id: Uuid, transaction_id: Uuid) -> Result<(), CoreError> {
        TransactionOwnership(self.transactions).validate(owner_id, transaction_id)?;
        self.editable(owner_id, transaction_id)?;
        self.transactions.delete_transaction(owner_id, transaction_id)?;
        Ok(())
    }

    /// Entries of one calendar month, newest first, optionally for one account
    /// (as source or transfer destination).
    pub fn list_for_month(
        &self,
        owner_id: Uuid,
        month: u32,
        year: i32,
        account_id: Option<Uuid>,
    ) -> Result<Vec<Transaction>, CoreError> {
        let mut rows: Vec<Transaction> = self
            .transactions
            .list_transactions(owner_id)?
            .into_iter()
            .filter(|txn| txn.date.month() == month && txn.date.year() == year)
            .filter(|txn| match account_id {
                Some(id) => txn.bank_account_id == id || txn.destination_account_id == Some(id),
                None => true,
            })
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(rows)
    }

    fn editable(&self, owner_id: Uuid, transaction_id: Uuid) -> Result<Transaction, CoreError> {
        let transaction = self
            .transactions
            .find_transaction(owner_id, transaction_id)?
            .ok_or_else(|| CoreError::not_found(ResourceKind::Transaction, transaction_id))?;
        if transaction.is_invoice_charge() {
            return Err(CoreError::InvalidOperation(
                "invoice entries are generated automatically and cannot be edited or deleted"
                    .into(),
            ));
        }
        Ok(transaction)
    }

    fn validate_draft(
        &self,
        owner_id: Uuid,
        mut draft: TransactionDraft,
    ) -> Result<TransactionDraft, CoreError> {
        if draft.name.trim().is_empty() {
            return Err(CoreError::Validation("transaction name is required".into()));
        }
        if draft.value <= Decimal::ZERO || !is_cent_precise(draft.value) {
            return Err(CoreError::Validation(format!(
                "transaction value must be a positive amount in cents, got {}",
                draft.value
            )));
        }

        let accounts = BankAccountOwnership(self.accounts);
        accounts.validate(owner_id, draft.bank_account_id)?;
        if draft.kind == TransactionKind::Transfer {
            let destination = draft.destination_account_id.ok_or_else(|| {
                CoreError::Validation("transfers need a destination account".into())
            })?;
            if destination == draft.bank_account_id {
                return Err(CoreError::Validation(
                    "transfer source and destination must differ".into(),
                ));
            }
            accounts.validate(owner_id, destination)?;
            draft.category_id = None;
        } else {
            CategoryOwnership(self.categories).validate_optional(owner_id, draft.category_id)?;
            draft.destination_account_id = None;
        }
        Ok(draft)
    }
}
