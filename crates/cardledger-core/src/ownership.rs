//! Ownership checks shared by every mutating operation.
//!
//! Each guard answers one question for one entity kind: does `resource_id`
//! exist and belong to `owner_id`? Services compose them with explicit calls.

use cardledger_domain::{Identifiable, Owned};
use uuid::Uuid;

use crate::{
    storage::{BankAccountStore, CardStore, CategoryStore, TransactionStore},
    CoreError, ResourceKind,
};

pub trait OwnershipGuard {
    fn validate(&self, owner_id: Uuid, resource_id: Uuid) -> Result<(), CoreError>;

    /// Validates an optional reference, accepting `None`.
    fn validate_optional(
        &self,
        owner_id: Uuid,
        resource_id: Option<Uuid>,
    ) -> Result<(), CoreError> {
        match resource_id {
            Some(id) => self.validate(owner_id, id),
            None => Ok(()),
        }
    }
}

/// A record counts only when both its id and its owner match the request.
fn found<T: Identifiable + Owned>(
    record: Option<T>,
    owner_id: Uuid,
    kind: ResourceKind,
    id: Uuid,
) -> Result<(), CoreError> {
    match record {
        Some(record) if record.id() == id && record.owner_id() == owner_id => Ok(()),
        _ => Err(CoreError::not_found(kind, id)),
    }
}

pub struct CardOwnership<'a>(pub &'a dyn CardStore);

impl OwnershipGuard for CardOwnership<'_> {
    fn validate(&self, owner_id: Uuid, resource_id: Uuid) -> Result<(), CoreError> {
        found(
            self.0.find_card(owner_id, resource_id)?,
            owner_id,
            ResourceKind::Card,
            resource_id,
        )
    }
}

pub struct BankAccountOwnership<'a>(pub &'a dyn BankAccountStore);

impl OwnershipGuard for BankAccountOwnership<'_> {
    fn validate(&self, owner_id: Uuid, resource_id: Uuid) -> Result<(), CoreError> {
        found(
            self.0.find_account(owner_id, resource_id)?,
            owner_id,
            ResourceKind::BankAccount,
            resource_id,
        )
    }
}

pub struct CategoryOwnership<'a>(pub &'a dyn CategoryStore);

impl OwnershipGuard for CategoryOwnership<'_> {
    fn validate(&self, owner_id: Uuid, resource_id: Uuid) -> Result<(), CoreError> {
        found(
            self.0.find_category(owner_id, resource_id)?,
            owner_id,
            ResourceKind::Category,
            resource_id,
        )
    }
}

pub struct TransactionOwnership<'a>(pub &'a dyn TransactionStore);

impl OwnershipGuard for TransactionOwnership<'_> {
    fn validate(&self, owner_id: Uuid, resource_id: Uuid) -> Result<(), CoreError> {
        found(
            self.0.find_transaction(owner_id, resource_id)?,
            owner_id,
            ResourceKind::Transaction,
            resource_id,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardledger_domain::{Category, CategoryKind};

    /// Hands out its one category to whoever asks.
    struct UnscopedCategories(Category);

    impl CategoryStore for UnscopedCategories {
        fn find_category(
            &self,
            _owner_id: Uuid,
            category_id: Uuid,
        ) -> Result<Option<Category>, CoreError> {
            Ok((self.0.id == category_id).then(|| self.0.clone()))
        }

        fn insert_category(&self, category: Category) -> Result<Category, CoreError> {
            Ok(category)
        }
    }

    #[test]
    fn foreign_rows_count_as_missing() {
        let owner = Uuid::new_v4();
        let category = Category::new(owner, "Food", CategoryKind::Expense);
        let store = UnscopedCategories(category.clone());
        let guard = CategoryOwnership(&store);

        assert!(guard.validate(owner, category.id).is_ok());
        assert!(matches!(
            guard.validate(Uuid::new_v4(), category.id),
            Err(CoreError::NotFound {
                kind: ResourceKind::Category,
                ..
            })
        ));
        assert!(guard.validate_optional(Uuid::new_v4(), None).is_ok());
    }
}
