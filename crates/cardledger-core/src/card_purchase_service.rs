//! Card purchase lifecycle: every mutation here ends with an invoice reconcile.

use cardledger_domain::{is_cent_precise, LineItem, LineItemUpdate, NewCardPurchase};
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    installment_planner::InstallmentPlanner,
    invoice_reconciler::InvoiceReconciler,
    ownership::{CardOwnership, CategoryOwnership, OwnershipGuard},
    storage::{CardStore, CategoryStore, InvoiceChargeStore, LineItemStore},
    CoreError, ResourceKind,
};

pub struct CardPurchaseService<'a> {
    cards: &'a dyn CardStore,
    categories: &'a dyn CategoryStore,
    items: &'a dyn LineItemStore,
    reconciler: InvoiceReconciler<'a>,
}

impl<'a> CardPurchaseService<'a> {
    pub fn new<S>(store: &'a S) -> Self
    where
        S: CardStore + CategoryStore + LineItemStore + InvoiceChargeStore,
    {
        Self {
            cards: store,
            categories: store,
            items: store,
            reconciler: InvoiceReconciler::new(store),
        }
    }

    pub fn with_reconciler(mut self, reconciler: InvoiceReconciler<'a>) -> Self {
        self.reconciler = reconciler;
        self
    }

    /// Records a purchase, split into installments when requested, and
    /// refreshes the invoice of every cycle an installment lands in.
    pub fn create(
        &self,
        owner_id: Uuid,
        purchase: NewCardPurchase,
    ) -> Result<Vec<LineItem>, CoreError> {
        CardOwnership(self.cards).validate(owner_id, purchase.card_id)?;
        CategoryOwnership(self.categories).validate_optional(owner_id, purchase.category_id)?;

        let items = InstallmentPlanner::plan(owner_id, &purchase)?;
        let dates: Vec<NaiveDate> = items.iter().map(|item| item.date).collect();
        if items.len() == 1 {
            self.items.create_item(items[0].clone())?;
        } else {
            self.items.create_items(items.clone())?;
        }
        tracing::info!(
            card = %purchase.card_id,
            installments = purchase.installments,
            total = %purchase.total,
            "recorded card purchase"
        );

        self.reconciler
            .reconcile_dates(owner_id, purchase.card_id, dates)?;
        Ok(items)
    }

    /// Edits one line item. The cycle of the old date is always refreshed,
    /// and the cycle of the new date too when the date moved.
    pub fn update(
        &self,
        owner_id: Uuid,
        item_id: Uuid,
        update: LineItemUpdate,
    ) -> Result<LineItem, CoreError> {
        let mut item = self.find_item(owner_id, item_id)?;
        Self::validate_update(&update)?;
        CategoryOwnership(self.categories).validate_optional(owner_id, update.category_id)?;

        let old_date = item.date;
        update.apply(&mut item);
        let new_date = item.date;
        let updated = self.items.update_item(item)?;

        let mut dates = vec![old_date];
        if new_date != old_date {
            dates.push(new_date);
        }
        self.reconciler
            .reconcile_dates(owner_id, updated.card_id, dates)?;
        Ok(updated)
    }

    pub fn remove(&self, owner_id: Uuid, item_id: Uuid) -> Result<LineItem, CoreError> {
        let item = self.find_item(owner_id, item_id)?;
        self.items.delete_item(owner_id, item_id)?;
        self.reconciler
            .reconcile_dates(owner_id, item.card_id, [item.date])?;
        Ok(item)
    }

    /// Removes every installment of a purchase. Returns how many were removed;
    /// an unknown group removes nothing.
    pub fn remove_group(&self, owner_id: Uuid, group_id: Uuid) -> Result<usize, CoreError> {
        let installments = self.items.find_items_by_group(owner_id, group_id)?;
        let Some(first) = installments.first() else {
            return Ok(0);
        };
        let card_id = first.card_id;
        let dates: Vec<NaiveDate> = installments.iter().map(|item| item.date).collect();

        let removed = self.items.delete_items_by_group(owner_id, group_id)?;
        tracing::info!(group = %group_id, removed, "removed installment group");
        self.reconciler.reconcile_dates(owner_id, card_id, dates)?;
        Ok(removed)
    }

    /// Line items of a card, newest first, optionally limited to one calendar month.
    pub fn list_for_card(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        month: Option<(u32, i32)>,
    ) -> Result<Vec<LineItem>, CoreError> {
        CardOwnership(self.cards).validate(owner_id, card_id)?;
        let mut items = self.items.list_items_by_card(owner_id, card_id)?;
        if let Some((month, year)) = month {
            items.retain(|item| item.date.month() == month && item.date.year() == year);
        }
        items.sort_by(|a, b| b.date.cmp(&a.date));
        Ok(items)
    }

    fn find_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<LineItem, CoreError> {
        self.items
            .find_item(owner_id, item_id)?
            .ok_or_else(|| CoreError::not_found(ResourceKind::LineItem, item_id))
    }

    fn validate_update(update: &LineItemUpdate) -> Result<(), CoreError> {
        if let Some(name) = &update.name {
            if name.trim().is_empty() {
                return Err(CoreError::Validation("line item name is required".into()));
            }
        }
        if let Some(value) = update.value {
            if value <= Decimal::ZERO || !is_cent_precise(value) {
                return Err(CoreError::Validation(format!(
                    "line item value must be a positive amount in cents, got {value}"
                )));
            }
        }
        Ok(())
    }
}
