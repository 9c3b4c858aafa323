//! Card management and the live invoice statement view.

use cardledger_domain::{
    BillingCycle, Card, CardUpdate, CardUsage, DayOfMonth, InvoiceStatement, NewCard,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    invoice_period::InvoicePeriodResolver,
    invoice_reconciler::InvoiceReconciler,
    ownership::{BankAccountOwnership, CardOwnership, OwnershipGuard},
    storage::{BankAccountStore, CardStore, InvoiceChargeStore, LineItemStore},
    CoreError, ResourceKind,
};

pub struct CardService<'a> {
    cards: &'a dyn CardStore,
    accounts: &'a dyn BankAccountStore,
    items: &'a dyn LineItemStore,
    reconciler: InvoiceReconciler<'a>,
}

impl<'a> CardService<'a> {
    pub fn new<S>(store: &'a S) -> Self
    where
        S: CardStore + BankAccountStore + LineItemStore + InvoiceChargeStore,
    {
        Self {
            cards: store,
            accounts: store,
            items: store,
            reconciler: InvoiceReconciler::new(store),
        }
    }

    pub fn with_reconciler(mut self, reconciler: InvoiceReconciler<'a>) -> Self {
        self.reconciler = reconciler;
        self
    }

    pub fn create(&self, owner_id: Uuid, new_card: NewCard) -> Result<Card, CoreError> {
        BankAccountOwnership(self.accounts)
            .validate_optional(owner_id, new_card.settlement_account_id)?;
        validate_name(&new_card.name)?;
        validate_limit(new_card.limit)?;

        let card = Card {
            id: Uuid::new_v4(),
            owner_id,
            name: new_card.name,
            color: new_card.color,
            limit: new_card.limit,
            closing_day: billing_day("closing", new_card.closing_day)?,
            due_day: billing_day("due", new_card.due_day)?,
            settlement_account_id: new_card.settlement_account_id,
        };
        let card = self.cards.insert_card(card)?;
        tracing::info!(card = %card.id, name = %card.name, "created card");
        Ok(card)
    }

    /// Applies `update`. When the name, billing calendar or settlement
    /// account changes, every cycle of the card is reconciled again.
    pub fn update(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        update: CardUpdate,
    ) -> Result<Card, CoreError> {
        let mut card = self.find_card(owner_id, card_id)?;
        BankAccountOwnership(self.accounts)
            .validate_optional(owner_id, update.settlement_account_id.flatten())?;
        let before = (
            card.name.clone(),
            card.closing_day,
            card.due_day,
            card.settlement_account_id,
        );

        if let Some(name) = update.name {
            validate_name(&name)?;
            card.name = name;
        }
        if let Some(color) = update.color {
            card.color = Some(color);
        }
        if let Some(limit) = update.limit {
            validate_limit(limit)?;
            card.limit = limit;
        }
        if let Some(day) = update.closing_day {
            card.closing_day = billing_day("closing", day)?;
        }
        if let Some(day) = update.due_day {
            card.due_day = billing_day("due", day)?;
        }
        if let Some(account_id) = update.settlement_account_id {
            card.settlement_account_id = account_id;
        }

        let card = self.cards.update_card(card)?;
        let after = (
            card.name.clone(),
            card.closing_day,
            card.due_day,
            card.settlement_account_id,
        );
        if before != after {
            self.reconciler.reconcile_card(owner_id, card.id)?;
        }
        Ok(card)
    }

    pub fn remove(&self, owner_id: Uuid, card_id: Uuid) -> Result<(), CoreError> {
        CardOwnership(self.cards).validate(owner_id, card_id)?;
        self.cards.delete_card(owner_id, card_id)?;
        tracing::info!(card = %card_id, "removed card");
        Ok(())
    }

    /// Cards of `owner_id` with their outstanding total and remaining limit.
    pub fn list_with_usage(&self, owner_id: Uuid) -> Result<Vec<CardUsage>, CoreError> {
        let mut rows = Vec::new();
        for card in self.cards.list_cards(owner_id)? {
            let total_spent: Decimal = self
                .items
                .list_items_by_card(owner_id, card.id)?
                .iter()
                .map(|item| item.value)
                .sum();
            rows.push(CardUsage {
                available_limit: card.limit - total_spent,
                total_spent,
                card,
            });
        }
        rows.sort_by(|a, b| a.card.name.cmp(&b.card.name));
        Ok(rows)
    }

    /// Live invoice of one cycle, computed from the line items.
    pub fn statement(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        cycle: BillingCycle,
    ) -> Result<InvoiceStatement, CoreError> {
        let card = self.find_card(owner_id, card_id)?;
        let range = InvoicePeriodResolver::cycle_range(cycle, card.closing_day)?;
        let mut items = self.items.find_items_in_range(owner_id, card_id, &range)?;
        items.sort_by(|a, b| b.date.cmp(&a.date));
        let total = items.iter().map(|item| item.value).sum();

        Ok(InvoiceStatement {
            card_id,
            cycle,
            closing_date: InvoicePeriodResolver::closing_date(cycle, card.closing_day)?,
            due_date: InvoicePeriodResolver::due_date(cycle, card.due_day)?,
            items,
            total,
        })
    }

    fn find_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<Card, CoreError> {
        self.cards
            .find_card(owner_id, card_id)?
            .ok_or_else(|| CoreError::not_found(ResourceKind::Card, card_id))
    }
}

fn billing_day(label: &str, day: u32) -> Result<DayOfMonth, CoreError> {
    DayOfMonth::new(day).ok_or_else(|| {
        CoreError::Validation(format!("{label} day must be between 1 and 28, got {day}"))
    })
}

fn validate_name(name: &str) -> Result<(), CoreError> {
    if name.trim().is_empty() {
        return Err(CoreError::Validation("card name is required".into()));
    }
    Ok(())
}

fn validate_limit(limit: Decimal) -> Result<(), CoreError> {
    if limit < Decimal::ZERO {
        return Err(CoreError::Validation(format!(
            "card limit cannot be negative, got {limit}"
        )));
    }
    Ok(())
}
