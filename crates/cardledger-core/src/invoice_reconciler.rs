//! Keeps one invoice charge per card cycle equal to the sum of its line items.
//!
//! The charge is never adjusted by deltas. Each run reloads the cycle's line
//! items and writes the absolute total, so reruns and concurrent runs for the
//! same cycle converge on the same row.

use std::collections::BTreeSet;

use cardledger_domain::{
    BillingCycle, Card, DayOfMonth, InvoiceCharge, InvoiceKey, DEFAULT_INVOICE_LABEL,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    invoice_period::InvoicePeriodResolver,
    storage::{CardStore, ChargeWrite, InvoiceChargeStore, LineItemStore},
    CoreError, ResourceKind,
};

/// Result of reconciling a single cycle.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The card has no settlement account; nothing was touched.
    Skipped,
    /// The cycle is empty; `removed` tells whether a charge existed.
    Cleared { removed: bool },
    Booked(InvoiceCharge),
}

pub struct InvoiceReconciler<'a> {
    cards: &'a dyn CardStore,
    items: &'a dyn LineItemStore,
    charges: &'a dyn InvoiceChargeStore,
    label_prefix: String,
}

impl<'a> InvoiceReconciler<'a> {
    pub fn new<S>(store: &'a S) -> Self
    where
        S: CardStore + LineItemStore + InvoiceChargeStore,
    {
        Self {
            cards: store,
            items: store,
            charges: store,
            label_prefix: DEFAULT_INVOICE_LABEL.to_string(),
        }
    }

    pub fn with_label_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.label_prefix = prefix.into();
        self
    }

    /// Distinct cycles touched by `dates`, oldest first.
    pub fn affected_cycles<I>(dates: I, closing_day: DayOfMonth) -> BTreeSet<BillingCycle>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        dates
            .into_iter()
            .map(|date| InvoicePeriodResolver::resolve_period(date, closing_day))
            .collect()
    }

    pub fn reconcile(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        cycle: BillingCycle,
    ) -> Result<ReconcileOutcome, CoreError> {
        let card = self.load_card(owner_id, card_id)?;
        self.reconcile_cycle(&card, cycle)
    }

    /// Reconciles every distinct cycle of `dates` once, in order. The first
    /// failure aborts and is returned; rerunning is always safe.
    pub fn reconcile_dates<I>(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        dates: I,
    ) -> Result<Vec<ReconcileOutcome>, CoreError>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let card = self.load_card(owner_id, card_id)?;
        let cycles = Self::affected_cycles(dates, card.closing_day);
        tracing::debug!(card = %card.id, cycles = cycles.len(), "reconciling invoice cycles");
        cycles
            .into_iter()
            .map(|cycle| self.reconcile_cycle(&card, cycle))
            .collect()
    }

    /// Reconciles every cycle the card currently has line items or charges in.
    pub fn reconcile_card(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
    ) -> Result<Vec<ReconcileOutcome>, CoreError> {
        let card = self.load_card(owner_id, card_id)?;
        let mut cycles = Self::affected_cycles(
            self.items
                .list_items_by_card(owner_id, card_id)?
                .into_iter()
                .map(|item| item.date),
            card.closing_day,
        );
        cycles.extend(
            self.charges
                .list_charges(owner_id, card_id)?
                .into_iter()
                .map(|charge| charge.cycle()),
        );
        cycles
            .into_iter()
            .map(|cycle| self.reconcile_cycle(&card, cycle))
            .collect()
    }

    fn load_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<Card, CoreError> {
        self.cards
            .find_card(owner_id, card_id)?
            .ok_or_else(|| CoreError::not_found(ResourceKind::Card, card_id))
    }

    fn reconcile_cycle(
        &self,
        card: &Card,
        cycle: BillingCycle,
    ) -> Result<ReconcileOutcome, CoreError> {
        let Some(settlement_account_id) = card.settlement_account_id else {
            tracing::warn!(
                card = %card.id,
                %cycle,
                "card has no settlement account, skipping invoice"
            );
            return Ok(ReconcileOutcome::Skipped);
        };

        let range = InvoicePeriodResolver::cycle_range(cycle, card.closing_day)?;
        let due_date = InvoicePeriodResolver::due_date(cycle, card.due_day)?;
        let name = InvoiceCharge::label(&self.label_prefix, &card.name, cycle);
        let key = InvoiceKey::new(card.id, cycle);
        let build = |total: Decimal| InvoiceCharge {
            id: Uuid::new_v4(),
            owner_id: card.owner_id,
            settlement_account_id,
            key,
            name: name.clone(),
            value: total,
            due_date,
        };

        match self
            .charges
            .recompute_charge(card.owner_id, &key, &range, &build)?
        {
            ChargeWrite::Deleted { removed } => {
                if removed {
                    tracing::info!(card = %card.id, %cycle, "removed empty invoice charge");
                }
                Ok(ReconcileOutcome::Cleared { removed })
            }
            ChargeWrite::Upserted(charge) => {
                tracing::info!(
                    card = %card.id,
                    %cycle,
                    total = %charge.value,
                    "booked invoice charge"
                );
                Ok(ReconcileOutcome::Booked(charge))
            }
        }
    }
}
