use std::fmt;

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: ResourceKind, id: Uuid },
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
    #[error("Invariant violated: {0}")]
    InvariantViolation(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Storage error: {0}")]
    Storage(String),
}

impl CoreError {
    pub fn not_found(kind: ResourceKind, id: Uuid) -> Self {
        CoreError::NotFound { kind, id }
    }
}

/// Entity kinds that can be reported as missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Card,
    BankAccount,
    Category,
    LineItem,
    Transaction,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResourceKind::Card => "Card",
            ResourceKind::BankAccount => "Bank account",
            ResourceKind::Category => "Category",
            ResourceKind::LineItem => "Line item",
            ResourceKind::Transaction => "Transaction",
        };
        f.write_str(label)
    }
}
