//! cardledger-core
//!
//! Invoice and installment engine plus the services that drive it.
//! Depends on cardledger-domain. No CLI, no terminal I/O; persistence only
//! through the traits in [`storage`].

pub mod card_purchase_service;
pub mod card_service;
pub mod error;
pub mod installment_planner;
pub mod invoice_period;
pub mod invoice_reconciler;
pub mod ownership;
pub mod storage;
pub mod transaction_service;


pub use card_purchase_service::*;
pub use card_service::*;
pub use error::{CoreError, ResourceKind};
pub use installment_planner::*;
pub use invoice_period::*;
pub use invoice_reconciler::*;
pub use ownership::*;
pub use transaction_service::*;
