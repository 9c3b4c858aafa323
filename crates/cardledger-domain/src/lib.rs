//! cardledger-domain
//!
//! Pure domain models (Card, LineItem, InvoiceCharge, BankAccount, Category, Transaction).
//! No I/O, no CLI, no storage. Only data types, calendar helpers and core enums.

pub mod account;
pub mod card;
pub mod category;
pub mod common;
pub mod invoice;
pub mod line_item;
pub mod transaction;

pub use account::*;
pub use card::*;
pub use category::*;
pub use common::*;
pub use invoice::*;
pub use line_item::*;
pub use transaction::*;
