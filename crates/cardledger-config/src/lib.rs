//! cardledger-config
//!
//! User preferences for the card ledger: invoice labelling, where the book
//! lives and how many backups to keep.

pub mod error;
pub mod manager;
pub mod model;

pub use error::ConfigError;
pub use manager::{ConfigManager, HOME_ENV};
pub use model::Config;
