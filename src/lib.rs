#![doc(test(attr(deny(warnings))))]

//! Cardledger keeps credit-card purchases, their installments and the monthly
//! invoice charge each card books against its settlement account.

pub mod app;
pub mod build_info;
pub mod cli;

pub use cardledger_config;
pub use cardledger_core;
pub use cardledger_domain;
pub use cardledger_storage_json;

pub use app::{AppError, CardLedger};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Installs the global tracing subscriber. Safe to call more than once.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("cardledger=info"));
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    });
}
