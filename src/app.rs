//! Wires configuration, the book store and the services for one local owner.

use cardledger_config::{Config, ConfigError, ConfigManager};
use cardledger_core::{
    CardPurchaseService, CardService, CoreError, InvoiceReconciler, TransactionService,
};
use cardledger_storage_json::{JsonBookStore, StorageError};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Core(#[from] CoreError),
}

pub struct CardLedger {
    config: Config,
    store: JsonBookStore,
    owner_id: Uuid,
}

impl CardLedger {
    /// Loads the configuration and opens the book it points to.
    pub fn open(manager: &ConfigManager) -> Result<Self, AppError> {
        let config = manager.load()?;
        let path = config.book_path(manager.base_dir());
        let store = JsonBookStore::open(&path)?.with_retention(config.backup_retention);
        tracing::info!(book = %path.display(), "opened card ledger");
        Self::with_store(config, store)
    }

    pub fn with_store(config: Config, store: JsonBookStore) -> Result<Self, AppError> {
        let owner_id = store.owner_id()?;
        Ok(Self {
            config,
            store,
            owner_id,
        })
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn store(&self) -> &JsonBookStore {
        &self.store
    }

    pub fn reconciler(&self) -> InvoiceReconciler<'_> {
        InvoiceReconciler::new(&self.store).with_label_prefix(&self.config.invoice_label_prefix)
    }

    pub fn purchases(&self) -> CardPurchaseService<'_> {
        CardPurchaseService::new(&self.store).with_reconciler(self.reconciler())
    }

    pub fn cards(&self) -> CardService<'_> {
        CardService::new(&self.store).with_reconciler(self.reconciler())
    }

    pub fn transactions(&self) -> TransactionService<'_> {
        TransactionService::new(&self.store)
    }
}
