use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::ConfigError;

const BOOK_FILE_NAME: &str = "book.json";

/// Stores user-configurable preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Leading word of booked invoice charges, e.g. `Invoice Gold - 02/2024`.
    #[serde(default = "Config::default_invoice_label_prefix")]
    pub invoice_label_prefix: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Optional custom directory for the book file. Defaults to `<base>/books`.
    pub data_root: Option<PathBuf>,

    #[serde(default = "Config::default_backup_retention")]
    pub backup_retention: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            invoice_label_prefix: Self::default_invoice_label_prefix(),
            data_root: None,
            backup_retention: Self::default_backup_retention(),
        }
    }
}

impl Config {
    pub fn default_invoice_label_prefix() -> String {
        "Invoice".into()
    }

    pub fn default_backup_retention() -> usize {
        5
    }

    pub fn resolve_data_root(&self, base: &Path) -> PathBuf {
        match &self.data_root {
            Some(path) => path.clone(),
            None => base.join("books"),
        }
    }

    pub fn book_path(&self, base: &Path) -> PathBuf {
        self.resolve_data_root(base).join(BOOK_FILE_NAME)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.invoice_label_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "invoice_label_prefix cannot be empty".into(),
            ));
        }
        if self.backup_retention == 0 {
            return Err(ConfigError::Invalid(
                "backup_retention must keep at least one backup".into(),
            ));
        }
        Ok(())
    }
}
