use std::{
    cmp::Reverse,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use cardledger_core::{storage::*, CoreError};
use cardledger_domain::{
    BankAccount, Card, Category, CycleRange, InvoiceCharge, InvoiceKey, LineItem, Transaction,
};
use chrono::{NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const BOOK_EXTENSION: &str = "json";
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
pub const DEFAULT_RETENTION: usize = 5;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        CoreError::Storage(err.to_string())
    }
}

/// Every table of one book. Invoice charges are rows of `transactions`
/// carrying an invoice key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Book {
    /// Owner the local CLI acts as; generated with the book.
    pub owner_id: Uuid,
    pub accounts: Vec<BankAccount>,
    pub categories: Vec<Category>,
    pub cards: Vec<Card>,
    pub line_items: Vec<LineItem>,
    pub transactions: Vec<Transaction>,
}

impl Default for Book {
    fn default() -> Self {
        Self {
            owner_id: Uuid::new_v4(),
            accounts: Vec::new(),
            categories: Vec::new(),
            cards: Vec::new(),
            line_items: Vec::new(),
            transactions: Vec::new(),
        }
    }
}

/// Backup file written before the book file is replaced.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupInfo {
    pub id: String,
    pub created_at: Option<NaiveDateTime>,
    pub path: PathBuf,
}

/// Thread-safe book store, optionally backed by a JSON file.
///
/// Each mutation runs under the write lock and, when file backed, is flushed
/// before the lock is released. A failed flush rolls the tables back, and a
/// mutation that leaves the tables unchanged writes nothing.
pub struct JsonBookStore {
    book: RwLock<Book>,
    path: Option<PathBuf>,
    retention: usize,
}

impl JsonBookStore {
    pub fn in_memory() -> Self {
        Self {
            book: RwLock::new(Book::default()),
            path: None,
            retention: DEFAULT_RETENTION,
        }
    }

    /// Opens the book at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let book = if path.exists() {
            load_book_from_path(&path)?
        } else {
            Book::default()
        };
        tracing::debug!(path = %path.display(), cards = book.cards.len(), "opened book");
        Ok(Self {
            book: RwLock::new(book),
            path: Some(path),
            retention: DEFAULT_RETENTION,
        })
    }

    pub fn with_retention(mut self, retention: usize) -> Self {
        self.retention = retention.max(1);
        self
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn owner_id(&self) -> Result<Uuid, StorageError> {
        Ok(self.read()?.owner_id)
    }

    pub fn snapshot(&self) -> Result<Book, StorageError> {
        Ok(self.read()?.clone())
    }

    pub fn backup_dir(&self) -> Option<PathBuf> {
        let path = self.path.as_ref()?;
        let stem = path.file_stem()?.to_string_lossy().into_owned();
        Some(path.with_file_name(format!("{stem}-backups")))
    }

    /// Backups of the book file, newest first.
    pub fn list_backups(&self) -> Result<Vec<BackupInfo>, StorageError> {
        let Some(dir) = self.backup_dir() else {
            return Ok(Vec::new());
        };
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(BOOK_EXTENSION) {
                continue;
            }
            if let Some(id) = path.file_name().and_then(|name| name.to_str()) {
                entries.push(BackupInfo {
                    id: id.to_string(),
                    created_at: parse_backup_timestamp(id),
                    path: path.clone(),
                });
            }
        }
        entries.sort_by_key(|info| Reverse(info.created_at));
        Ok(entries)
    }

    /// Replaces the live tables with the content of a backup and persists them.
    pub fn restore_backup(&self, backup: &BackupInfo) -> Result<(), StorageError> {
        let restored = load_book_from_path(&backup.path)?;
        let mut book = self.write()?;
        *book = restored;
        self.persist(&book)?;
        tracing::info!(backup = %backup.id, "restored book from backup");
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Book>, StorageError> {
        self.book.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Book>, StorageError> {
        self.book.write().map_err(|_| StorageError::Poisoned)
    }

    fn query<T>(&self, f: impl FnOnce(&Book) -> T) -> Result<T, CoreError> {
        Ok(f(&*self.read()?))
    }

    fn mutate<T>(&self, f: impl FnOnce(&mut Book) -> T) -> Result<T, CoreError> {
        let mut book = self.write()?;
        let before = self.path.as_ref().map(|_| book.clone());
        let result = f(&mut book);
        let Some(before) = before else {
            return Ok(result);
        };
        if *book == before {
            return Ok(result);
        }
        if let Err(err) = self.persist(&book) {
            *book = before;
            return Err(err.into());
        }
        Ok(result)
    }

    fn persist(&self, book: &Book) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if path.exists() {
            self.backup_existing_file(path)?;
        }
        save_book_to_path(book, path)
    }

    fn backup_existing_file(&self, path: &Path) -> Result<(), StorageError> {
        let Some(dir) = self.backup_dir() else {
            return Ok(());
        };
        fs::create_dir_all(&dir)?;
        let timestamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| "book".into());
        let backup_path = dir.join(format!("{stem}_{timestamp}.{BOOK_EXTENSION}"));
        fs::copy(path, &backup_path)?;
        self.prune_backups()
    }

    fn prune_backups(&self) -> Result<(), StorageError> {
        for entry in self.list_backups()?.into_iter().skip(self.retention) {
            if let Err(err) = fs::remove_file(&entry.path) {
                tracing::warn!(backup = %entry.id, error = %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl Default for JsonBookStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl CardStore for JsonBookStore {
    fn find_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<Option<Card>, CoreError> {
        self.query(|book| {
            book.cards
                .iter()
                .find(|card| card.id == card_id && card.owner_id == owner_id)
                .cloned()
        })
    }

    fn list_cards(&self, owner_id: Uuid) -> Result<Vec<Card>, CoreError> {
        self.query(|book| {
            book.cards
                .iter()
                .filter(|card| card.owner_id == owner_id)
                .cloned()
                .collect()
        })
    }

    fn insert_card(&self, card: Card) -> Result<Card, CoreError> {
        self.mutate(|book| book.cards.push(card.clone()))?;
        Ok(card)
    }

    fn update_card(&self, card: Card) -> Result<Card, CoreError> {
        let updated = self.mutate(|book| {
            replace(&mut book.cards, card.clone(), |row| {
                row.id == card.id && row.owner_id == card.owner_id
            })
        })?;
        if !updated {
            return Err(CoreError::Storage(format!("card {} vanished during update", card.id)));
        }
        Ok(card)
    }

    fn delete_card(&self, owner_id: Uuid, card_id: Uuid) -> Result<bool, CoreError> {
        self.mutate(|book| {
            let removed = remove_where(&mut book.cards, |card| {
                card.id == card_id && card.owner_id == owner_id
            });
            if removed == 0 {
                return false;
            }
            remove_where(&mut book.line_items, |item| item.card_id == card_id);
            remove_where(&mut book.transactions, |txn| {
                txn.invoice.map(|key| key.card_id) == Some(card_id)
            });
            true
        })
    }
}

impl LineItemStore for JsonBookStore {
    fn create_item(&self, item: LineItem) -> Result<LineItem, CoreError> {
        self.mutate(|book| book.line_items.push(item.clone()))?;
        Ok(item)
    }

    fn create_items(&self, items: Vec<LineItem>) -> Result<usize, CoreError> {
        let count = items.len();
        self.mutate(|book| book.line_items.extend(items))?;
        Ok(count)
    }

    fn find_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<Option<LineItem>, CoreError> {
        self.query(|book| {
            book.line_items
                .iter()
                .find(|item| item.id == item_id && item.owner_id == owner_id)
                .cloned()
        })
    }

    fn find_items_in_range(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
        range: &CycleRange,
    ) -> Result<Vec<LineItem>, CoreError> {
        self.query(|book| {
            book.line_items
                .iter()
                .filter(|item| {
                    item.owner_id == owner_id
                        && item.card_id == card_id
                        && range.contains(item.date)
                })
                .cloned()
                .collect()
        })
    }

    fn find_items_by_group(
        &self,
        owner_id: Uuid,
        group_id: Uuid,
    ) -> Result<Vec<LineItem>, CoreError> {
        self.query(|book| {
            let mut items: Vec<LineItem> = book
                .line_items
                .iter()
                .filter(|item| item.owner_id == owner_id && item.group_id == Some(group_id))
                .cloned()
                .collect();
            items.sort_by_key(|item| item.installment.index);
            items
        })
    }

    fn list_items_by_card(
        &self,
        owner_id: Uuid,
        card_id: Uuid,
    ) -> Result<Vec<LineItem>, CoreError> {
        self.query(|book| {
            book.line_items
                .iter()
                .filter(|item| item.owner_id == owner_id && item.card_id == card_id)
                .cloned()
                .collect()
        })
    }

    fn update_item(&self, item: LineItem) -> Result<LineItem, CoreError> {
        let updated = self.mutate(|book| {
            replace(&mut book.line_items, item.clone(), |row| {
                row.id == item.id && row.owner_id == item.owner_id
            })
        })?;
        if !updated {
            return Err(CoreError::Storage(format!(
                "line item {} vanished during update",
                item.id
            )));
        }
        Ok(item)
    }

    fn delete_item(&self, owner_id: Uuid, item_id: Uuid) -> Result<bool, CoreError> {
        self.mutate(|book| {
            remove_where(&mut book.line_items, |item| {
                item.id == item_id && item.owner_id == owner_id
            }) > 0
        })
    }

    fn delete_items_by_group(&self, owner_id: Uuid, group_id: Uuid) -> Result<usize, CoreError> {
        self.mutate(|book| {
            remove_where(&mut book.line_items, |item| {
                item.owner_id == owner_id && item.group_id == Some(group_id)
            })
        })
    }
}

impl InvoiceChargeStore for JsonBookStore {
    fn upsert_charge(&self, charge: InvoiceCharge) -> Result<InvoiceCharge, CoreError> {
        self.mutate(|book| upsert_charge_row(book, charge))
    }

    fn delete_charge(&self, key: &InvoiceKey) -> Result<bool, CoreError> {
        self.mutate(|book| delete_charge_row(book, key))
    }

    fn recompute_charge(
        &self,
        owner_id: Uuid,
        key: &InvoiceKey,
        range: &CycleRange,
        build: &dyn Fn(Decimal) -> InvoiceCharge,
    ) -> Result<ChargeWrite, CoreError> {
        self.mutate(|book| {
            let total: Decimal = book
                .line_items
                .iter()
                .filter(|item| {
                    item.owner_id == owner_id
                        && item.card_id == key.card_id
                        && range.contains(item.date)
                })
                .map(|item| item.value)
                .sum();
            if total.is_zero() {
                ChargeWrite::Deleted {
                    removed: delete_charge_row(book, key),
                }
            } else {
                ChargeWrite::Upserted(upsert_charge_row(book, build(total)))
            }
        })
    }

    fn find_charge(&self, key: &InvoiceKey) -> Result<Option<InvoiceCharge>, CoreError> {
        self.query(|book| {
            book.transactions
                .iter()
                .find(|txn| txn.invoice == Some(*key))
                .and_then(Transaction::as_invoice_charge)
        })
    }

    fn list_charges(&self, owner_id: Uuid, card_id: Uuid) -> Result<Vec<InvoiceCharge>, CoreError> {
        self.query(|book| {
            let mut charges: Vec<InvoiceCharge> = book
                .transactions
                .iter()
                .filter(|txn| txn.owner_id == owner_id)
                .filter_map(Transaction::as_invoice_charge)
                .filter(|charge| charge.card_id() == card_id)
                .collect();
            charges.sort_by_key(|charge| charge.cycle());
            charges
        })
    }
}

impl BankAccountStore for JsonBookStore {
    fn find_account(
        &self,
        owner_id: Uuid,
        account_id: Uuid,
    ) -> Result<Option<BankAccount>, CoreError> {
        self.query(|book| {
            book.accounts
                .iter()
                .find(|account| account.id == account_id && account.owner_id == owner_id)
                .cloned()
        })
    }

    fn insert_account(&self, account: BankAccount) -> Result<BankAccount, CoreError> {
        self.mutate(|book| book.accounts.push(account.clone()))?;
        Ok(account)
    }

    fn list_accounts(&self, owner_id: Uuid) -> Result<Vec<BankAccount>, CoreError> {
        self.query(|book| {
            book.accounts
                .iter()
                .filter(|account| account.owner_id == owner_id)
                .cloned()
                .collect()
        })
    }
}

impl CategoryStore for JsonBookStore {
    fn find_category(
        &self,
        owner_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<Category>, CoreError> {
        self.query(|book| {
            book.categories
                .iter()
                .find(|category| category.id == category_id && category.owner_id == owner_id)
                .cloned()
        })
    }

    fn insert_category(&self, category: Category) -> Result<Category, CoreError> {
        self.mutate(|book| book.categories.push(category.clone()))?;
        Ok(category)
    }
}

impl TransactionStore for JsonBookStore {
    fn find_transaction(&self, owner_id: Uuid, id: Uuid) -> Result<Option<Transaction>, CoreError> {
        self.query(|book| {
            book.transactions
                .iter()
                .find(|txn| txn.id == id && txn.owner_id == owner_id)
                .cloned()
        })
    }

    fn insert_transaction(&self, transaction: Transaction) -> Result<Transaction, CoreError> {
        self.mutate(|book| book.transactions.push(transaction.clone()))?;
        Ok(transaction)
    }

    fn update_transaction(&self, transaction: Transaction) -> Result<Transaction, CoreError> {
        let updated = self.mutate(|book| {
            replace(&mut book.transactions, transaction.clone(), |row| {
                row.id == transaction.id && row.owner_id == transaction.owner_id
            })
        })?;
        if !updated {
            return Err(CoreError::Storage(format!(
                "transaction {} vanished during update",
                transaction.id
            )));
        }
        Ok(transaction)
    }

    fn delete_transaction(&self, owner_id: Uuid, id: Uuid) -> Result<bool, CoreError> {
        self.mutate(|book| {
            remove_where(&mut book.transactions, |txn| txn.id == id && txn.owner_id == owner_id) > 0
        })
    }

    fn list_transactions(&self, owner_id: Uuid) -> Result<Vec<Transaction>, CoreError> {
        self.query(|book| {
            book.transactions
                .iter()
                .filter(|txn| txn.owner_id == owner_id)
                .cloned()
                .collect()
        })
    }
}

fn upsert_charge_row(book: &mut Book, charge: InvoiceCharge) -> InvoiceCharge {
    let existing = book
        .transactions
        .iter_mut()
        .find(|txn| txn.invoice == Some(charge.key));
    match existing {
        Some(row) => {
            row.bank_account_id = charge.settlement_account_id;
            row.name = charge.name.clone();
            row.value = charge.value;
            row.date = charge.due_date;
            InvoiceCharge {
                id: row.id,
                owner_id: row.owner_id,
                ..charge
            }
        }
        None => {
            book.transactions.push(Transaction::from(charge.clone()));
            charge
        }
    }
}

fn delete_charge_row(book: &mut Book, key: &InvoiceKey) -> bool {
    remove_where(&mut book.transactions, |txn| txn.invoice == Some(*key)) > 0
}

fn replace<T>(rows: &mut [T], value: T, matches: impl Fn(&T) -> bool) -> bool {
    match rows.iter_mut().find(|row| matches(row)) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

fn remove_where<T>(rows: &mut Vec<T>, matches: impl Fn(&T) -> bool) -> usize {
    let before = rows.len();
    rows.retain(|row| !matches(row));
    before - rows.len()
}

/// Saves a book to an arbitrary path on disk.
pub fn save_book_to_path(book: &Book, path: &Path) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    write_atomic(&tmp, &serde_json::to_string_pretty(book)?)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Loads a book from the provided filesystem path.
pub fn load_book_from_path(path: &Path) -> Result<Book, StorageError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn parse_backup_timestamp(name: &str) -> Option<NaiveDateTime> {
    let trimmed = name.strip_suffix(&format!(".{BOOK_EXTENSION}"))?;
    let mut segments = trimmed.rsplitn(3, '_');
    let time = segments.next()?;
    let date = segments.next()?;
    if !is_digits(date, 8) || !is_digits(time, 6) {
        return None;
    }
    NaiveDateTime::parse_from_str(&format!("{date}{time}"), "%Y%m%d%H%M%S").ok()
}

fn is_digits(value: &str, len: usize) -> bool {
    value.len() == len && value.chars().all(|c| c.is_ascii_digit())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), StorageError> {
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.sync_all()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backup_names_parse_back_to_timestamps() {
        let parsed = parse_backup_timestamp("book_20240305_101112.json").expect("timestamp");
        assert_eq!(parsed.to_string(), "2024-03-05 10:11:12");
        assert_eq!(parse_backup_timestamp("book.json"), None);
        assert_eq!(parse_backup_timestamp("book_2024_1011.json"), None);
    }

    #[test]
    fn tmp_path_keeps_the_original_extension() {
        assert_eq!(tmp_path(Path::new("/data/book.json")), PathBuf::from("/data/book.json.tmp"));
        assert_eq!(tmp_path(Path::new("/data/book")), PathBuf::from("/data/book.tmp"));
    }
}
