mod category_storage;
mod errors;
mod import_batch_storage;
mod processing_state_storage;
mod transaction_storage;

use std::sync::Arc;

use rust_decimal::Decimal;

use crate::models::{Category, ImportBatch, ImportBatchId, Transaction, TransactionFingerprint, TransactionId, TransactionProcessingState};
use crate::types::AccountId;

pub use category_storage::CategoryStorage;
pub use errors::StorageError;
pub use import_batch_storage::ImportBatchStorage;
pub use processing_state_storage::ProcessingStateStorage;
pub use transaction_storage::TransactionStorage;

pub trait TransactionRepository: Send + Sync + 'static {
    /// Persists the transaction unless one with the same fingerprint already exists for the
    /// account. Returns `false` when it was already present. Must be atomic per fingerprint.
    fn insert_if_absent(&self, transaction: Transaction) -> Result<bool, StorageError>;
    fn load(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>, StorageError>;
    fn find_by_fingerprint(&self, account_id: &str, fingerprint: &TransactionFingerprint) -> Result<Option<TransactionId>, StorageError>;
    fn find_by_content(&self, account_id: &str, fingerprint: &TransactionFingerprint) -> Result<Option<TransactionId>, StorageError>;
    fn find(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StorageError>;
    /// Deletes a transaction together with its fingerprint entries, undoing `insert_if_absent`.
    fn remove(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>, StorageError>;
}

pub trait ProcessingStateRepository: Send + Sync + 'static {
    /// Stores the state, last writer wins. Rejects writes that would move the stored status
    /// backwards or replace a submitted state.
    fn save(&self, state: TransactionProcessingState) -> Result<(), StorageError>;
    fn load(&self, transaction_id: &TransactionId) -> Result<Option<TransactionProcessingState>, StorageError>;
    fn find_all(&self, account_id: Option<&str>) -> Result<Vec<TransactionProcessingState>, StorageError>;
    /// Reserves the transaction for a ledger submission. Returns `false` while another caller
    /// holds the reservation. Must be atomic across every user of the repository.
    fn claim_submission(&self, transaction_id: &TransactionId) -> Result<bool, StorageError>;
    fn release_submission(&self, transaction_id: &TransactionId) -> Result<(), StorageError>;
}

pub trait ImportBatchRepository: Send + Sync + 'static {
    /// Allocates the next sequence number for the account, atomically.
    fn next_sequence(&self, account_id: &str) -> Result<u64, StorageError>;
    fn save(&self, batch: ImportBatch) -> Result<(), StorageError>;
    fn load(&self, batch_id: &ImportBatchId) -> Result<Option<ImportBatch>, StorageError>;
    fn find_by_account(&self, account_id: &str) -> Result<Vec<ImportBatch>, StorageError>;
}

pub trait CategoryRepository: Send + Sync + 'static {
    fn save(&self, category: Category) -> Result<(), StorageError>;
    fn load(&self, category_id: &str) -> Result<Option<Category>, StorageError>;
    fn find_all(&self) -> Result<Vec<Category>, StorageError>;
}

/// Criteria for selecting stored transactions. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub account_id: Option<AccountId>,
    /// Case-insensitive substring of the description.
    pub description_contains: Option<String>,
    pub min_amount: Option<Decimal>,
    pub max_amount: Option<Decimal>
}

impl TransactionFilter {
    pub fn matches(&self, transaction: &Transaction) -> bool {
        if let Some(account_id) = &self.account_id {
            if transaction.account_id() != account_id {
                return false;
            }
        }

        if let Some(needle) = &self.description_contains {
            if !transaction.description.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }

        let amount = transaction.amount.amount();

        if self.min_amount.is_some_and(|min| amount < min) {
            return false;
        }

        if self.max_amount.is_some_and(|max| amount > max) {
            return false;
        }

        true
    }
}

/// The set of repositories the services are wired with.
#[derive(Clone)]
pub struct Repositories {
    pub transactions: Arc<dyn TransactionRepository>,
    pub states: Arc<dyn ProcessingStateRepository>,
    pub batches: Arc<dyn ImportBatchRepository>,
    pub categories: Arc<dyn CategoryRepository>
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            transactions: Arc::new(TransactionStorage::new()),
            states: Arc::new(ProcessingStateStorage::new()),
            batches: Arc::new(ImportBatchStorage::new()),
            categories: Arc::new(CategoryStorage::new())
        }
    }

    /// Stores the given categories, adding the default `uncategorized` label unless one of
    /// them already is it (for example to map it to a ledger category).
    pub fn seed_categories(&self, categories: &[Category]) -> Result<(), StorageError> {
        if !categories.iter().any(Category::is_uncategorized) {
            self.categories.save(Category::uncategorized())?;
        }

        for category in categories {
            self.categories.save(category.clone())?;
        }

        Ok(())
    }
}
