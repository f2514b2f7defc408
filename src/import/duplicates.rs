use std::sync::Arc;

use crate::models::{Transaction, TransactionId};
use crate::storage::{StorageError, TransactionRepository};

/// Looks up already imported transactions by fingerprint.
///
/// The lookups are advisory. Two imports racing on the same record are settled by
/// `TransactionRepository::insert_if_absent`.
#[derive(Clone)]
pub struct DuplicateDetector {
    transactions: Arc<dyn TransactionRepository>
}

impl DuplicateDetector {
    pub fn new(transactions: Arc<dyn TransactionRepository>) -> Self {
        Self { transactions }
    }

    pub fn is_duplicate(&self, transaction: &Transaction) -> Result<bool, StorageError> {
        let existing = self.transactions.find_by_fingerprint(transaction.account_id(), &transaction.fingerprint())?;
        Ok(existing.is_some())
    }

    /// Another stored transaction with the same date, amount, counterparty and description,
    /// but a different provider id.
    pub fn suspected_duplicate_of(&self, transaction: &Transaction) -> Result<Option<TransactionId>, StorageError> {
        let existing = self.transactions.find_by_content(transaction.account_id(), &transaction.content_fingerprint())?;
        Ok(existing.filter(|transaction_id| *transaction_id != transaction.id))
    }
}
