use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::models::{Transaction, TransactionFingerprint, TransactionId};
use crate::storage::{StorageError, TransactionFilter, TransactionRepository};
use crate::types::AccountId;

type FingerprintKey = (AccountId, TransactionFingerprint);

pub struct TransactionStorage {
    transactions: DashMap<TransactionId, Transaction>,
    /// Identity fingerprint index, the uniqueness constraint for imports.
    fingerprints: DashMap<FingerprintKey, TransactionId>,
    /// Content fingerprint index, first transaction seen with those facts.
    contents: DashMap<FingerprintKey, TransactionId>
}

impl TransactionStorage {
    pub fn new() -> Self {
        Self {
            transactions: DashMap::new(),
            fingerprints: DashMap::new(),
            contents: DashMap::new()
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl Default for TransactionStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionRepository for TransactionStorage {
    fn insert_if_absent(&self, transaction: Transaction) -> Result<bool, StorageError> {
        let account_id = transaction.account_id().to_string();

        //NOTE: The vacant entry holds the shard lock for this fingerprint until the insert is done,
        //      so two concurrent imports of the same record cannot both get here.
        match self.fingerprints.entry((account_id.clone(), transaction.fingerprint())) {
            Entry::Occupied(_) => Ok(false),
            Entry::Vacant(entry) => {
                let transaction_id = transaction.id.clone();

                self.contents
                    .entry((account_id, transaction.content_fingerprint()))
                    .or_insert_with(|| transaction_id.clone());
                self.transactions.insert(transaction_id.clone(), transaction);
                entry.insert(transaction_id);

                Ok(true)
            }
        }
    }

    fn load(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>, StorageError> {
        Ok(self.transactions.get(transaction_id).map(|entry| entry.value().clone()))
    }

    fn find_by_fingerprint(&self, account_id: &str, fingerprint: &TransactionFingerprint) -> Result<Option<TransactionId>, StorageError> {
        let key = (account_id.to_string(), fingerprint.clone());
        Ok(self.fingerprints.get(&key).map(|entry| entry.value().clone()))
    }

    fn find_by_content(&self, account_id: &str, fingerprint: &TransactionFingerprint) -> Result<Option<TransactionId>, StorageError> {
        let key = (account_id.to_string(), fingerprint.clone());
        Ok(self.contents.get(&key).map(|entry| entry.value().clone()))
    }

    fn find(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>, StorageError> {
        let mut transactions: Vec<Transaction> = self.transactions.iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        transactions.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

        Ok(transactions)
    }

    fn remove(&self, transaction_id: &TransactionId) -> Result<Option<Transaction>, StorageError> {
        let Some((_, transaction)) = self.transactions.remove(transaction_id) else {
            return Ok(None);
        };

        let account_id = transaction.account_id().to_string();

        self.fingerprints.remove_if(&(account_id.clone(), transaction.fingerprint()), |_, owner| owner == transaction_id);
        self.contents.remove_if(&(account_id, transaction.content_fingerprint()), |_, owner| owner == transaction_id);

        Ok(Some(transaction))
    }
}
