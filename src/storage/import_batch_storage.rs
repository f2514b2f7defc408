use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::models::{ImportBatch, ImportBatchId};
use crate::storage::{ImportBatchRepository, StorageError};
use crate::types::AccountId;

pub struct ImportBatchStorage {
    batches: DashMap<ImportBatchId, ImportBatch>,
    /// Highest sequence number handed out or stored per account.
    sequences: DashMap<AccountId, u64>
}

impl ImportBatchStorage {
    pub fn new() -> Self {
        Self {
            batches: DashMap::new(),
            sequences: DashMap::new()
        }
    }
}

impl Default for ImportBatchStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ImportBatchRepository for ImportBatchStorage {
    fn next_sequence(&self, account_id: &str) -> Result<u64, StorageError> {
        let mut counter = self.sequences.entry(account_id.to_string()).or_insert(0);
        *counter += 1;

        Ok(*counter)
    }

    fn save(&self, batch: ImportBatch) -> Result<(), StorageError> {
        let sequence = batch.id.sequence();
        let account_id = batch.account_id().to_string();

        match self.batches.entry(batch.id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(batch);
            },
            Entry::Occupied(mut entry) => {
                let status = entry.get().status();

                if status.is_final() {
                    return Err(StorageError::BatchFinalized {
                        batch_id: batch.id.clone(),
                        status
                    });
                }

                entry.insert(batch);
            }
        }

        //NOTE: Batches saved with explicit ids must never be handed out again by next_sequence
        self.sequences.entry(account_id)
            .and_modify(|counter| *counter = (*counter).max(sequence))
            .or_insert(sequence);

        Ok(())
    }

    fn load(&self, batch_id: &ImportBatchId) -> Result<Option<ImportBatch>, StorageError> {
        Ok(self.batches.get(batch_id).map(|entry| entry.value().clone()))
    }

    fn find_by_account(&self, account_id: &str) -> Result<Vec<ImportBatch>, StorageError> {
        let mut batches: Vec<ImportBatch> = self.batches.iter()
            .filter(|entry| entry.value().account_id() == account_id)
            .map(|entry| entry.value().clone())
            .collect();

        batches.sort_by_key(|batch| batch.id.sequence());

        Ok(batches)
    }
}
