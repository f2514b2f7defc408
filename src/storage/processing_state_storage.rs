use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};

use crate::models::{TransactionId, TransactionProcessingState, TransactionStatus};
use crate::storage::{ProcessingStateRepository, StorageError};

pub struct ProcessingStateStorage {
    states: DashMap<TransactionId, TransactionProcessingState>,
    /// Transactions currently being sent to the ledger.
    submissions: DashSet<TransactionId>
}

impl ProcessingStateStorage {
    pub fn new() -> Self {
        Self {
            states: DashMap::new(),
            submissions: DashSet::new()
        }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

impl Default for ProcessingStateStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessingStateRepository for ProcessingStateStorage {
    fn save(&self, state: TransactionProcessingState) -> Result<(), StorageError> {
        match self.states.entry(state.transaction_id.clone()) {
            Entry::Vacant(entry) => {
                entry.insert(state);
            },
            Entry::Occupied(mut entry) => {
                let current = entry.get();

                if state.status() < current.status() {
                    return Err(StorageError::StatusRegression {
                        transaction_id: state.transaction_id.clone(),
                        current: current.status(),
                        attempted: state.status()
                    });
                }

                if current.status() == TransactionStatus::Submitted && current.external_id() != state.external_id() {
                    return Err(StorageError::AlreadySubmitted {
                        transaction_id: state.transaction_id.clone(),
                        external_id: current.external_id().unwrap_or_default().to_string()
                    });
                }

                entry.insert(state);
            }
        }

        Ok(())
    }

    fn load(&self, transaction_id: &TransactionId) -> Result<Option<TransactionProcessingState>, StorageError> {
        Ok(self.states.get(transaction_id).map(|entry| entry.value().clone()))
    }

    fn find_all(&self, account_id: Option<&str>) -> Result<Vec<TransactionProcessingState>, StorageError> {
        let mut states: Vec<TransactionProcessingState> = self.states.iter()
            .filter(|entry| account_id.is_none_or(|account_id| entry.value().account_id() == account_id))
            .map(|entry| entry.value().clone())
            .collect();

        states.sort_by(|a, b| a.transaction_id.cmp(&b.transaction_id));

        Ok(states)
    }

    fn claim_submission(&self, transaction_id: &TransactionId) -> Result<bool, StorageError> {
        Ok(self.submissions.insert(transaction_id.clone()))
    }

    fn release_submission(&self, transaction_id: &TransactionId) -> Result<(), StorageError> {
        self.submissions.remove(transaction_id);
        Ok(())
    }
}
