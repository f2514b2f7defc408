use thiserror::Error;

use crate::models::{ModelError, TransactionId, TransactionProcessingState};
use crate::ports::ProviderError;
use crate::storage::StorageError;
use crate::types::{CategoryId, ExternalId};

#[derive(Debug, Error, PartialEq)]
pub enum CategorizationError {
    #[error("Categorization of transaction [{transaction_id}] failed: {source}")]
    Provider {
        transaction_id: TransactionId,
        source: ProviderError
    },
    #[error("Category [{0}] does not exist")]
    CategoryNotFound(CategoryId),
    #[error("Transaction [{transaction_id}] was already submitted as [{external_id}] and can no longer change")]
    AlreadySubmitted {
        transaction_id: TransactionId,
        external_id: ExternalId
    },
    #[error("Storage failure during categorization: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Model(#[from] ModelError)
}

impl CategorizationError {
    pub fn provider(transaction_id: &TransactionId, source: ProviderError) -> Self {
        Self::Provider {
            transaction_id: transaction_id.clone(),
            source
        }
    }

    pub fn category_not_found(category_id: &str) -> Self {
        Self::CategoryNotFound(category_id.to_string())
    }

    pub fn already_submitted(state: &TransactionProcessingState) -> Self {
        Self::AlreadySubmitted {
            transaction_id: state.transaction_id.clone(),
            external_id: state.external_id().unwrap_or_default().to_string()
        }
    }
}
