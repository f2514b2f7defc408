use thiserror::Error;

use crate::models::{ModelError, TransactionId};
use crate::ports::ProviderError;
use crate::storage::StorageError;
use crate::submission::IneligibilityReason;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum SubmissionError {
    #[error("Transaction [{0}] not found")]
    NotFound(TransactionId),
    #[error("Transaction [{transaction_id}] cannot be submitted: {reason}")]
    Ineligible {
        transaction_id: TransactionId,
        reason: IneligibilityReason
    },
    #[error("Ledger rejected transaction [{transaction_id}]: {source}")]
    Provider {
        transaction_id: TransactionId,
        source: ProviderError
    },
    #[error("Storage failure during submission: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Model(#[from] ModelError)
}

impl SubmissionError {
    pub fn ineligible(transaction_id: &TransactionId, reason: IneligibilityReason) -> Self {
        Self::Ineligible {
            transaction_id: transaction_id.clone(),
            reason
        }
    }

    pub fn provider(transaction_id: &TransactionId, source: ProviderError) -> Self {
        Self::Provider {
            transaction_id: transaction_id.clone(),
            source
        }
    }

    /// Whether submitting the same transaction again later may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            SubmissionError::Provider { source, .. } => source.is_retryable(),
            SubmissionError::Ineligible { reason, .. } => *reason == IneligibilityReason::SubmissionInProgress,
            _ => false
        }
    }
}
