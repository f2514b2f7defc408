use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{ImportBatchId, ImportStatus, TransactionId, TransactionProcessingState, TransactionStatus};
use crate::types::{AccountId, ExternalId, MoneyError};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    #[error("Account reference must not be empty")]
    EmptyAccountId,
    #[error("Provider transaction id must not be empty for account [{account_id}]")]
    EmptyProviderId {
        account_id: AccountId
    },
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] MoneyError),
    #[error("Date range start [{start}] is after its end [{end}]")]
    InvertedDateRange {
        start: NaiveDate,
        end: NaiveDate
    },
    #[error("Transaction [{transaction_id}] cannot move from [{from}] to [{to}]")]
    InvalidTransition {
        transaction_id: TransactionId,
        from: TransactionStatus,
        to: TransactionStatus
    },
    #[error("Transaction [{transaction_id}] was already submitted as [{external_id}]")]
    AlreadySubmitted {
        transaction_id: TransactionId,
        external_id: ExternalId
    },
    #[error("Import batch [{batch_id}] is already {status:?}")]
    BatchFinalized {
        batch_id: ImportBatchId,
        status: ImportStatus
    }
}

impl ModelError {
    pub fn empty_provider_id(account_id: &str) -> Self {
        Self::EmptyProviderId { account_id: account_id.to_string() }
    }

    pub fn invalid_transition(state: &TransactionProcessingState, to: TransactionStatus) -> Self {
        Self::InvalidTransition {
            transaction_id: state.transaction_id.clone(),
            from: state.status(),
            to
        }
    }

    pub fn already_submitted(state: &TransactionProcessingState) -> Self {
        Self::AlreadySubmitted {
            transaction_id: state.transaction_id.clone(),
            external_id: state.external_id().unwrap_or_default().to_string()
        }
    }

    pub fn batch_finalized(batch_id: &ImportBatchId, status: ImportStatus) -> Self {
        Self::BatchFinalized {
            batch_id: batch_id.clone(),
            status
        }
    }
}
