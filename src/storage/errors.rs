use thiserror::Error;

use crate::models::{ImportBatchId, ImportStatus, TransactionId, TransactionStatus};
use crate::types::ExternalId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StorageError {
    #[error("Processing state for [{transaction_id}] cannot move back from [{current}] to [{attempted}]")]
    StatusRegression {
        transaction_id: TransactionId,
        current: TransactionStatus,
        attempted: TransactionStatus
    },
    #[error("Transaction [{transaction_id}] is already submitted as [{external_id}]")]
    AlreadySubmitted {
        transaction_id: TransactionId,
        external_id: ExternalId
    },
    #[error("Import batch [{batch_id}] is already {status:?} and cannot be overwritten")]
    BatchFinalized {
        batch_id: ImportBatchId,
        status: ImportStatus
    },
    #[error("Storage backend error: {0}")]
    Backend(String)
}
