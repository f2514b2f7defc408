mod account;
mod category;
mod errors;
mod fingerprint;
mod import_batch;
mod processing_state;
#[cfg(test)]
mod tests;
mod transaction;

use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

pub use account::SourceAccount;
pub use category::Category;
pub use errors::ModelError;
pub use fingerprint::TransactionFingerprint;
pub use import_batch::{DateRange, ImportBatch, ImportBatchId};
pub use processing_state::{CategorySuggestion, TransactionProcessingState};
pub use transaction::{RawTransaction, Transaction, TransactionId};

/// Workflow stage of a transaction. The ordering is the only allowed direction of travel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum TransactionStatus {
    Imported,
    Categorized,
    Submitted
}

impl Display for TransactionStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransactionStatus::Imported => "Imported",
            TransactionStatus::Categorized => "Categorized",
            TransactionStatus::Submitted => "Submitted"
        };

        write!(formatter, "{name}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ImportStatus {
    NotStarted,
    InProgress,
    Completed,
    Failed
}

impl ImportStatus {
    pub fn is_final(self) -> bool {
        matches!(self, ImportStatus::Completed | ImportStatus::Failed)
    }
}
