mod sinks;

use serde::Serialize;

use crate::models::{ImportBatchId, TransactionFingerprint, TransactionId};
use crate::types::{AccountId, CategoryId, ConfidenceScore, ExternalId};

pub use sinks::{ChannelEventSink, TracingEventSink};

/// Notification emitted after the state change it describes has been stored.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event")]
pub enum Event {
    ImportCompleted {
        batch_id: ImportBatchId,
        account_id: AccountId,
        count: usize,
        duplicates: usize
    },
    DuplicateTransactionDetected {
        transaction_id: TransactionId,
        fingerprint: TransactionFingerprint,
        batch_id: ImportBatchId
    },
    TransactionsCategorized {
        categorized_count: usize,
        failed_count: usize,
        average_confidence: Option<ConfidenceScore>
    },
    CategoryUpdated {
        transaction_id: TransactionId,
        category_id: CategoryId
    },
    TransactionSubmitted {
        transaction_id: TransactionId,
        external_id: ExternalId
    },
    TransactionsSubmitted {
        count: usize,
        transaction_ids: Vec<TransactionId>
    },
    SubmissionFailed {
        failed_count: usize,
        reasons: Vec<String>
    }
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ImportCompleted { .. } => "ImportCompleted",
            Event::DuplicateTransactionDetected { .. } => "DuplicateTransactionDetected",
            Event::TransactionsCategorized { .. } => "TransactionsCategorized",
            Event::CategoryUpdated { .. } => "CategoryUpdated",
            Event::TransactionSubmitted { .. } => "TransactionSubmitted",
            Event::TransactionsSubmitted { .. } => "TransactionsSubmitted",
            Event::SubmissionFailed { .. } => "SubmissionFailed"
        }
    }
}

/// Receiver of workflow events. Called synchronously, so implementations must not block.
pub trait EventSink: Send + Sync + 'static {
    fn publish(&self, event: Event);
}
