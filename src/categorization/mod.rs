mod errors;
mod service;

use serde::Serialize;

use crate::models::{TransactionId, TransactionProcessingState};
use crate::types::{CategoryId, ConfidenceScore};

pub use errors::CategorizationError;
pub use service::{average_confidence, CategorizationService};

/// Outcome of categorizing a single transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Categorization {
    pub transaction_id: TransactionId,
    pub category_id: CategoryId,
    pub confidence: Option<ConfidenceScore>,
    pub reasoning: Option<String>,
    pub payee: Option<String>,
    pub memo: Option<String>
}

impl Categorization {
    fn from_state(state: &TransactionProcessingState) -> Self {
        Self {
            transaction_id: state.transaction_id.clone(),
            category_id: state.suggested_category_id().unwrap_or_default().to_string(),
            confidence: state.confidence(),
            reasoning: state.reasoning().map(str::to_string),
            payee: state.suggested_payee().map(str::to_string),
            memo: state.suggested_memo().map(str::to_string)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorizationFailure {
    pub transaction_id: TransactionId,
    pub reason: String
}

/// Per-item outcome of a bulk categorization.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CategorizationSummary {
    pub categorized_count: usize,
    pub failed_count: usize,
    pub categorizations: Vec<Categorization>,
    pub failures: Vec<CategorizationFailure>
}
