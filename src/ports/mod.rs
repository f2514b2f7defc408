mod csv_statement;
mod errors;
mod rule_categorizer;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::models::{Category, CategorySuggestion, DateRange, RawTransaction, SourceAccount, Transaction};
use crate::types::{CategoryId, ExternalId};

pub use csv_statement::CsvStatementProvider;
pub use errors::ProviderError;
pub use rule_categorizer::{CategoryRule, RuleCategorizer};

/// Source of raw bank transactions.
pub trait TransactionProvider: Send + Sync + 'static {
    fn fetch_transactions(&self, account: &SourceAccount, range: DateRange) -> impl Future<Output = Result<Vec<RawTransaction>, ProviderError>> + Send;
}

/// Categorization capability. `Ok(None)` means it had no suggestion for the transaction.
pub trait CategorizationProvider: Send + Sync + 'static {
    fn suggest_category(&self, transaction: &Transaction, categories: &[Category]) -> impl Future<Output = Result<Option<CategorySuggestion>, ProviderError>> + Send;
}

/// External ledger transactions are submitted to.
pub trait SubmissionProvider: Send + Sync + 'static {
    fn submit(&self, transaction: &Transaction, request: &SubmissionRequest) -> impl Future<Output = Result<SubmissionReceipt, ProviderError>> + Send;
}

/// Effective categorization sent along with a transaction to the ledger.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionRequest {
    pub category_id: CategoryId,
    /// Id of the category in the ledger, when the category is mapped.
    pub ledger_category_id: Option<String>,
    pub payee: String,
    pub memo: Option<String>
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub external_id: ExternalId
}

/// Runs a port call with a deadline. Running out of time is reported like any other provider
/// failure so callers handle both the same way.
pub async fn with_timeout<T, F>(duration: Duration, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    match timeout(duration, call).await {
        Ok(result) => result,
        Err(_) => Err(ProviderError::Timeout(duration))
    }
}
