use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::categorization::{Categorization, CategorizationError, CategorizationFailure, CategorizationSummary};
use crate::config::SyncConfig;
use crate::events::{Event, EventSink};
use crate::models::{Category, CategorySuggestion, Transaction, TransactionId, TransactionProcessingState, TransactionStatus};
use crate::ports::{with_timeout, CategorizationProvider};
use crate::storage::{Repositories, TransactionFilter};
use crate::types::ConfidenceScore;

const NOT_FOUND_REASON: &str = "Transaction not found";

/// Mean confidence over the categorizations that carry one.
pub fn average_confidence(categorizations: &[Categorization]) -> Option<ConfidenceScore> {
    ConfidenceScore::mean(categorizations.iter().filter_map(|categorization| categorization.confidence))
}

/// Assigns categories to imported transactions, through the provider or by hand.
pub struct CategorizationService<C: CategorizationProvider> {
    provider: Arc<C>,
    repositories: Repositories,
    events: Arc<dyn EventSink>,
    config: Arc<SyncConfig>
}

impl<C: CategorizationProvider> Clone for CategorizationService<C> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            repositories: self.repositories.clone(),
            events: self.events.clone(),
            config: self.config.clone()
        }
    }
}

impl<C: CategorizationProvider> CategorizationService<C> {
    pub fn new(provider: Arc<C>, repositories: Repositories, events: Arc<dyn EventSink>, config: Arc<SyncConfig>) -> Self {
        Self {
            provider,
            repositories,
            events,
            config
        }
    }

    /// Asks the provider for a category and records it as the suggestion.
    ///
    /// Returns `Ok(None)` when the transaction or its processing state does not exist. A
    /// provider without a suggestion leaves the transaction `Uncategorized`.
    pub async fn categorize_transaction(&self, transaction_id: &TransactionId) -> Result<Option<Categorization>, CategorizationError> {
        let Some(transaction) = self.repositories.transactions.load(transaction_id)? else {
            return Ok(None);
        };

        let Some(mut state) = self.repositories.states.load(transaction_id)? else {
            return Ok(None);
        };

        if state.status() == TransactionStatus::Submitted {
            return Err(CategorizationError::already_submitted(&state));
        }

        let categories = self.repositories.categories.find_all()?;

        let suggestion = with_timeout(self.config.port_timeout(), self.provider.suggest_category(&transaction, &categories))
            .await
            .map_err(|source| CategorizationError::provider(transaction_id, source))?;

        let suggestion = complete_suggestion(suggestion, &transaction);
        state.categorize(suggestion, Utc::now())?;
        self.repositories.states.save(state.clone())?;

        let categorization = Categorization::from_state(&state);

        debug!(
            "Transaction [{transaction_id}] categorized as [{}] with confidence {}",
            categorization.category_id,
            categorization.confidence.map_or_else(|| "n/a".to_string(), |confidence| confidence.to_string())
        );

        Ok(Some(categorization))
    }

    /// Categorizes each transaction independently. A failure is recorded with its reason
    /// and never stops the rest of the run.
    pub async fn categorize_transactions(&self, transaction_ids: &[TransactionId]) -> CategorizationSummary {
        let mut summary = CategorizationSummary::default();

        for transaction_id in transaction_ids {
            let reason = match self.categorize_transaction(transaction_id).await {
                Ok(Some(categorization)) => {
                    summary.categorizations.push(categorization);
                    continue;
                },
                Ok(None) => NOT_FOUND_REASON.to_string(),
                Err(error) => error.to_string()
            };

            warn!("Transaction [{transaction_id}] was not categorized: {reason}");

            summary.failures.push(CategorizationFailure {
                transaction_id: transaction_id.clone(),
                reason
            });
        }

        summary.categorized_count = summary.categorizations.len();
        summary.failed_count = summary.failures.len();

        info!("Categorized {} transactions, {} failed", summary.categorized_count, summary.failed_count);

        if summary.categorized_count > 0 {
            self.events.publish(Event::TransactionsCategorized {
                categorized_count: summary.categorized_count,
                failed_count: summary.failed_count,
                average_confidence: average_confidence(&summary.categorizations)
            });
        }

        summary
    }

    /// Categorizes every transaction still in `Imported`, optionally for one account only.
    pub async fn categorize_pending(&self, account_id: Option<&str>) -> Result<CategorizationSummary, CategorizationError> {
        let pending: Vec<TransactionId> = self.repositories.states.find_all(account_id)?
            .into_iter()
            .filter(|state| state.status() == TransactionStatus::Imported)
            .map(|state| state.transaction_id)
            .collect();

        Ok(self.categorize_transactions(&pending).await)
    }

    /// Sets a manual category, and optionally payee and memo, on top of the suggestion.
    ///
    /// Re-applying the same values is a no-op and publishes nothing. Returns `Ok(None)` when
    /// the transaction has no processing state.
    pub fn update_category(&self, transaction_id: &TransactionId, category_id: &str, memo: Option<&str>, payee: Option<&str>) -> Result<Option<TransactionProcessingState>, CategorizationError> {
        self.ensure_category_exists(category_id)?;

        let Some(mut state) = self.repositories.states.load(transaction_id)? else {
            return Ok(None);
        };

        if state.status() == TransactionStatus::Submitted {
            return Err(CategorizationError::already_submitted(&state));
        }

        if state.apply_override(category_id, payee, memo, Utc::now())? {
            self.repositories.states.save(state.clone())?;

            info!("Transaction [{transaction_id}] manually set to category [{category_id}]");

            self.events.publish(Event::CategoryUpdated {
                transaction_id: transaction_id.clone(),
                category_id: category_id.to_string()
            });
        }

        Ok(Some(state))
    }

    /// Sets the category on every matching transaction that has not been submitted yet.
    /// Returns how many states actually changed.
    pub fn bulk_update_category(&self, filter: &TransactionFilter, category_id: &str) -> Result<usize, CategorizationError> {
        self.ensure_category_exists(category_id)?;

        let mut updated = 0;

        for transaction in self.repositories.transactions.find(filter)? {
            let Some(mut state) = self.repositories.states.load(&transaction.id)? else {
                continue;
            };

            if state.status() == TransactionStatus::Submitted {
                debug!("Transaction [{}] already submitted, leaving it out of the bulk update", transaction.id);
                continue;
            }

            if state.apply_override(category_id, None, None, Utc::now())? {
                self.repositories.states.save(state)?;

                self.events.publish(Event::CategoryUpdated {
                    transaction_id: transaction.id.clone(),
                    category_id: category_id.to_string()
                });

                updated += 1;
            }
        }

        info!("Bulk update set category [{category_id}] on {updated} transactions");

        Ok(updated)
    }

    /// The default `uncategorized` label is always accepted, stored or not.
    fn ensure_category_exists(&self, category_id: &str) -> Result<Category, CategorizationError> {
        if let Some(category) = self.repositories.categories.load(category_id)? {
            return Ok(category);
        }

        Some(Category::uncategorized())
            .filter(|fallback| fallback.id == category_id)
            .ok_or_else(|| CategorizationError::category_not_found(category_id))
    }
}

/// Fills what the provider left out: no suggestion means uncategorized, payee falls back to
/// the counterparty and memo to the description.
fn complete_suggestion(suggestion: Option<CategorySuggestion>, transaction: &Transaction) -> CategorySuggestion {
    let suggestion = suggestion.unwrap_or_else(|| CategorySuggestion {
        category_id: Category::uncategorized().id,
        confidence: None,
        reasoning: None,
        payee: None,
        memo: None
    });

    CategorySuggestion {
        payee: suggestion.payee.or_else(|| transaction.counterparty_name.clone()),
        memo: suggestion.memo.or_else(|| Some(transaction.description.clone())),
        ..suggestion
    }
}
