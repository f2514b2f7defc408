use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::events::{Event, EventSink};
use crate::models::TransactionId;
use crate::ports::{with_timeout, SubmissionProvider, SubmissionRequest};
use crate::storage::{ProcessingStateRepository, Repositories, StorageError};
use crate::submission::{
    eligible_submission, validate_for_submission, IneligibilityReason, SubmissionError, SubmissionResult,
    SubmissionStatistics, TransactionSubmissionResult
};
use crate::types::ExternalId;

/// Sends categorized transactions to the external ledger, at most once each.
pub struct SubmissionService<S: SubmissionProvider> {
    provider: Arc<S>,
    repositories: Repositories,
    events: Arc<dyn EventSink>,
    config: Arc<SyncConfig>
}

impl<S: SubmissionProvider> Clone for SubmissionService<S> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            repositories: self.repositories.clone(),
            events: self.events.clone(),
            config: self.config.clone()
        }
    }
}

impl<S: SubmissionProvider> SubmissionService<S> {
    pub fn new(provider: Arc<S>, repositories: Repositories, events: Arc<dyn EventSink>, config: Arc<SyncConfig>) -> Self {
        Self {
            provider,
            repositories,
            events,
            config
        }
    }

    /// Submits one transaction. Failures are reported in the result and leave the stored
    /// state as it was.
    pub async fn submit_transaction(&self, transaction_id: &TransactionId) -> TransactionSubmissionResult {
        match self.submit(transaction_id).await {
            Ok(external_id) => TransactionSubmissionResult::success(transaction_id.clone(), external_id),
            Err(submission_error) => {
                warn!("{submission_error}");
                TransactionSubmissionResult::failure(transaction_id.clone(), submission_error)
            }
        }
    }

    /// Validates every transaction first and submits only the eligible ones.
    pub async fn submit_transactions(&self, transaction_ids: &[TransactionId]) -> SubmissionResult {
        let mut result = SubmissionResult::default();
        let mut states = Vec::with_capacity(transaction_ids.len());

        for transaction_id in transaction_ids {
            match self.repositories.states.load(transaction_id) {
                Ok(Some(state)) => states.push(state),
                Ok(None) => result.errors.push(TransactionSubmissionResult::failure(transaction_id.clone(), SubmissionError::NotFound(transaction_id.clone()))),
                Err(storage_error) => result.errors.push(TransactionSubmissionResult::failure(transaction_id.clone(), storage_error.into()))
            }
        }

        let validation = validate_for_submission(states);

        for (state, reason) in validation.invalid {
            debug!("Transaction [{}] left out of submission: {reason}", state.transaction_id);
            let submission_error = SubmissionError::ineligible(&state.transaction_id, reason);
            result.errors.push(TransactionSubmissionResult::failure(state.transaction_id, submission_error));
        }

        for state in validation.valid {
            let outcome = self.submit_transaction(&state.transaction_id).await;

            if outcome.is_submitted() {
                result.submitted.push(outcome);
            } else {
                result.errors.push(outcome);
            }
        }

        result.submitted_count = result.submitted.len();
        result.failed_count = result.errors.len();

        info!("Submitted {} transactions, {} failed", result.submitted_count, result.failed_count);

        if result.submitted_count > 0 {
            self.events.publish(Event::TransactionsSubmitted {
                count: result.submitted_count,
                transaction_ids: result.submitted.iter().map(|outcome| outcome.transaction_id.clone()).collect()
            });
        }

        if result.failed_count > 0 {
            self.events.publish(Event::SubmissionFailed {
                failed_count: result.failed_count,
                reasons: result.errors.iter()
                    .filter_map(|outcome| outcome.error.as_ref())
                    .map(ToString::to_string)
                    .collect()
            });
        }

        result
    }

    pub fn get_submission_statistics(&self, account_id: Option<&str>) -> Result<SubmissionStatistics, SubmissionError> {
        let states = self.repositories.states.find_all(account_id)?;
        Ok(SubmissionStatistics::from_states(&states))
    }

    async fn submit(&self, transaction_id: &TransactionId) -> Result<ExternalId, SubmissionError> {
        //NOTE: The claim lives in the repository so that separate service instances exclude each other too
        let Some(_claim) = SubmissionClaim::acquire(self.repositories.states.clone(), transaction_id)? else {
            return Err(SubmissionError::ineligible(transaction_id, IneligibilityReason::SubmissionInProgress));
        };

        let mut state = self.repositories.states.load(transaction_id)?
            .ok_or_else(|| SubmissionError::NotFound(transaction_id.clone()))?;

        let eligible = eligible_submission(&state)
            .map_err(|reason| SubmissionError::ineligible(transaction_id, reason))?;

        let transaction = self.repositories.transactions.load(transaction_id)?
            .ok_or_else(|| SubmissionError::NotFound(transaction_id.clone()))?;

        let ledger_category_id = self.repositories.categories.load(&eligible.category_id)?
            .and_then(|category| category.ledger_id);

        let request = SubmissionRequest {
            category_id: eligible.category_id,
            ledger_category_id,
            payee: eligible.payee,
            memo: eligible.memo
        };

        let receipt = with_timeout(self.config.port_timeout(), self.provider.submit(&transaction, &request))
            .await
            .map_err(|source| SubmissionError::provider(transaction_id, source))?;

        state.mark_submitted(&receipt.external_id, Utc::now())?;

        if let Err(storage_error) = self.repositories.states.save(state) {
            //NOTE: The ledger already holds the transaction at this point, only a manual fix can reconcile it
            error!("Transaction [{transaction_id}] was submitted as [{}] but its state could not be saved: {storage_error}", receipt.external_id);
            return Err(storage_error.into());
        }

        info!("Transaction [{transaction_id}] submitted as [{}]", receipt.external_id);

        self.events.publish(Event::TransactionSubmitted {
            transaction_id: transaction_id.clone(),
            external_id: receipt.external_id.clone()
        });

        Ok(receipt.external_id)
    }
}

/// Holds the repository's submission reservation for a transaction until dropped.
struct SubmissionClaim {
    states: Arc<dyn ProcessingStateRepository>,
    transaction_id: TransactionId
}

impl SubmissionClaim {
    fn acquire(states: Arc<dyn ProcessingStateRepository>, transaction_id: &TransactionId) -> Result<Option<Self>, StorageError> {
        if !states.claim_submission(transaction_id)? {
            return Ok(None);
        }

        Ok(Some(Self {
            states,
            transaction_id: transaction_id.clone()
        }))
    }
}

impl Drop for SubmissionClaim {
    fn drop(&mut self) {
        if let Err(storage_error) = self.states.release_submission(&self.transaction_id) {
            error!("Unable to release the submission claim on [{}]: {storage_error}", self.transaction_id);
        }
    }
}
