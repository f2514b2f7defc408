use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ModelError, TransactionId, TransactionStatus};
use crate::types::{CategoryId, ConfidenceScore, ExternalId};

/// What a categorization strategy proposed for a transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySuggestion {
    pub category_id: CategoryId,
    pub confidence: Option<ConfidenceScore>,
    pub reasoning: Option<String>,
    pub payee: Option<String>,
    pub memo: Option<String>
}

/// Mutable workflow record of a transaction.
///
/// Fields are only changed through the transition methods, which keep the status moving
/// forward along `Imported -> Categorized -> Submitted` and leave suggested values untouched
/// when a user override is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransactionProcessingState {
    pub transaction_id: TransactionId,
    status: TransactionStatus,
    suggested_category_id: Option<CategoryId>,
    suggested_payee: Option<String>,
    suggested_memo: Option<String>,
    confidence: Option<ConfidenceScore>,
    reasoning: Option<String>,
    override_category_id: Option<CategoryId>,
    override_payee: Option<String>,
    override_memo: Option<String>,
    external_id: Option<ExternalId>,
    duplicate_of: Option<TransactionId>,
    updated_at: DateTime<Utc>
}

impl TransactionProcessingState {
    pub fn new(transaction_id: TransactionId, now: DateTime<Utc>) -> Self {
        Self {
            transaction_id,
            status: TransactionStatus::Imported,
            suggested_category_id: None,
            suggested_payee: None,
            suggested_memo: None,
            confidence: None,
            reasoning: None,
            override_category_id: None,
            override_payee: None,
            override_memo: None,
            external_id: None,
            duplicate_of: None,
            updated_at: now
        }
    }

    /// Flags the state as a suspected duplicate of another stored transaction.
    pub fn with_duplicate_of(mut self, duplicate_of: Option<TransactionId>) -> Self {
        self.duplicate_of = duplicate_of;
        self
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    pub fn account_id(&self) -> &str {
        self.transaction_id.account_id()
    }

    pub fn suggested_category_id(&self) -> Option<&str> {
        self.suggested_category_id.as_deref()
    }

    pub fn suggested_payee(&self) -> Option<&str> {
        self.suggested_payee.as_deref()
    }

    pub fn suggested_memo(&self) -> Option<&str> {
        self.suggested_memo.as_deref()
    }

    pub fn confidence(&self) -> Option<ConfidenceScore> {
        self.confidence
    }

    pub fn reasoning(&self) -> Option<&str> {
        self.reasoning.as_deref()
    }

    pub fn override_category_id(&self) -> Option<&str> {
        self.override_category_id.as_deref()
    }

    pub fn override_payee(&self) -> Option<&str> {
        self.override_payee.as_deref()
    }

    pub fn override_memo(&self) -> Option<&str> {
        self.override_memo.as_deref()
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn duplicate_of(&self) -> Option<&TransactionId> {
        self.duplicate_of.as_ref()
    }

    pub fn is_duplicate(&self) -> bool {
        self.duplicate_of.is_some()
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn effective_category_id(&self) -> Option<&str> {
        self.override_category_id().or(self.suggested_category_id())
    }

    pub fn effective_payee(&self) -> Option<&str> {
        self.override_payee().or(self.suggested_payee())
    }

    pub fn effective_memo(&self) -> Option<&str> {
        self.override_memo().or(self.suggested_memo())
    }

    /// Records a suggestion and moves the state to `Categorized`.
    ///
    /// # Errors
    /// Returns `ModelError::AlreadySubmitted` once the transaction reached the ledger.
    pub fn categorize(&mut self, suggestion: CategorySuggestion, now: DateTime<Utc>) -> Result<(), ModelError> {
        if self.status == TransactionStatus::Submitted {
            return Err(ModelError::already_submitted(self));
        }

        self.suggested_category_id = Some(suggestion.category_id);
        self.suggested_payee = clean(suggestion.payee.as_deref());
        self.suggested_memo = clean(suggestion.memo.as_deref());
        self.confidence = suggestion.confidence;
        self.reasoning = suggestion.reasoning;
        self.status = TransactionStatus::Categorized;
        self.updated_at = now;

        Ok(())
    }

    /// Applies a manual override on top of the suggested values.
    ///
    /// `None` keeps the current payee/memo override and a blank value clears it. Returns
    /// whether anything changed, so re-applying the same override leaves the state untouched.
    ///
    /// # Errors
    /// Returns `ModelError::AlreadySubmitted` once the transaction reached the ledger.
    pub fn apply_override(&mut self, category_id: &str, payee: Option<&str>, memo: Option<&str>, now: DateTime<Utc>) -> Result<bool, ModelError> {
        if self.status == TransactionStatus::Submitted {
            return Err(ModelError::already_submitted(self));
        }

        let mut next = self.clone();
        next.override_category_id = clean(Some(category_id));

        if payee.is_some() {
            next.override_payee = clean(payee);
        }

        if memo.is_some() {
            next.override_memo = clean(memo);
        }

        if next.status == TransactionStatus::Imported {
            next.status = TransactionStatus::Categorized;
        }

        if next == *self {
            return Ok(false);
        }

        next.updated_at = now;
        *self = next;

        Ok(true)
    }

    /// Marks the transaction as accepted by the external ledger.
    ///
    /// # Errors
    /// Only a `Categorized` state can be submitted; `Imported` is an invalid transition and
    /// `Submitted` is reported as `ModelError::AlreadySubmitted`.
    pub fn mark_submitted(&mut self, external_id: &str, now: DateTime<Utc>) -> Result<(), ModelError> {
        match self.status {
            TransactionStatus::Categorized => {
                self.external_id = Some(external_id.to_string());
                self.status = TransactionStatus::Submitted;
                self.updated_at = now;

                Ok(())
            },
            TransactionStatus::Submitted => Err(ModelError::already_submitted(self)),
            TransactionStatus::Imported => Err(ModelError::invalid_transition(self, TransactionStatus::Submitted))
        }
    }
}

fn clean(value: Option<&str>) -> Option<String> {
    value.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}
