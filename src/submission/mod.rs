mod errors;
mod service;
mod statistics;

use std::fmt;
use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::models::{TransactionId, TransactionProcessingState, TransactionStatus};
use crate::types::ExternalId;

pub use errors::SubmissionError;
pub use service::SubmissionService;
pub use statistics::SubmissionStatistics;

/// Why a processing state cannot be sent to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum IneligibilityReason {
    InvalidStatus(TransactionStatus),
    MissingCategory,
    MissingPayee,
    AlreadySubmitted {
        external_id: ExternalId
    },
    SubmissionInProgress
}

impl Display for IneligibilityReason {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            IneligibilityReason::InvalidStatus(status) => write!(formatter, "Invalid status: {status}"),
            IneligibilityReason::MissingCategory => write!(formatter, "Missing category"),
            IneligibilityReason::MissingPayee => write!(formatter, "Missing payee name"),
            IneligibilityReason::AlreadySubmitted { external_id } => write!(formatter, "Already submitted as {external_id}"),
            IneligibilityReason::SubmissionInProgress => write!(formatter, "Submission already in progress")
        }
    }
}

/// What the ledger needs from an eligible state.
pub(crate) struct EligibleSubmission {
    pub category_id: String,
    pub payee: String,
    pub memo: Option<String>
}

pub(crate) fn eligible_submission(state: &TransactionProcessingState) -> Result<EligibleSubmission, IneligibilityReason> {
    match state.status() {
        TransactionStatus::Categorized => {},
        TransactionStatus::Submitted => {
            return Err(IneligibilityReason::AlreadySubmitted {
                external_id: state.external_id().unwrap_or_default().to_string()
            });
        },
        status => return Err(IneligibilityReason::InvalidStatus(status))
    }

    let category_id = state.effective_category_id().ok_or(IneligibilityReason::MissingCategory)?;
    let payee = state.effective_payee().ok_or(IneligibilityReason::MissingPayee)?;

    Ok(EligibleSubmission {
        category_id: category_id.to_string(),
        payee: payee.to_string(),
        memo: state.effective_memo().map(str::to_string)
    })
}

/// Checks a state against the submission rules: categorized, with a category and a payee.
pub fn check_eligibility(state: &TransactionProcessingState) -> Result<(), IneligibilityReason> {
    eligible_submission(state).map(|_| ())
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionValidation {
    pub valid: Vec<TransactionProcessingState>,
    pub invalid: Vec<(TransactionProcessingState, IneligibilityReason)>
}

/// Splits states into the ones that can be submitted and the ones that cannot, with the reason.
pub fn validate_for_submission(states: Vec<TransactionProcessingState>) -> SubmissionValidation {
    let mut validation = SubmissionValidation::default();

    for state in states {
        match check_eligibility(&state) {
            Ok(()) => validation.valid.push(state),
            Err(reason) => validation.invalid.push((state, reason))
        }
    }

    validation
}

/// Outcome of submitting one transaction.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionSubmissionResult {
    pub transaction_id: TransactionId,
    pub external_id: Option<ExternalId>,
    pub error: Option<SubmissionError>
}

impl TransactionSubmissionResult {
    pub fn success(transaction_id: TransactionId, external_id: ExternalId) -> Self {
        Self {
            transaction_id,
            external_id: Some(external_id),
            error: None
        }
    }

    pub fn failure(transaction_id: TransactionId, error: SubmissionError) -> Self {
        Self {
            transaction_id,
            external_id: None,
            error: Some(error)
        }
    }

    pub fn is_submitted(&self) -> bool {
        self.error.is_none() && self.external_id.is_some()
    }
}

/// Outcome of a bulk submission. `errors` holds the failed results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubmissionResult {
    pub submitted_count: usize,
    pub failed_count: usize,
    pub submitted: Vec<TransactionSubmissionResult>,
    pub errors: Vec<TransactionSubmissionResult>
}
