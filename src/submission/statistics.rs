use serde::Serialize;

use crate::models::{TransactionProcessingState, TransactionStatus};

/// Counts of processing states per workflow stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SubmissionStatistics {
    pub total: usize,
    pub imported: usize,
    pub categorized: usize,
    pub submitted: usize,
    /// States flagged as suspected duplicates of another transaction.
    pub flagged_duplicates: usize
}

impl SubmissionStatistics {
    pub fn from_states<'a>(states: impl IntoIterator<Item = &'a TransactionProcessingState>) -> Self {
        states.into_iter().fold(Self::default(), |mut statistics, state| {
            statistics.total += 1;

            match state.status() {
                TransactionStatus::Imported => statistics.imported += 1,
                TransactionStatus::Categorized => statistics.categorized += 1,
                TransactionStatus::Submitted => statistics.submitted += 1
            }

            if state.is_duplicate() {
                statistics.flagged_duplicates += 1;
            }

            statistics
        })
    }
}
