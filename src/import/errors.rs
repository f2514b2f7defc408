use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{DateRange, ModelError};
use crate::ports::ProviderError;
use crate::storage::StorageError;
use crate::types::AccountId;

#[derive(Debug, Error, PartialEq)]
pub enum ImportError {
    #[error("Invalid date range {start} to {end}: {reason}")]
    InvalidDateRange {
        start: NaiveDate,
        end: NaiveDate,
        reason: String
    },
    #[error("Bank API error for account [{account_id}]: {source}")]
    BankApi {
        account_id: AccountId,
        source: ProviderError
    },
    #[error("No transactions found for account [{account_id}] from {range}")]
    NoTransactionsFound {
        account_id: AccountId,
        range: DateRange
    },
    #[error("Storage failure during import: {0}")]
    Storage(#[from] StorageError),
    #[error("{0}")]
    Model(#[from] ModelError)
}

impl ImportError {
    pub fn invalid_date_range(start: NaiveDate, end: NaiveDate, reason: impl Into<String>) -> Self {
        Self::InvalidDateRange {
            start,
            end,
            reason: reason.into()
        }
    }

    pub fn bank_api(account_id: &str, source: ProviderError) -> Self {
        Self::BankApi {
            account_id: account_id.to_string(),
            source
        }
    }

    pub fn no_transactions_found(account_id: &str, range: DateRange) -> Self {
        Self::NoTransactionsFound {
            account_id: account_id.to_string(),
            range
        }
    }
}
