use std::time::Duration;

use thiserror::Error;

/// Failure reported by an external system (bank, categorizer, ledger).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProviderError {
    #[error("Provider is unavailable: {0}")]
    Unavailable(String),
    #[error("Provider rate limit reached (retry after {retry_after:?})")]
    RateLimited {
        retry_after: Option<Duration>
    },
    #[error("Provider rejected the request: {0}")]
    Rejected(String),
    #[error("Provider returned an invalid response: {0}")]
    InvalidResponse(String),
    #[error("Provider did not respond within {0:?}")]
    Timeout(Duration)
}

impl ProviderError {
    /// Whether repeating the same call later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProviderError::Unavailable(_) | ProviderError::RateLimited { .. } | ProviderError::Timeout(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }
}
