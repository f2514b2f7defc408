use serde::{Deserialize, Serialize};

use crate::types::{AccountId, BankId};

/// A bank account transactions are imported from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceAccount {
    pub id: AccountId,
    /// Bank identifier used to look up provider-specific limits.
    pub bank_id: BankId
}

impl SourceAccount {
    pub fn new(id: &str, bank_id: &str) -> Self {
        Self {
            id: id.trim().to_string(),
            bank_id: bank_id.trim().to_lowercase()
        }
    }
}
