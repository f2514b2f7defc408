use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use sha2::{Digest, Sha256};

const FINGERPRINT_BYTES: usize = 16;

/// Deterministic key that identifies the same external transaction across imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TransactionFingerprint(String);

impl TransactionFingerprint {
    pub fn from_identity(account_id: &str, provider_id: &str) -> Self {
        Self::digest(&format!("id|{}|{}", account_id.trim(), provider_id.trim()))
    }

    pub fn from_content(account_id: &str, date: NaiveDate, amount: Decimal, counterparty: Option<&str>, description: &str) -> Self {
        Self::digest(&format!(
            "content|{}|{}|{:.2}|{}|{}",
            account_id.trim(),
            date,
            amount,
            normalize(counterparty.unwrap_or_default()),
            normalize(description)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn digest(input: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(input.as_bytes());
        let result = hasher.finalize();

        Self(hex::encode(&result[..FINGERPRINT_BYTES]))
    }
}

impl Display for TransactionFingerprint {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Lower-cases and collapses whitespace so cosmetic differences in bank exports do not matter.
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
