use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{de, Deserialize, Deserializer, Serialize};

use crate::models::{ImportBatchId, ModelError, TransactionFingerprint};
use crate::types::{AccountId, Money};

/// Identity of a transaction: the source account plus the id the provider assigned to it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TransactionId {
    account_id: AccountId,
    provider_id: String
}

impl TransactionId {
    pub fn new(account_id: &str, provider_id: &str) -> Result<Self, ModelError> {
        let account_id = account_id.trim();
        let provider_id = provider_id.trim();

        if account_id.is_empty() {
            return Err(ModelError::EmptyAccountId);
        }

        if provider_id.is_empty() {
            return Err(ModelError::empty_provider_id(account_id));
        }

        Ok(Self {
            account_id: account_id.to_string(),
            provider_id: provider_id.to_string()
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }
}

impl Display for TransactionId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}:{}", self.account_id, self.provider_id)
    }
}

/// A transaction exactly as a bank provider reported it, before it enters the workflow.
///
/// Column names follow the statement export, so the same struct is used to read CSV rows.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTransaction {
    /// Provider-assigned id. Providers without stable ids leave it empty.
    #[serde(rename = "id")]
    pub external_id: Option<String>,
    pub date: NaiveDate,
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: Decimal,
    pub currency: String,
    pub counterparty_account: Option<String>,
    pub counterparty_name: Option<String>,
    pub message: Option<String>,
    pub variable_symbol: Option<String>,
    pub constant_symbol: Option<String>,
    pub specific_symbol: Option<String>,
    pub reference: Option<String>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>
}

impl RawTransaction {
    pub fn external_id(&self) -> Option<&str> {
        non_blank(self.external_id.as_deref())
    }

    /// Free-text description: the payment message, else the counterparty, else the type tag.
    pub fn description(&self) -> String {
        non_blank(self.message.as_deref())
            .or_else(|| non_blank(self.counterparty_name.as_deref()))
            .or_else(|| non_blank(self.transaction_type.as_deref()))
            .unwrap_or_default()
            .to_string()
    }

    pub fn content_fingerprint(&self, account_id: &str) -> TransactionFingerprint {
        TransactionFingerprint::from_content(
            account_id,
            self.date,
            self.amount,
            non_blank(self.counterparty_name.as_deref()),
            &self.description()
        )
    }
}

/// Immutable financial facts of an imported transaction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub date: NaiveDate,
    pub amount: Money,
    pub description: String,
    pub counterparty_name: Option<String>,
    pub counterparty_account: Option<String>,
    pub variable_symbol: Option<String>,
    pub constant_symbol: Option<String>,
    pub specific_symbol: Option<String>,
    pub reference: Option<String>,
    pub transaction_type: Option<String>,
    pub import_batch_id: ImportBatchId,
    pub created_at: DateTime<Utc>
}

impl Transaction {
    /// Builds a transaction from a provider record.
    ///
    /// When the provider has no stable id for the record, the content fingerprint stands in
    /// for it, so re-importing the same record always produces the same `TransactionId`.
    pub fn from_raw(raw: &RawTransaction, batch_id: &ImportBatchId, created_at: DateTime<Utc>) -> Result<Self, ModelError> {
        let account_id = batch_id.account_id();
        let provider_id = match raw.external_id() {
            Some(external_id) => external_id.to_string(),
            None => raw.content_fingerprint(account_id).to_string()
        };

        Ok(Self {
            id: TransactionId::new(account_id, &provider_id)?,
            date: raw.date,
            amount: Money::new(raw.amount, &raw.currency)?,
            description: raw.description(),
            counterparty_name: non_blank(raw.counterparty_name.as_deref()).map(str::to_string),
            counterparty_account: non_blank(raw.counterparty_account.as_deref()).map(str::to_string),
            variable_symbol: non_blank(raw.variable_symbol.as_deref()).map(str::to_string),
            constant_symbol: non_blank(raw.constant_symbol.as_deref()).map(str::to_string),
            specific_symbol: non_blank(raw.specific_symbol.as_deref()).map(str::to_string),
            reference: non_blank(raw.reference.as_deref()).map(str::to_string),
            transaction_type: non_blank(raw.transaction_type.as_deref()).map(str::to_string),
            import_batch_id: batch_id.clone(),
            created_at
        })
    }

    pub fn account_id(&self) -> &str {
        self.id.account_id()
    }

    /// Identity fingerprint, used to recognise the same external transaction across imports.
    pub fn fingerprint(&self) -> TransactionFingerprint {
        TransactionFingerprint::from_identity(self.id.account_id(), self.id.provider_id())
    }

    /// Fingerprint of the financial facts, used to flag suspected duplicates with different ids.
    pub fn content_fingerprint(&self) -> TransactionFingerprint {
        TransactionFingerprint::from_content(
            self.account_id(),
            self.date,
            self.amount.amount(),
            self.counterparty_name.as_deref(),
            &self.description
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn deserialize_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(deserializer)?;
    Decimal::from_str(value.trim()).map_err(de::Error::custom)
}
