use std::fmt;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::errors::MoneyError;

const CURRENCY_CODE_LENGTH: usize = 3;

/// A signed monetary amount in a single currency.
///
/// The currency is normalised to an upper-case ISO-4217 style code on construction,
/// so two `Money` values compare equal only when both the amount and the code match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Money {
    amount: Decimal,
    currency: String
}

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Result<Self, MoneyError> {
        let currency = currency.trim();

        if currency.len() != CURRENCY_CODE_LENGTH || !currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(MoneyError::InvalidCurrency(currency.to_string()));
        }

        Ok(Self {
            amount,
            currency: currency.to_ascii_uppercase()
        })
    }

    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }
}

impl Display for Money {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:.2} {}", self.amount, self.currency)
    }
}
