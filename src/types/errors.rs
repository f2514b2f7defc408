use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum MoneyError {
    #[error("Money error: currency code '{0}' must be three ASCII letters")]
    InvalidCurrency(String)
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfidenceError {
    #[error("Confidence error: {0} is outside of [0.0, 1.0]")]
    OutOfRange(f64)
}
