mod confidence;
mod errors;
mod money;

pub use confidence::ConfidenceScore;
pub use errors::{ConfidenceError, MoneyError};
pub use money::Money;

pub type AccountId = String;
pub type BankId = String;
pub type CategoryId = String;
pub type ExternalId = String;
