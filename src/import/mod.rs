mod duplicates;
mod errors;
mod service;
#[cfg(test)]
mod tests;

pub use duplicates::DuplicateDetector;
pub use errors::ImportError;
pub use service::{validate_date_range, ImportService};
