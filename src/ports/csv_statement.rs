use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use csv::{ReaderBuilder, Trim};
use tokio::task::spawn_blocking;
use tracing::{debug, error};

use crate::models::{DateRange, RawTransaction, SourceAccount};
use crate::ports::{ProviderError, TransactionProvider};

/// Reads transactions from a bank statement exported as CSV.
///
/// The header must name the `RawTransaction` columns. Rows that cannot be parsed are logged
/// and skipped, and rows outside the requested range are ignored.
pub struct CsvStatementProvider {
    path: PathBuf
}

impl CsvStatementProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into()
        }
    }

    fn read(path: PathBuf, range: DateRange) -> Result<Vec<RawTransaction>, ProviderError> {
        let file = File::open(&path).map_err(|error| {
            ProviderError::Unavailable(format!("Error opening statement at path: {} | {error}", path.display()))
        })?;

        let mut reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .from_reader(BufReader::new(file));

        let mut transactions = Vec::new();

        for result in reader.deserialize::<RawTransaction>() {
            match result {
                Ok(transaction) if range.contains(transaction.date) => transactions.push(transaction),
                Ok(transaction) => {
                    debug!("Statement row dated [{}] is outside of [{range}]", transaction.date);
                },
                Err(error) => {
                    error!("Statement deserialization error: {error}");
                }
            }
        }

        Ok(transactions)
    }
}

impl TransactionProvider for CsvStatementProvider {
    async fn fetch_transactions(&self, account: &SourceAccount, range: DateRange) -> Result<Vec<RawTransaction>, ProviderError> {
        let path = self.path.clone();
        debug!("Reading statement [{}] for account [{}]", path.display(), account.id);

        spawn_blocking(move || Self::read(path, range))
            .await
            .map_err(|error| ProviderError::Unavailable(format!("Statement reader stopped: {error}")))?
    }
}
