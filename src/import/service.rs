use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::events::{Event, EventSink};
use crate::import::{DuplicateDetector, ImportError};
use crate::models::{DateRange, ImportBatch, ImportBatchId, ModelError, RawTransaction, SourceAccount, Transaction, TransactionProcessingState};
use crate::ports::{with_timeout, TransactionProvider};
use crate::storage::{ImportBatchRepository, Repositories};

const CANCELLED_MESSAGE: &str = "Import was cancelled";

/// Checks a requested import range against today and the bank's limit.
///
/// # Errors
/// `ImportError::InvalidDateRange` when the range is inverted, ends in the future or spans
/// more than `max_days` days.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate, today: NaiveDate, max_days: i64) -> Result<DateRange, ImportError> {
    if start > end {
        return Err(ImportError::invalid_date_range(start, end, "start date is after end date"));
    }

    if end > today {
        return Err(ImportError::invalid_date_range(start, end, format!("end date is after today ({today})")));
    }

    let range = DateRange::new(start, end)?;

    if range.days() > max_days {
        return Err(ImportError::invalid_date_range(start, end, format!("range spans {} days, the bank allows at most {max_days}", range.days())));
    }

    Ok(range)
}

#[derive(Debug, Default)]
struct ImportCounts {
    imported: usize,
    duplicates: usize,
    rejected: usize
}

/// Imports bank transactions into the workflow, skipping the ones already known.
pub struct ImportService<P: TransactionProvider> {
    provider: Arc<P>,
    repositories: Repositories,
    events: Arc<dyn EventSink>,
    config: Arc<SyncConfig>,
    detector: DuplicateDetector
}

impl<P: TransactionProvider> Clone for ImportService<P> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            repositories: self.repositories.clone(),
            events: self.events.clone(),
            config: self.config.clone(),
            detector: self.detector.clone()
        }
    }
}

impl<P: TransactionProvider> ImportService<P> {
    pub fn new(provider: Arc<P>, repositories: Repositories, events: Arc<dyn EventSink>, config: Arc<SyncConfig>) -> Self {
        let detector = DuplicateDetector::new(repositories.transactions.clone());

        Self {
            provider,
            repositories,
            events,
            config,
            detector
        }
    }

    /// Imports the account's transactions booked between `start` and `end`, inclusive.
    ///
    /// Every call creates a new batch, even when nothing new is found. Dropping the returned
    /// future before it resolves leaves that batch `Failed`.
    pub async fn import_transactions(&self, account: &SourceAccount, start: NaiveDate, end: NaiveDate) -> Result<ImportBatch, ImportError> {
        let today = Utc::now().date_naive();
        let range = validate_date_range(start, end, today, self.config.max_days_for(&account.bank_id))?;

        if account.id.trim().is_empty() {
            return Err(ModelError::EmptyAccountId.into());
        }

        let sequence = self.repositories.batches.next_sequence(&account.id)?;
        let mut batch = ImportBatch::new(ImportBatchId::new(&account.id, sequence), range);
        batch.begin(Utc::now())?;
        self.repositories.batches.save(batch.clone())?;

        info!("Import [{}] started for {range}", batch.id);

        let _guard = BatchGuard::new(self.repositories.batches.clone(), batch.id.clone());

        match self.import_records(account, &batch).await {
            Ok(counts) => {
                batch.complete(counts.imported, counts.duplicates, counts.rejected, Utc::now())?;
                self.repositories.batches.save(batch.clone())?;

                info!(
                    "Import [{}] completed: {} new, {} duplicates, {} rejected",
                    batch.id, counts.imported, counts.duplicates, counts.rejected
                );

                self.events.publish(Event::ImportCompleted {
                    batch_id: batch.id.clone(),
                    account_id: account.id.clone(),
                    count: counts.imported,
                    duplicates: counts.duplicates
                });

                Ok(batch)
            },
            Err(import_error) => {
                error!("Import [{}] failed: {import_error}", batch.id);

                batch.fail(&import_error.to_string(), Utc::now())?;

                if let Err(storage_error) = self.repositories.batches.save(batch) {
                    error!("Unable to record the failure of an import batch: {storage_error}");
                }

                Err(import_error)
            }
        }
    }

    async fn import_records(&self, account: &SourceAccount, batch: &ImportBatch) -> Result<ImportCounts, ImportError> {
        let records = with_timeout(self.config.port_timeout(), self.provider.fetch_transactions(account, batch.range))
            .await
            .map_err(|source| ImportError::bank_api(&account.id, source))?;

        if records.is_empty() {
            return Err(ImportError::no_transactions_found(&account.id, batch.range));
        }

        debug!("Import [{}] received {} records", batch.id, records.len());

        let mut counts = ImportCounts::default();

        for record in &records {
            self.import_record(record, &batch.id, &mut counts)?;
        }

        Ok(counts)
    }

    fn import_record(&self, record: &RawTransaction, batch_id: &ImportBatchId, counts: &mut ImportCounts) -> Result<(), ImportError> {
        let now = Utc::now();

        let transaction = match Transaction::from_raw(record, batch_id, now) {
            Ok(transaction) => transaction,
            Err(model_error) => {
                warn!("Import [{batch_id}] rejected record dated {}: {model_error}", record.date);
                counts.rejected += 1;
                return Ok(());
            }
        };

        if self.detector.is_duplicate(&transaction)? {
            self.report_duplicate(&transaction, batch_id);
            counts.duplicates += 1;
            return Ok(());
        }

        let suspected = self.detector.suspected_duplicate_of(&transaction)?;

        //NOTE: A concurrent import may have stored the same record since the lookup above, the
        //      repository insert is the one that decides.
        if !self.repositories.transactions.insert_if_absent(transaction.clone())? {
            self.report_duplicate(&transaction, batch_id);
            counts.duplicates += 1;
            return Ok(());
        }

        if let Some(original) = &suspected {
            warn!("Transaction [{}] looks like a duplicate of [{original}]", transaction.id);
        }

        let state = TransactionProcessingState::new(transaction.id.clone(), now).with_duplicate_of(suspected);

        if let Err(storage_error) = self.repositories.states.save(state) {
            //NOTE: A transaction without a state would be skipped as a duplicate by every later import
            if let Err(rollback_error) = self.repositories.transactions.remove(&transaction.id) {
                error!("Unable to roll back transaction [{}]: {rollback_error}", transaction.id);
            }

            return Err(storage_error.into());
        }

        debug!("Transaction [{}] imported", transaction.id);
        counts.imported += 1;

        Ok(())
    }

    fn report_duplicate(&self, transaction: &Transaction, batch_id: &ImportBatchId) {
        debug!("Transaction [{}] already imported, skipping", transaction.id);

        self.events.publish(Event::DuplicateTransactionDetected {
            transaction_id: transaction.id.clone(),
            fingerprint: transaction.fingerprint(),
            batch_id: batch_id.clone()
        });
    }
}

/// Fails the batch if the import is dropped before it reached a final status.
struct BatchGuard {
    batches: Arc<dyn ImportBatchRepository>,
    batch_id: ImportBatchId
}

impl BatchGuard {
    fn new(batches: Arc<dyn ImportBatchRepository>, batch_id: ImportBatchId) -> Self {
        Self { batches, batch_id }
    }
}

impl Drop for BatchGuard {
    fn drop(&mut self) {
        let mut batch = match self.batches.load(&self.batch_id) {
            Ok(Some(batch)) if !batch.status().is_final() => batch,
            Ok(_) => return,
            Err(storage_error) => {
                error!("Unable to check import batch [{}] on drop: {storage_error}", self.batch_id);
                return;
            }
        };

        warn!("Import [{}] was dropped before it finished", self.batch_id);

        let result = batch.fail(CANCELLED_MESSAGE, Utc::now())
            .map_err(|model_error| model_error.to_string())
            .and_then(|_| self.batches.save(batch).map_err(|storage_error| storage_error.to_string()));

        if let Err(message) = result {
            error!("Unable to mark import batch [{}] as cancelled: {message}", self.batch_id);
        }
    }
}
