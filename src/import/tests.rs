use super::*;

use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{Days, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{sleep, timeout};

use crate::config::SyncConfig;
use crate::events::{ChannelEventSink, Event};
use crate::models::{DateRange, ImportStatus, RawTransaction, SourceAccount, TransactionId, TransactionProcessingState, TransactionStatus};
use crate::ports::{ProviderError, TransactionProvider};
use crate::storage::{ProcessingStateRepository, ProcessingStateStorage, Repositories, StorageError, TransactionFilter};

enum Response {
    Records(Vec<RawTransaction>),
    Failure(ProviderError),
    Stall
}

struct StubProvider {
    response: Response,
    calls: AtomicUsize
}

impl StubProvider {
    fn new(response: Response) -> Arc<Self> {
        Arc::new(Self {
            response,
            calls: AtomicUsize::new(0)
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl TransactionProvider for StubProvider {
    async fn fetch_transactions(&self, _account: &SourceAccount, _range: DateRange) -> Result<Vec<RawTransaction>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        match &self.response {
            Response::Records(records) => Ok(records.clone()),
            Response::Failure(error) => Err(error.clone()),
            Response::Stall => {
                sleep(Duration::from_secs(3600)).await;
                Ok(Vec::new())
            }
        }
    }
}

/// State store whose first `failures` saves fail.
struct FlakyStateStorage {
    inner: ProcessingStateStorage,
    failures: AtomicUsize
}

impl ProcessingStateRepository for FlakyStateStorage {
    fn save(&self, state: TransactionProcessingState) -> Result<(), StorageError> {
        let remaining = self.failures.load(Ordering::SeqCst);

        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StorageError::Backend("down".to_string()));
        }

        self.inner.save(state)
    }

    fn load(&self, transaction_id: &TransactionId) -> Result<Option<TransactionProcessingState>, StorageError> {
        self.inner.load(transaction_id)
    }

    fn find_all(&self, account_id: Option<&str>) -> Result<Vec<TransactionProcessingState>, StorageError> {
        self.inner.find_all(account_id)
    }

    fn claim_submission(&self, transaction_id: &TransactionId) -> Result<bool, StorageError> {
        self.inner.claim_submission(transaction_id)
    }

    fn release_submission(&self, transaction_id: &TransactionId) -> Result<(), StorageError> {
        self.inner.release_submission(transaction_id)
    }
}

fn days_ago(days: u64) -> NaiveDate {
    let today = Utc::now().date_naive();
    today.checked_sub_days(Days::new(days)).unwrap_or(today)
}

fn record(id: Option<&str>, days: u64, amount: &str, message: &str) -> Result<RawTransaction> {
    Ok(RawTransaction {
        external_id: id.map(str::to_string),
        date: days_ago(days),
        amount: Decimal::from_str(amount)?,
        currency: "CZK".to_string(),
        counterparty_name: Some("Albert Supermarket".to_string()),
        message: Some(message.to_string()),
        transaction_type: Some("Card payment".to_string()),
        ..RawTransaction::default()
    })
}

fn statement() -> Result<Vec<RawTransaction>> {
    Ok(vec![
        record(Some("26001"), 3, "-412.50", "Groceries")?,
        record(Some("26002"), 2, "-89.00", "Coffee")?,
        record(Some("26003"), 1, "25000.00", "Salary")?,
        record(Some("26004"), 1, "-1200.00", "Internet")?,
        record(Some("26005"), 0, "-250.00", "Pharmacy")?
    ])
}

fn create_service(provider: Arc<StubProvider>, config: SyncConfig) -> (ImportService<StubProvider>, Repositories, UnboundedReceiver<Event>) {
    let repositories = Repositories::in_memory();
    let (sink, receiver) = ChannelEventSink::new();
    let service = ImportService::new(provider, repositories.clone(), Arc::new(sink), Arc::new(config));

    (service, repositories, receiver)
}

fn drain(receiver: &mut UnboundedReceiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();

    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }

    events
}

fn fio_account() -> SourceAccount {
    SourceAccount::new("2100123456", "fio")
}

#[test]
fn test_validate_date_range_matches_its_rules_for_random_ranges() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let today = days_ago(0);

    for _ in 0..1_000 {
        let start = today + chrono::Duration::days(rng.gen_range(-200..20));
        let end = today + chrono::Duration::days(rng.gen_range(-200..20));
        let max_days = rng.gen_range(0..120);

        let expected = start <= end && end <= today && (end - start).num_days() <= max_days;
        let result = validate_date_range(start, end, today, max_days);

        assert_eq!(result.is_ok(), expected, "start {start}, end {end}, max {max_days}");

        if let Err(error) = result {
            assert!(matches!(error, ImportError::InvalidDateRange { .. }));
        }
    }
}

#[test]
fn test_validate_date_range_accepts_single_day_today() {
    let today = days_ago(0);

    assert!(validate_date_range(today, today, today, 0).is_ok());
}

#[tokio::test]
async fn test_import_persists_new_transactions() -> Result<()> {
    let provider = StubProvider::new(Response::Records(statement()?));
    let (service, repositories, mut receiver) = create_service(provider.clone(), SyncConfig::default());

    let batch = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await?;

    assert_eq!(batch.status(), ImportStatus::Completed);
    assert_eq!(batch.id.sequence(), 1);
    assert_eq!(batch.transaction_count, 5);
    assert_eq!(batch.duplicate_count, 0);
    assert!(batch.finished_at.is_some());
    assert_eq!(repositories.batches.load(&batch.id)?, Some(batch.clone()));

    let states = repositories.states.find_all(Some("2100123456"))?;
    assert_eq!(states.len(), 5);
    assert!(states.iter().all(|state| state.status() == TransactionStatus::Imported));

    let stored = repositories.transactions.load(&TransactionId::new("2100123456", "26001")?)?;
    assert_eq!(stored.map(|transaction| transaction.import_batch_id), Some(batch.id.clone()));

    assert_eq!(drain(&mut receiver), vec![Event::ImportCompleted {
        batch_id: batch.id,
        account_id: "2100123456".to_string(),
        count: 5,
        duplicates: 0
    }]);
    assert_eq!(provider.calls(), 1);

    Ok(())
}

#[tokio::test]
async fn test_reimport_skips_known_transactions() -> Result<()> {
    let provider = StubProvider::new(Response::Records(statement()?));
    let (service, repositories, mut receiver) = create_service(provider, SyncConfig::default());
    let account = fio_account();

    service.import_transactions(&account, days_ago(7), days_ago(0)).await?;
    drain(&mut receiver);

    let second = service.import_transactions(&account, days_ago(7), days_ago(0)).await?;

    assert_eq!(second.id.sequence(), 2);
    assert_eq!(second.transaction_count, 0);
    assert_eq!(second.duplicate_count, 5);
    assert_eq!(repositories.transactions.find(&TransactionFilter::default())?.len(), 5);

    let events = drain(&mut receiver);
    let duplicates = events.iter()
        .filter(|event| matches!(event, Event::DuplicateTransactionDetected { batch_id, .. } if *batch_id == second.id))
        .count();

    assert_eq!(duplicates, 5);
    assert_eq!(events.last().map(Event::name), Some("ImportCompleted"));

    Ok(())
}

#[tokio::test]
async fn test_import_rejects_invalid_range_before_calling_the_bank() -> Result<()> {
    let provider = StubProvider::new(Response::Records(statement()?));
    let (service, repositories, _receiver) = create_service(provider.clone(), SyncConfig::default());
    let tomorrow = days_ago(0) + chrono::Duration::days(1);

    let future_end = service.import_transactions(&fio_account(), days_ago(3), tomorrow).await;
    let too_wide = service.import_transactions(&fio_account(), days_ago(91), days_ago(0)).await;
    let inverted = service.import_transactions(&fio_account(), days_ago(1), days_ago(2)).await;

    assert!(matches!(future_end, Err(ImportError::InvalidDateRange { .. })));
    assert!(matches!(too_wide, Err(ImportError::InvalidDateRange { .. })));
    assert!(matches!(inverted, Err(ImportError::InvalidDateRange { .. })));
    assert_eq!(provider.calls(), 0);
    assert!(repositories.batches.find_by_account("2100123456")?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_uses_the_default_limit_for_unknown_banks() -> Result<()> {
    let provider = StubProvider::new(Response::Records(statement()?));
    let mut config = SyncConfig::default();
    config.default_max_days = 365;
    let (service, _repositories, _receiver) = create_service(provider, config);

    let account = SourceAccount::new("2100123456", "csob");
    let batch = service.import_transactions(&account, days_ago(200), days_ago(0)).await?;

    assert_eq!(batch.status(), ImportStatus::Completed);

    Ok(())
}

#[tokio::test]
async fn test_bank_failure_marks_the_batch_failed() -> Result<()> {
    let provider = StubProvider::new(Response::Failure(ProviderError::Unavailable("token expired".to_string())));
    let (service, repositories, mut receiver) = create_service(provider, SyncConfig::default());

    let result = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await;

    assert!(matches!(
        &result,
        Err(ImportError::BankApi { source: ProviderError::Unavailable(_), .. })
    ));

    let batches = repositories.batches.find_by_account("2100123456")?;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].status(), ImportStatus::Failed);
    assert!(batches[0].error_message.as_deref().is_some_and(|message| message.contains("token expired")));
    assert!(drain(&mut receiver).is_empty());

    Ok(())
}

#[tokio::test]
async fn test_empty_statement_marks_the_batch_failed() -> Result<()> {
    let provider = StubProvider::new(Response::Records(Vec::new()));
    let (service, repositories, _receiver) = create_service(provider, SyncConfig::default());

    let result = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await;

    assert!(matches!(result, Err(ImportError::NoTransactionsFound { .. })));

    let batches = repositories.batches.find_by_account("2100123456")?;
    assert_eq!(batches[0].status(), ImportStatus::Failed);
    assert!(batches[0].error_message.as_deref().is_some_and(|message| message.contains("No transactions found")));

    Ok(())
}

#[tokio::test]
async fn test_slow_bank_times_out() -> Result<()> {
    let provider = StubProvider::new(Response::Stall);
    let config = SyncConfig::default().with_port_timeout(Duration::from_millis(50));
    let (service, repositories, _receiver) = create_service(provider, config);

    let result = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await;

    assert!(matches!(
        result,
        Err(ImportError::BankApi { source: ProviderError::Timeout(_), .. })
    ));
    assert_eq!(repositories.batches.find_by_account("2100123456")?[0].status(), ImportStatus::Failed);

    Ok(())
}

#[tokio::test]
async fn test_dropped_import_marks_the_batch_cancelled() -> Result<()> {
    let provider = StubProvider::new(Response::Stall);
    let (service, repositories, _receiver) = create_service(provider, SyncConfig::default());

    let outcome = timeout(
        Duration::from_millis(50),
        service.import_transactions(&fio_account(), days_ago(7), days_ago(0))
    ).await;

    assert!(outcome.is_err());

    let batches = repositories.batches.find_by_account("2100123456")?;
    assert_eq!(batches.len(), 1);
    assert_eq!(batches[0].status(), ImportStatus::Failed);
    assert_eq!(batches[0].error_message.as_deref(), Some("Import was cancelled"));

    Ok(())
}

#[tokio::test]
async fn test_failed_state_save_leaves_no_orphaned_transaction() -> Result<()> {
    let provider = StubProvider::new(Response::Records(statement()?));
    let repositories = Repositories {
        states: Arc::new(FlakyStateStorage {
            inner: ProcessingStateStorage::new(),
            failures: AtomicUsize::new(1)
        }),
        ..Repositories::in_memory()
    };
    let (sink, _receiver) = ChannelEventSink::new();
    let service = ImportService::new(provider, repositories.clone(), Arc::new(sink), Arc::new(SyncConfig::default()));

    let first = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await;

    assert!(matches!(first, Err(ImportError::Storage(StorageError::Backend(_)))));
    assert!(repositories.transactions.find(&TransactionFilter::default())?.is_empty());

    let retry = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await?;

    assert_eq!(retry.transaction_count, 5);
    assert_eq!(retry.duplicate_count, 0);
    assert_eq!(repositories.states.find_all(None)?.len(), 5);

    for transaction in repositories.transactions.find(&TransactionFilter::default())? {
        assert!(repositories.states.load(&transaction.id)?.is_some());
    }

    Ok(())
}

#[tokio::test]
async fn test_invalid_records_are_rejected_without_failing_the_batch() -> Result<()> {
    let mut records = statement()?;
    records.push(RawTransaction {
        currency: "CZ".to_string(),
        ..record(Some("26004"), 1, "-10.00", "Broken currency")?
    });

    let provider = StubProvider::new(Response::Records(records));
    let (service, _repositories, _receiver) = create_service(provider, SyncConfig::default());

    let batch = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await?;

    assert_eq!(batch.transaction_count, 5);
    assert_eq!(batch.rejected_count, 1);

    Ok(())
}

#[tokio::test]
async fn test_records_without_ids_are_deduplicated_by_content() -> Result<()> {
    let records = vec![
        record(None, 2, "-89.00", "Coffee")?,
        record(None, 2, "-89.00", "  COFFEE ")?
    ];

    let provider = StubProvider::new(Response::Records(records));
    let (service, _repositories, _receiver) = create_service(provider, SyncConfig::default());

    let first = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await?;
    let second = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await?;

    assert_eq!((first.transaction_count, first.duplicate_count), (1, 1));
    assert_eq!((second.transaction_count, second.duplicate_count), (0, 2));

    Ok(())
}

#[tokio::test]
async fn test_same_facts_with_different_ids_are_flagged() -> Result<()> {
    let records = vec![
        record(Some("26001"), 2, "-89.00", "Coffee")?,
        record(Some("26099"), 2, "-89.00", "Coffee")?
    ];

    let provider = StubProvider::new(Response::Records(records));
    let (service, repositories, _receiver) = create_service(provider, SyncConfig::default());

    let batch = service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await?;
    assert_eq!(batch.transaction_count, 2);

    let original = TransactionId::new("2100123456", "26001")?;
    let suspect = repositories.states.load(&TransactionId::new("2100123456", "26099")?)?;

    assert_eq!(suspect.as_ref().and_then(|state| state.duplicate_of()), Some(&original));
    assert!(repositories.states.load(&original)?.is_some_and(|state| !state.is_duplicate()));

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_overlapping_imports_store_each_transaction_once() -> Result<()> {
    let provider = StubProvider::new(Response::Records(statement()?));
    let (service, repositories, mut receiver) = create_service(provider, SyncConfig::default());
    let imports = 8;

    let handles: Vec<_> = (0..imports)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service.import_transactions(&fio_account(), days_ago(7), days_ago(0)).await
            })
        })
        .collect();

    let mut batches = Vec::new();

    for handle in handles {
        batches.push(handle.await??);
    }

    let imported: usize = batches.iter().map(|batch| batch.transaction_count).sum();
    let duplicates: usize = batches.iter().map(|batch| batch.duplicate_count).sum();
    let mut sequences: Vec<u64> = batches.iter().map(|batch| batch.id.sequence()).collect();
    sequences.sort_unstable();

    assert_eq!(imported, 5);
    assert_eq!(duplicates, imports * 5 - 5);
    assert_eq!(sequences, (1..=imports as u64).collect::<Vec<_>>());
    assert_eq!(repositories.transactions.find(&TransactionFilter::default())?.len(), 5);
    assert_eq!(repositories.states.find_all(None)?.len(), 5);

    let detected = drain(&mut receiver).iter()
        .filter(|event| matches!(event, Event::DuplicateTransactionDetected { .. }))
        .count();
    assert_eq!(detected, imports * 5 - 5);

    Ok(())
}
