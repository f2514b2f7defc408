use super::*;

use std::str::FromStr;

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;

use crate::types::ConfidenceScore;

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| anyhow!("invalid date"))
}

fn raw_transaction(external_id: Option<&str>, amount: &str, message: &str) -> Result<RawTransaction> {
    Ok(RawTransaction {
        external_id: external_id.map(str::to_string),
        date: date(2024, 3, 14)?,
        amount: Decimal::from_str(amount)?,
        currency: "CZK".to_string(),
        counterparty_name: Some("Kavárna Slavia".to_string()),
        message: Some(message.to_string()),
        transaction_type: Some("Card payment".to_string()),
        ..RawTransaction::default()
    })
}

fn batch_id() -> ImportBatchId {
    ImportBatchId::new("2100123456", 1)
}

fn suggestion(category_id: &str, payee: Option<&str>) -> Result<CategorySuggestion> {
    Ok(CategorySuggestion {
        category_id: category_id.to_string(),
        confidence: Some(ConfidenceScore::new(0.8)?),
        reasoning: Some("keyword match".to_string()),
        payee: payee.map(str::to_string),
        memo: Some("Coffee".to_string())
    })
}

fn imported_state() -> Result<TransactionProcessingState> {
    Ok(TransactionProcessingState::new(TransactionId::new("2100123456", "26001")?, Utc::now()))
}

#[test]
fn test_transaction_id_rejects_empty_parts() {
    assert_eq!(TransactionId::new("2100123456", ""), Err(ModelError::empty_provider_id("2100123456")));
    assert_eq!(TransactionId::new("2100123456", "   "), Err(ModelError::empty_provider_id("2100123456")));
    assert_eq!(TransactionId::new(" ", "26001"), Err(ModelError::EmptyAccountId));
}

#[test]
fn test_transaction_id_equality_is_structural() -> Result<()> {
    let a = TransactionId::new("2100123456", "26001")?;
    let b = TransactionId::new(" 2100123456 ", "26001")?;
    let c = TransactionId::new("2100999999", "26001")?;

    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.to_string(), "2100123456:26001");

    Ok(())
}

#[test]
fn test_transaction_from_raw_uses_provider_id() -> Result<()> {
    let raw = raw_transaction(Some("26001"), "-89.00", "Flat white")?;
    let transaction = Transaction::from_raw(&raw, &batch_id(), Utc::now())?;

    assert_eq!(transaction.id, TransactionId::new("2100123456", "26001")?);
    assert_eq!(transaction.description, "Flat white");
    assert_eq!(transaction.amount.currency(), "CZK");
    assert_eq!(transaction.import_batch_id, batch_id());

    Ok(())
}

#[test]
fn test_transaction_without_provider_id_uses_content_fingerprint() -> Result<()> {
    let raw = raw_transaction(None, "-89.00", "Flat white")?;
    let first = Transaction::from_raw(&raw, &batch_id(), Utc::now())?;
    let second = Transaction::from_raw(&raw, &ImportBatchId::new("2100123456", 7), Utc::now())?;

    assert_eq!(first.id, second.id);
    assert_eq!(first.id.provider_id(), raw.content_fingerprint("2100123456").as_str());
    assert_eq!(first.fingerprint(), second.fingerprint());

    Ok(())
}

#[test]
fn test_transaction_from_raw_rejects_invalid_currency() -> Result<()> {
    let mut raw = raw_transaction(Some("26001"), "-89.00", "Flat white")?;
    raw.currency = "KORUNA".to_string();

    let result = Transaction::from_raw(&raw, &batch_id(), Utc::now());

    assert!(matches!(result, Err(ModelError::InvalidAmount(_))));

    Ok(())
}

#[test]
fn test_raw_description_falls_back_to_counterparty_then_type() -> Result<()> {
    let mut raw = raw_transaction(Some("1"), "10", "  ")?;
    assert_eq!(raw.description(), "Kavárna Slavia");

    raw.counterparty_name = None;
    assert_eq!(raw.description(), "Card payment");

    Ok(())
}

#[test]
fn test_fingerprints_are_deterministic_and_distinct() -> Result<()> {
    let day = date(2024, 3, 14)?;
    let amount = Decimal::from_str("-89.0")?;

    assert_eq!(
        TransactionFingerprint::from_identity("acc", "1"),
        TransactionFingerprint::from_identity(" acc", "1 ")
    );
    assert_ne!(
        TransactionFingerprint::from_identity("acc", "1"),
        TransactionFingerprint::from_identity("other", "1")
    );
    assert_eq!(
        TransactionFingerprint::from_content("acc", day, amount, Some("Kavárna  SLAVIA"), "Flat White"),
        TransactionFingerprint::from_content("acc", day, Decimal::from_str("-89.00")?, Some("kavárna slavia"), "flat white")
    );
    assert_ne!(
        TransactionFingerprint::from_content("acc", day, amount, None, "Flat White"),
        TransactionFingerprint::from_content("acc", day, Decimal::from_str("-89.01")?, None, "Flat White")
    );
    assert_eq!(TransactionFingerprint::from_identity("acc", "1").as_str().len(), 32);

    Ok(())
}

#[test]
fn test_status_ordering_matches_workflow() {
    assert!(TransactionStatus::Imported < TransactionStatus::Categorized);
    assert!(TransactionStatus::Categorized < TransactionStatus::Submitted);
}

#[test]
fn test_categorize_then_submit_lifecycle() -> Result<()> {
    let mut state = imported_state()?;

    state.categorize(suggestion("dining", Some("Kavárna Slavia"))?, Utc::now())?;
    assert_eq!(state.status(), TransactionStatus::Categorized);
    assert_eq!(state.effective_category_id(), Some("dining"));

    state.mark_submitted("ynab-42", Utc::now())?;
    assert_eq!(state.status(), TransactionStatus::Submitted);
    assert_eq!(state.external_id(), Some("ynab-42"));

    Ok(())
}

#[test]
fn test_submitted_state_is_terminal() -> Result<()> {
    let mut state = imported_state()?;
    state.categorize(suggestion("dining", Some("Kavárna Slavia"))?, Utc::now())?;
    state.mark_submitted("ynab-42", Utc::now())?;

    let snapshot = state.clone();

    assert!(matches!(state.categorize(suggestion("travel", None)?, Utc::now()), Err(ModelError::AlreadySubmitted { .. })));
    assert!(matches!(state.apply_override("travel", None, None, Utc::now()), Err(ModelError::AlreadySubmitted { .. })));
    assert!(matches!(state.mark_submitted("ynab-43", Utc::now()), Err(ModelError::AlreadySubmitted { .. })));
    assert_eq!(state, snapshot);

    Ok(())
}

#[test]
fn test_imported_state_cannot_skip_to_submitted() -> Result<()> {
    let mut state = imported_state()?;
    let result = state.mark_submitted("ynab-1", Utc::now());

    assert!(matches!(result, Err(ModelError::InvalidTransition { from: TransactionStatus::Imported, to: TransactionStatus::Submitted, .. })));
    assert_eq!(state.status(), TransactionStatus::Imported);

    Ok(())
}

#[test]
fn test_override_keeps_suggestion_and_takes_precedence() -> Result<()> {
    let mut state = imported_state()?;
    state.categorize(suggestion("dining", Some("Kavárna Slavia"))?, Utc::now())?;

    let changed = state.apply_override("groceries", Some("Albert"), None, Utc::now())?;

    assert!(changed);
    assert_eq!(state.suggested_category_id(), Some("dining"));
    assert_eq!(state.effective_category_id(), Some("groceries"));
    assert_eq!(state.effective_payee(), Some("Albert"));
    assert_eq!(state.effective_memo(), Some("Coffee"));

    Ok(())
}

#[test]
fn test_override_advances_imported_state_and_is_idempotent() -> Result<()> {
    let mut state = imported_state()?;

    assert!(state.apply_override("groceries", Some("Albert"), Some("weekly"), Utc::now())?);
    assert_eq!(state.status(), TransactionStatus::Categorized);

    let once = state.clone();
    let later = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).single().ok_or_else(|| anyhow!("invalid timestamp"))?;

    assert!(!state.apply_override("groceries", Some("Albert"), Some("weekly"), later)?);
    assert_eq!(state, once);

    Ok(())
}

#[test]
fn test_date_range_rejects_inverted_bounds() -> Result<()> {
    let range = DateRange::new(date(2024, 1, 1)?, date(2024, 1, 31)?)?;

    assert_eq!(range.days(), 30);
    assert!(range.contains(date(2024, 1, 31)?));
    assert!(!range.contains(date(2024, 2, 1)?));
    assert!(matches!(DateRange::new(date(2024, 2, 1)?, date(2024, 1, 1)?), Err(ModelError::InvertedDateRange { .. })));

    Ok(())
}

#[test]
fn test_import_batch_lifecycle_freezes_final_state() -> Result<()> {
    let range = DateRange::new(date(2024, 1, 1)?, date(2024, 1, 31)?)?;
    let mut batch = ImportBatch::new(batch_id(), range);

    assert_eq!(batch.status(), ImportStatus::NotStarted);

    batch.begin(Utc::now())?;
    assert_eq!(batch.status(), ImportStatus::InProgress);

    batch.complete(5, 1, 0, Utc::now())?;
    assert_eq!(batch.status(), ImportStatus::Completed);
    assert_eq!(batch.transaction_count, 5);

    assert!(matches!(batch.fail("late failure", Utc::now()), Err(ModelError::BatchFinalized { .. })));
    assert_eq!(batch.status(), ImportStatus::Completed);
    assert_eq!(batch.error_message, None);
    assert_eq!(batch.id.to_string(), "2100123456#1");

    Ok(())
}

#[test]
fn test_uncategorized_category() {
    let category = Category::uncategorized();

    assert!(category.is_uncategorized());
    assert_eq!(category.name, "Uncategorized");
}
