use std::fmt;
use std::fmt::{Display, Formatter};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{ImportStatus, ModelError};
use crate::types::AccountId;

/// Identifies one import run: the account plus its per-account sequence number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ImportBatchId {
    account_id: AccountId,
    sequence: u64
}

impl ImportBatchId {
    pub fn new(account_id: &str, sequence: u64) -> Self {
        Self {
            account_id: account_id.to_string(),
            sequence
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }
}

impl Display for ImportBatchId {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}#{}", self.account_id, self.sequence)
    }
}

/// Inclusive range of booking dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, ModelError> {
        if start > end {
            return Err(ModelError::InvertedDateRange { start, end });
        }

        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Width of the range in days (a single-day range is zero days wide).
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }
}

impl Display for DateRange {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        write!(formatter, "{} to {}", self.start, self.end)
    }
}

/// Record of a single import run.
///
/// A batch moves `NotStarted -> InProgress -> Completed | Failed` and is frozen once it
/// reaches a final status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportBatch {
    pub id: ImportBatchId,
    pub range: DateRange,
    status: ImportStatus,
    /// Newly persisted transactions.
    pub transaction_count: usize,
    /// Records skipped because they were already imported.
    pub duplicate_count: usize,
    /// Records the provider returned that could not be turned into transactions.
    pub rejected_count: usize,
    pub error_message: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>
}

impl ImportBatch {
    pub fn new(id: ImportBatchId, range: DateRange) -> Self {
        Self {
            id,
            range,
            status: ImportStatus::NotStarted,
            transaction_count: 0,
            duplicate_count: 0,
            rejected_count: 0,
            error_message: None,
            started_at: None,
            finished_at: None
        }
    }

    pub fn account_id(&self) -> &str {
        self.id.account_id()
    }

    pub fn status(&self) -> ImportStatus {
        self.status
    }

    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<(), ModelError> {
        self.ensure_open()?;

        self.status = ImportStatus::InProgress;
        self.started_at = Some(now);

        Ok(())
    }

    pub fn complete(&mut self, transaction_count: usize, duplicate_count: usize, rejected_count: usize, now: DateTime<Utc>) -> Result<(), ModelError> {
        self.ensure_open()?;

        self.status = ImportStatus::Completed;
        self.transaction_count = transaction_count;
        self.duplicate_count = duplicate_count;
        self.rejected_count = rejected_count;
        self.finished_at = Some(now);

        Ok(())
    }

    pub fn fail(&mut self, message: &str, now: DateTime<Utc>) -> Result<(), ModelError> {
        self.ensure_open()?;

        self.status = ImportStatus::Failed;
        self.error_message = Some(message.to_string());
        self.finished_at = Some(now);

        Ok(())
    }

    fn ensure_open(&self) -> Result<(), ModelError> {
        if self.status.is_final() {
            return Err(ModelError::batch_finalized(&self.id, self.status));
        }

        Ok(())
    }
}
