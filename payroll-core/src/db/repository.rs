use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{EntryFilter, NewPayEntry, PayEntry, TaxResult};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A new entry together with the taxes computed for its position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingEntry {
    pub entry: NewPayEntry,
    pub taxes: TaxResult,
}

/// Every write produced by one ledger mutation.
///
/// Backends must apply a batch atomically: either all of it is visible
/// afterwards or none of it is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryBatch {
    pub inserts: Vec<PendingEntry>,
    /// Full rows to write back (user fields and taxes).
    pub updates: Vec<PayEntry>,
    pub deletes: Vec<i64>,
}

impl EntryBatch {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

#[async_trait]
pub trait PayrollRepository: Send + Sync {
    // Reads
    /// Entries whose week starts in `year`, ordered by week start then
    /// creation order.
    async fn entries_for_year(&self, year: i32) -> Result<Vec<PayEntry>, RepositoryError>;

    async fn get_entry(&self, id: i64) -> Result<PayEntry, RepositoryError>;

    /// Filtered entries ordered by week start, newest first.
    async fn list_entries(&self, filter: &EntryFilter) -> Result<Vec<PayEntry>, RepositoryError>;

    /// Entries whose week range intersects `[week_start, week_end]`,
    /// excluding `exclude_id` when given.
    async fn overlapping_entries(
        &self,
        week_start: NaiveDate,
        week_end: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<Vec<PayEntry>, RepositoryError>;

    // Writes
    /// Applies `batch` atomically and returns the inserted rows in batch order.
    ///
    /// Fails with [`RepositoryError::NotFound`] (and writes nothing) when an
    /// update or delete names a missing id.
    async fn commit(&self, batch: EntryBatch) -> Result<Vec<PayEntry>, RepositoryError>;
}
