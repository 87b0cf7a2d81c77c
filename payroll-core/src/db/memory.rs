use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};

use super::factory::{DbConfig, RepositoryFactory};
use super::repository::{EntryBatch, PayrollRepository, RepositoryError};
use crate::models::{EntryFilter, PayEntry};

struct Store {
    entries: BTreeMap<i64, PayEntry>,
    next_id: i64,
}

/// Process-local repository backed by a `BTreeMap`.
///
/// Nothing survives the process; used for tests and dry runs.
pub struct InMemoryRepository {
    store: RwLock<Store>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self {
            store: RwLock::new(Store {
                entries: BTreeMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Writes `entry` as-is, bypassing validation and recomputation.
    /// Lets tests seed rows the ledger itself would never produce.
    pub fn put_raw(
        &self,
        entry: PayEntry,
    ) -> Result<(), RepositoryError> {
        let mut store = self.write()?;
        store.next_id = store.next_id.max(entry.id + 1);
        store.entries.insert(entry.id, entry);
        Ok(())
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Store>, RepositoryError> {
        self.store
            .read()
            .map_err(|_| RepositoryError::Database("in-memory store poisoned".to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Store>, RepositoryError> {
        self.store
            .write()
            .map_err(|_| RepositoryError::Database("in-memory store poisoned".to_string()))
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PayrollRepository for InMemoryRepository {
    async fn entries_for_year(
        &self,
        year: i32,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let store = self.read()?;
        let mut entries: Vec<PayEntry> = store
            .entries
            .values()
            .filter(|e| e.week_start.year() == year)
            .cloned()
            .collect();
        entries.sort_by(PayEntry::chronological_cmp);
        Ok(entries)
    }

    async fn get_entry(
        &self,
        id: i64,
    ) -> Result<PayEntry, RepositoryError> {
        self.read()?
            .entries
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    async fn list_entries(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let store = self.read()?;
        let mut entries: Vec<PayEntry> = store
            .entries
            .values()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.chronological_cmp(a));
        Ok(entries
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.effective_limit() as usize)
            .collect())
    }

    async fn overlapping_entries(
        &self,
        week_start: NaiveDate,
        week_end: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let store = self.read()?;
        Ok(store
            .entries
            .values()
            .filter(|e| Some(e.id) != exclude_id)
            .filter(|e| e.week_start <= week_end && week_start <= e.week_end)
            .cloned()
            .collect())
    }

    async fn commit(
        &self,
        batch: EntryBatch,
    ) -> Result<Vec<PayEntry>, RepositoryError> {
        let mut store = self.write()?;

        // Check everything first so a failing batch leaves the store untouched.
        let missing = batch
            .updates
            .iter()
            .map(|e| e.id)
            .chain(batch.deletes.iter().copied())
            .any(|id| !store.entries.contains_key(&id));
        if missing {
            return Err(RepositoryError::NotFound);
        }

        let now = Utc::now();
        for id in &batch.deletes {
            store.entries.remove(id);
        }
        for mut entry in batch.updates {
            entry.updated_at = now;
            store.entries.insert(entry.id, entry);
        }

        let mut inserted = Vec::with_capacity(batch.inserts.len());
        for pending in batch.inserts {
            let id = store.next_id;
            store.next_id += 1;
            let entry = PayEntry {
                id,
                week_start: pending.entry.week_start,
                week_end: pending.entry.week_end,
                gross_pay: pending.entry.gross_pay,
                notes: pending.entry.notes,
                taxes: pending.taxes,
                created_at: now,
                updated_at: now,
            };
            store.entries.insert(id, entry.clone());
            inserted.push(entry);
        }
        Ok(inserted)
    }
}

/// [`RepositoryFactory`] for the `"memory"` backend.
pub struct MemoryRepositoryFactory;

#[async_trait]
impl RepositoryFactory for MemoryRepositoryFactory {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn create(
        &self,
        _config: &DbConfig,
    ) -> Result<Box<dyn PayrollRepository>, RepositoryError> {
        Ok(Box::new(InMemoryRepository::new()))
    }
}
