//! Recalculation orchestrator.
//!
//! [`PayrollLedger`] is the only writer of pay entries. Every mutation locks
//! the affected calendar year, recomputes the entry and everything after it
//! in memory, then hands storage a single [`EntryBatch`]. If any entry in the
//! walk fails, nothing is written and the year is left [`YearState::Dirty`].

mod error;
mod state;
mod walk;

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

pub use error::{InputError, PayrollError};
pub use state::YearState;

use crate::calculations::{RateSchedule, YtdAccumulator, order_entries};
use crate::db::{EntryBatch, PayrollRepository, PendingEntry, RepositoryError};
use crate::models::{
    EntryFilter, NewPayEntry, PayEntry, PayEntryUpdate, PayrollSummary, RateTable, TaxResult,
    YtdSnapshot,
};
use error::validate_entry;
use state::YearLocks;
use walk::{UNSAVED_ID, Walk, recompute_from};

/// Outcome of [`PayrollLedger::recompute_year`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecalcReport {
    pub year: i32,
    pub walked: usize,
    pub changed: usize,
}

pub struct PayrollLedger {
    repo: Box<dyn PayrollRepository>,
    rates: Arc<RateSchedule>,
    years: YearLocks,
}

impl PayrollLedger {
    pub fn new(
        repo: Box<dyn PayrollRepository>,
        rates: Arc<RateSchedule>,
    ) -> Self {
        Self {
            repo,
            rates,
            years: YearLocks::default(),
        }
    }

    pub fn rates(&self) -> &RateSchedule {
        &self.rates
    }

    pub fn year_state(
        &self,
        year: i32,
    ) -> YearState {
        self.years.state(year)
    }

    // ── mutations ───────────────────────────────────────────────────────

    /// Stores a new entry with its computed block and brings every later
    /// entry of the same year up to date.
    ///
    /// # Errors
    /// * [`PayrollError::InvalidInput`] for negative pay, reversed dates or
    ///   a week overlapping an existing entry.
    /// * [`PayrollError::Configuration`] when the year has no rate table.
    /// * [`PayrollError::RecomputationAborted`] when a later entry cannot be
    ///   recomputed; the new entry is not stored.
    pub async fn create_entry(
        &self,
        new: NewPayEntry,
    ) -> Result<PayEntry, PayrollError> {
        validate_entry(new.week_start, new.week_end, new.gross_pay)?;
        let year = new.tax_year();
        let rates = self.rates.rates_for(year)?;

        let _guards = self.years.lock(&[year]).await;
        self.reject_overlap(new.week_start, new.week_end, None).await?;

        let mut rows = self.sorted_year(year).await?;
        // Ties on week start go after existing entries: creation order.
        let at = rows.partition_point(|e| e.week_start <= new.week_start);
        rows.insert(at, draft_row(&new));

        self.years.set_state(year, YearState::Dirty);
        let walk = self.walk(year, &mut rows, at, rates)?;

        let batch = EntryBatch {
            inserts: vec![PendingEntry {
                taxes: rows[at].taxes,
                entry: new,
            }],
            updates: rows_where(&rows, |i, _| i != at && walk.changed.contains(&i)),
            deletes: Vec::new(),
        };
        let recomputed = batch.updates.len();

        let inserted = self.commit(&[year], batch).await?;
        let entry = inserted.into_iter().next().ok_or_else(|| {
            RepositoryError::Database("insert returned no row".to_string())
        })?;

        info!(entry_id = entry.id, year, recomputed, "Created pay entry");
        Ok(entry)
    }

    /// Applies `update` to entry `id` and recomputes from the earlier of its
    /// old and new week. Moving an entry into another year recomputes both.
    ///
    /// An empty update returns the entry unchanged.
    pub async fn update_entry(
        &self,
        id: i64,
        update: PayEntryUpdate,
    ) -> Result<PayEntry, PayrollError> {
        if update.is_empty() {
            return Ok(self.repo.get_entry(id).await?);
        }

        let (current, _guards) = self.lock_entry(id, Some(&update)).await?;
        let updated = update.apply_to(&current);
        validate_entry(updated.week_start, updated.week_end, updated.gross_pay)?;

        let old_year = current.tax_year();
        let new_year = updated.tax_year();
        let old_rates = self.rates.rates_for(old_year)?;
        let new_rates = self.rates.rates_for(new_year)?;
        self.reject_overlap(updated.week_start, updated.week_end, Some(id))
            .await?;

        let updates = if old_year == new_year {
            let mut rows = self.sorted_year(old_year).await?;
            let slot = rows
                .iter_mut()
                .find(|row| row.id == id)
                .ok_or(RepositoryError::NotFound)?;
            *slot = updated.clone();
            order_entries(&mut rows);
            let from = first_on_or_after(&rows, current.week_start.min(updated.week_start));

            self.years.set_state(old_year, YearState::Dirty);
            let walk = self.walk(old_year, &mut rows, from, new_rates)?;
            rows_where(&rows, |i, row| row.id == id || walk.changed.contains(&i))
        } else {
            let mut old_rows = self.sorted_year(old_year).await?;
            old_rows.retain(|row| row.id != id);
            let old_from = first_on_or_after(&old_rows, current.week_start);

            let mut new_rows = self.sorted_year(new_year).await?;
            new_rows.push(updated.clone());
            order_entries(&mut new_rows);
            let new_from = first_on_or_after(&new_rows, updated.week_start);

            self.years.set_state(old_year, YearState::Dirty);
            self.years.set_state(new_year, YearState::Dirty);
            let old_walk = self.walk(old_year, &mut old_rows, old_from, old_rates)?;
            // Neither year is written if either walk fails.
            let new_walk = self
                .walk(new_year, &mut new_rows, new_from, new_rates)
                .inspect_err(|_| self.years.set_state(old_year, YearState::Dirty))?;

            let mut updates = rows_where(&old_rows, |i, _| old_walk.changed.contains(&i));
            updates.extend(rows_where(&new_rows, |i, row| {
                row.id == id || new_walk.changed.contains(&i)
            }));
            updates
        };

        let recomputed = updates.len().saturating_sub(1);
        self.commit(
            &[old_year, new_year],
            EntryBatch {
                updates,
                ..Default::default()
            },
        )
        .await?;

        info!(entry_id = id, old_year, new_year, recomputed, "Updated pay entry");
        Ok(self.repo.get_entry(id).await?)
    }

    /// Removes entry `id` and recomputes the rest of its year from that week on.
    pub async fn delete_entry(
        &self,
        id: i64,
    ) -> Result<(), PayrollError> {
        let (entry, _guards) = self.lock_entry(id, None).await?;
        let year = entry.tax_year();
        let rates = self.rates.rates_for(year)?;

        let mut rows = self.sorted_year(year).await?;
        rows.retain(|row| row.id != id);
        let from = first_on_or_after(&rows, entry.week_start);

        self.years.set_state(year, YearState::Dirty);
        let walk = self.walk(year, &mut rows, from, rates)?;

        let batch = EntryBatch {
            updates: rows_where(&rows, |i, _| walk.changed.contains(&i)),
            deletes: vec![id],
            ..Default::default()
        };
        let recomputed = batch.updates.len();
        self.commit(&[year], batch).await?;

        info!(entry_id = id, year, recomputed, "Deleted pay entry");
        Ok(())
    }

    /// Walks the whole year and stores every computed block that differs
    /// from what is saved. On a clean year this writes nothing.
    pub async fn recompute_year(
        &self,
        year: i32,
    ) -> Result<RecalcReport, PayrollError> {
        let rates = self.rates.rates_for(year)?;
        let _guards = self.years.lock(&[year]).await;

        let mut rows = self.sorted_year(year).await?;
        self.years.set_state(year, YearState::Dirty);
        let walk = self.walk(year, &mut rows, 0, rates)?;

        let report = RecalcReport {
            year,
            walked: walk.walked,
            changed: walk.changed.len(),
        };
        let batch = EntryBatch {
            updates: rows_where(&rows, |i, _| walk.changed.contains(&i)),
            ..Default::default()
        };
        if batch.is_empty() {
            self.years.set_state(year, YearState::Clean);
        } else {
            self.commit(&[year], batch).await?;
        }

        info!(year, walked = report.walked, changed = report.changed, "Recomputed year");
        Ok(report)
    }

    // ── reads ───────────────────────────────────────────────────────────

    pub async fn entry(
        &self,
        id: i64,
    ) -> Result<PayEntry, PayrollError> {
        Ok(self.repo.get_entry(id).await?)
    }

    /// The year's entries in chronological order.
    pub async fn entries_for_year(
        &self,
        year: i32,
    ) -> Result<Vec<PayEntry>, PayrollError> {
        self.sorted_year(year).await
    }

    /// One page of entries matching `filter`, newest week first.
    pub async fn list_entries(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<PayEntry>, PayrollError> {
        Ok(self.repo.list_entries(filter).await?)
    }

    /// Totals over every entry matching `filter`. Paging fields are ignored.
    pub async fn summary(
        &self,
        filter: &EntryFilter,
    ) -> Result<PayrollSummary, PayrollError> {
        let entries = self.all_entries(filter).await?;
        Ok(PayrollSummary::from_entries(&entries))
    }

    /// Every entry matching `filter`, newest week first, fetched page by page.
    /// Paging fields are ignored.
    pub async fn all_entries(
        &self,
        filter: &EntryFilter,
    ) -> Result<Vec<PayEntry>, PayrollError> {
        let mut page = EntryFilter {
            offset: 0,
            limit: EntryFilter::MAX_LIMIT,
            ..filter.clone()
        };
        let mut entries = Vec::new();
        loop {
            let batch = self.repo.list_entries(&page).await?;
            let full_page = batch.len() == EntryFilter::MAX_LIMIT as usize;
            entries.extend(batch);
            if !full_page {
                break;
            }
            page.offset += EntryFilter::MAX_LIMIT;
        }
        Ok(entries)
    }

    /// Year-to-date totals after every stored entry of `year`.
    pub async fn ytd_for_year(
        &self,
        year: i32,
    ) -> Result<YtdSnapshot, PayrollError> {
        let rates = self.rates.rates_for(year)?;
        let _guards = self.years.lock(&[year]).await;
        let rows = self.repo.entries_for_year(year).await?;
        Ok(YtdAccumulator::accumulate(&rows, year, rates))
    }

    // ── internals ───────────────────────────────────────────────────────

    async fn sorted_year(
        &self,
        year: i32,
    ) -> Result<Vec<PayEntry>, PayrollError> {
        let mut rows = self.repo.entries_for_year(year).await?;
        order_entries(&mut rows);
        Ok(rows)
    }

    /// Locks the year(s) entry `id` touches and returns the entry as read
    /// under those locks. Retries if the entry moved year in between.
    async fn lock_entry(
        &self,
        id: i64,
        update: Option<&PayEntryUpdate>,
    ) -> Result<(PayEntry, Vec<OwnedMutexGuard<()>>), PayrollError> {
        let target_year = |entry: &PayEntry| {
            update.map_or(entry.tax_year(), |u| u.apply_to(entry).tax_year())
        };
        loop {
            let seen = self.repo.get_entry(id).await?;
            let guards = self
                .years
                .lock(&[seen.tax_year(), target_year(&seen)])
                .await;
            let current = self.repo.get_entry(id).await?;
            if current.tax_year() == seen.tax_year() {
                return Ok((current, guards));
            }
            debug!(entry_id = id, "Entry changed year while locking, retrying");
        }
    }

    async fn reject_overlap(
        &self,
        week_start: NaiveDate,
        week_end: NaiveDate,
        exclude_id: Option<i64>,
    ) -> Result<(), PayrollError> {
        let clashes = self
            .repo
            .overlapping_entries(week_start, week_end, exclude_id)
            .await?;
        match clashes.first() {
            Some(existing) => Err(InputError::Overlap {
                week_start,
                week_end,
                existing_id: existing.id,
            }
            .into()),
            None => Ok(()),
        }
    }

    fn walk(
        &self,
        year: i32,
        rows: &mut [PayEntry],
        from: usize,
        rates: &RateTable,
    ) -> Result<Walk, PayrollError> {
        self.years.set_state(year, YearState::Recomputing);
        recompute_from(rows, from, rates).map_err(|failure| {
            self.years.set_state(year, YearState::Dirty);
            warn!(
                year,
                entry_id = ?failure.entry_id,
                error = %failure.source,
                "Recomputation aborted; nothing written"
            );
            PayrollError::RecomputationAborted {
                year,
                entry_id: failure.entry_id,
                source: failure.source,
            }
        })
    }

    async fn commit(
        &self,
        years: &[i32],
        batch: EntryBatch,
    ) -> Result<Vec<PayEntry>, PayrollError> {
        match self.repo.commit(batch).await {
            Ok(inserted) => {
                for &year in years {
                    self.years.set_state(year, YearState::Clean);
                }
                Ok(inserted)
            }
            Err(err) => {
                for &year in years {
                    self.years.set_state(year, YearState::Dirty);
                }
                warn!(?years, error = %err, "Commit failed; year left dirty");
                Err(err.into())
            }
        }
    }
}

fn draft_row(new: &NewPayEntry) -> PayEntry {
    let now = Utc::now();
    PayEntry {
        id: UNSAVED_ID,
        week_start: new.week_start,
        week_end: new.week_end,
        gross_pay: new.gross_pay,
        notes: new.notes.clone(),
        taxes: TaxResult::default(),
        created_at: now,
        updated_at: now,
    }
}

fn first_on_or_after(
    rows: &[PayEntry],
    week_start: NaiveDate,
) -> usize {
    rows.partition_point(|row| row.week_start < week_start)
}

/// Rows accepted by `keep`, in walk order.
fn rows_where(
    rows: &[PayEntry],
    keep: impl Fn(usize, &PayEntry) -> bool,
) -> Vec<PayEntry> {
    rows.iter()
        .enumerate()
        .filter(|&(index, row)| keep(index, row))
        .map(|(_, row)| row.clone())
        .collect()
}
