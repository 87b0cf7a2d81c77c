use std::cmp::Ordering;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxResult;

/// One week of work for the household employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayEntry {
    pub id: i64,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub gross_pay: Decimal,
    pub notes: Option<String>,

    /// Always derived from `gross_pay` and the entry's position in its year.
    pub taxes: TaxResult,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayEntry {
    /// Calendar year the entry belongs to (the year of its week start).
    pub fn tax_year(&self) -> i32 {
        self.week_start.year()
    }

    /// Chronological order within a year: week start, then creation order.
    pub fn chronological_cmp(
        &self,
        other: &Self,
    ) -> Ordering {
        self.week_start
            .cmp(&other.week_start)
            .then_with(|| self.created_at.cmp(&other.created_at))
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// For creating new entries (no id, taxes or timestamps)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPayEntry {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub gross_pay: Decimal,
    pub notes: Option<String>,
}

impl NewPayEntry {
    pub fn tax_year(&self) -> i32 {
        self.week_start.year()
    }
}

/// Partial update of an existing entry. `None` leaves a field unchanged;
/// `notes: Some(None)` clears the note.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayEntryUpdate {
    pub week_start: Option<NaiveDate>,
    pub week_end: Option<NaiveDate>,
    pub gross_pay: Option<Decimal>,
    pub notes: Option<Option<String>>,
}

impl PayEntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.week_start.is_none()
            && self.week_end.is_none()
            && self.gross_pay.is_none()
            && self.notes.is_none()
    }

    /// Returns a copy of `entry` with this update's fields applied.
    /// Taxes are left untouched; the caller recomputes them.
    pub fn apply_to(
        &self,
        entry: &PayEntry,
    ) -> PayEntry {
        let mut updated = entry.clone();
        if let Some(week_start) = self.week_start {
            updated.week_start = week_start;
        }
        if let Some(week_end) = self.week_end {
            updated.week_end = week_end;
        }
        if let Some(gross_pay) = self.gross_pay {
            updated.gross_pay = gross_pay;
        }
        if let Some(notes) = &self.notes {
            updated.notes = notes.clone();
        }
        updated
    }
}

/// Filter for listing entries. Dates are inclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFilter {
    /// Entries whose week starts on or after this date.
    pub start_date: Option<NaiveDate>,
    /// Entries whose week ends on or before this date.
    pub end_date: Option<NaiveDate>,
    pub min_gross_pay: Option<Decimal>,
    pub max_gross_pay: Option<Decimal>,
    pub offset: u32,
    pub limit: u32,
}

impl EntryFilter {
    pub const DEFAULT_LIMIT: u32 = 100;
    pub const MAX_LIMIT: u32 = 1000;

    /// Limit clamped to `1..=MAX_LIMIT`.
    pub fn effective_limit(&self) -> u32 {
        self.limit.clamp(1, Self::MAX_LIMIT)
    }

    pub fn matches(
        &self,
        entry: &PayEntry,
    ) -> bool {
        self.start_date.is_none_or(|d| entry.week_start >= d)
            && self.end_date.is_none_or(|d| entry.week_end <= d)
            && self.min_gross_pay.is_none_or(|g| entry.gross_pay >= g)
            && self.max_gross_pay.is_none_or(|g| entry.gross_pay <= g)
    }
}

impl Default for EntryFilter {
    fn default() -> Self {
        Self {
            start_date: None,
            end_date: None,
            min_gross_pay: None,
            max_gross_pay: None,
            offset: 0,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}
