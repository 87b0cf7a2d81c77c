use std::io::Read;

use chrono::NaiveDate;
use payroll_core::{NewPayEntry, PayrollError, PayrollLedger};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur when importing pay entries.
#[derive(Debug, Error)]
pub enum PayEntryLoaderError {
    /// Malformed CSV. The message carries the record and line number.
    #[error("CSV parse error: {0}")]
    CsvParse(String),

    #[error("entry for week starting {week_start} was rejected: {source}")]
    Payroll {
        week_start: NaiveDate,
        #[source]
        source: PayrollError,
    },
}

impl From<csv::Error> for PayEntryLoaderError {
    fn from(err: csv::Error) -> Self {
        PayEntryLoaderError::CsvParse(err.to_string())
    }
}

/// A single row of a pay entry CSV file.
///
/// Columns:
/// - `week_start_date`: first day of the work week (`YYYY-MM-DD`)
/// - `week_end_date`: last day of the work week
/// - `gross_pay`: gross pay for the week, e.g. `800.00`
/// - `notes`: optional free text; the column itself may be left out
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct PayEntryRecord {
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    #[serde(deserialize_with = "deserialize_decimal")]
    pub gross_pay: Decimal,
    #[serde(default, deserialize_with = "deserialize_optional_note")]
    pub notes: Option<String>,
}

impl PayEntryRecord {
    pub fn to_new_entry(&self) -> NewPayEntry {
        NewPayEntry {
            week_start: self.week_start_date,
            week_end: self.week_end_date,
            gross_pay: self.gross_pay,
            notes: self.notes.clone(),
        }
    }
}

// Parsed from the raw text so the written scale survives ("800.00" stays 800.00).
fn deserialize_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.trim().parse::<Decimal>().map_err(serde::de::Error::custom)
}

fn deserialize_optional_note<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    Ok(s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty()))
}

/// Imports pay entries from CSV through a [`PayrollLedger`].
///
/// Every record goes through [`PayrollLedger::create_entry`], so imported
/// entries are validated and taxed exactly like hand-entered ones.
pub struct PayEntryLoader;

impl PayEntryLoader {
    /// Parse pay entry records from a CSV reader.
    ///
    /// Fields are trimmed. An empty or blank `notes` cell becomes `None`.
    pub fn parse<R: Read>(reader: R) -> Result<Vec<PayEntryRecord>, PayEntryLoaderError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut records = Vec::new();

        for result in csv_reader.deserialize() {
            let record: PayEntryRecord = result?;
            records.push(record);
        }

        Ok(records)
    }

    /// Creates one entry per record, earliest week first.
    ///
    /// Loading in chronological order means no stored entry has to be
    /// recomputed because of a later row in the file. Stops at the first
    /// rejected record; records before it stay stored.
    ///
    /// Returns the number of entries created.
    pub async fn load(
        ledger: &PayrollLedger,
        records: &[PayEntryRecord],
    ) -> Result<usize, PayEntryLoaderError> {
        let mut ordered: Vec<&PayEntryRecord> = records.iter().collect();
        ordered.sort_by_key(|record| record.week_start_date);

        let mut inserted = 0;
        for record in ordered {
            let entry = ledger
                .create_entry(record.to_new_entry())
                .await
                .map_err(|source| PayEntryLoaderError::Payroll {
                    week_start: record.week_start_date,
                    source,
                })?;
            debug!(entry_id = entry.id, week_start = %entry.week_start, "Imported pay entry");
            inserted += 1;
        }

        info!(inserted, "Pay entry import complete");
        Ok(inserted)
    }
}
