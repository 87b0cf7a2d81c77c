use std::fs::File;
use std::sync::Arc;

use anyhow::{Context, Result};
use payroll_core::db::{MemoryRepositoryFactory, RepositoryRegistry};
use payroll_core::{PayrollLedger, RateSchedule};
use payroll_data::PayEntryLoader;
use payroll_db_sqlite::SqliteRepositoryFactory;
use tracing::debug;

use crate::cli::{Command, entry_update, new_entry};
use crate::config::AppConfig;
use crate::export;
use crate::views::{EntryDetail, EntryTable, RatesView, RecalcView, SummaryView, YtdView};

/// Build a [`RepositoryRegistry`] pre-loaded with every available backend.
pub fn build_registry() -> RepositoryRegistry {
    let mut registry = RepositoryRegistry::new();
    registry.register(Box::new(SqliteRepositoryFactory));
    registry.register(Box::new(MemoryRepositoryFactory));
    registry
}

/// Loads the rate schedule and opens the configured storage backend.
pub async fn open_ledger(config: &AppConfig) -> Result<PayrollLedger> {
    let rates_path = config.rates.path.as_deref();
    let rates = RateSchedule::load(rates_path).with_context(|| match rates_path {
        Some(path) => format!("Failed to load rate schedule: {}", path.display()),
        None => "Failed to load built-in rate schedule".to_string(),
    })?;

    let db_config = config.db_config();
    debug!(
        backend = %db_config.backend,
        connection = %db_config.connection_string,
        years = ?rates.years(),
        "opening ledger"
    );
    let repo = build_registry().create(&db_config).await.with_context(|| {
        format!(
            "Failed to open {} database: {}",
            db_config.backend, db_config.connection_string
        )
    })?;

    Ok(PayrollLedger::new(repo, Arc::new(rates)))
}

/// Runs one command and returns the text to print.
pub async fn execute(
    ledger: &PayrollLedger,
    command: Command,
) -> Result<String> {
    let output = match command {
        Command::Add {
            week_start,
            week_end,
            gross,
            notes,
        } => {
            let entry = ledger
                .create_entry(new_entry(week_start, week_end, gross, notes))
                .await?;
            EntryDetail(&entry).to_string()
        }
        Command::Update {
            id,
            week_start,
            week_end,
            gross,
            notes,
            clear_notes,
        } => {
            let update = entry_update(week_start, week_end, gross, notes, clear_notes);
            let entry = ledger.update_entry(id, update).await?;
            EntryDetail(&entry).to_string()
        }
        Command::Delete { id } => {
            ledger.delete_entry(id).await?;
            format!("Deleted entry {id}.")
        }
        Command::Show { id } => EntryDetail(&ledger.entry(id).await?).to_string(),
        Command::List(args) => {
            let entries = ledger.list_entries(&args.to_filter()).await?;
            EntryTable(&entries).to_string()
        }
        Command::Summary(args) => {
            let summary = ledger.summary(&args.to_filter()).await?;
            SummaryView(&summary).to_string()
        }
        Command::Ytd { year } => {
            let snapshot = ledger.ytd_for_year(year).await?;
            YtdView {
                year,
                snapshot: &snapshot,
            }
            .to_string()
        }
        Command::Recalc { year } => {
            let report = ledger.recompute_year(year).await?;
            RecalcView(&report).to_string()
        }
        Command::Rates { year } => {
            let rates = ledger.rates();
            let years = match year {
                Some(year) => vec![year],
                None => rates.years(),
            };
            let mut tables = Vec::with_capacity(years.len());
            for year in years {
                tables.push(RatesView(rates.rates_for(year)?).to_string());
            }
            tables.join("\n\n")
        }
        Command::Import { file } => {
            let reader =
                File::open(&file).with_context(|| format!("Failed to open: {}", file.display()))?;
            let records = PayEntryLoader::parse(reader)
                .with_context(|| format!("Failed to parse CSV: {}", file.display()))?;
            let inserted = PayEntryLoader::load(ledger, &records).await?;
            format!("Imported {inserted} pay entries from {}.", file.display())
        }
        Command::Export {
            format,
            output,
            filter,
        } => {
            let entries = ledger.all_entries(&filter.to_filter()).await?;
            let text = export::render(&entries, format)?;
            match output {
                Some(path) => {
                    std::fs::write(&path, text)
                        .with_context(|| format!("Failed to write: {}", path.display()))?;
                    format!("Exported {} pay entries to {}.", entries.len(), path.display())
                }
                None => text,
            }
        }
    };
    Ok(output)
}
