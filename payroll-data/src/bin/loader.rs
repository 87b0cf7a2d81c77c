use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use payroll_core::{PayrollLedger, RateSchedule};
use payroll_data::PayEntryLoader;
use payroll_db_sqlite::SqliteRepository;
use tracing_subscriber::EnvFilter;

/// Import weekly pay entries from a CSV file into the payroll database.
///
/// The CSV file should have the following columns:
/// - week_start_date: First day of the work week (YYYY-MM-DD)
/// - week_end_date: Last day of the work week (YYYY-MM-DD)
/// - gross_pay: Gross pay for the week (e.g., 800.00)
/// - notes: Optional free text
///
/// Entries are created oldest week first and taxed with the same year-to-date
/// rules as entries added by hand.
#[derive(Parser, Debug)]
#[command(name = "payroll-loader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the CSV file containing pay entries
    #[arg(short, long)]
    file: PathBuf,

    /// SQLite database URL (e.g., sqlite:payroll.db?mode=rwc to create if missing)
    #[arg(short, long, default_value = "sqlite:payroll.db?mode=rwc")]
    database: String,

    /// Run database migrations before loading data
    #[arg(short, long, default_value_t = false)]
    migrate: bool,

    /// Rate schedule TOML file (the built-in schedule when omitted)
    #[arg(short, long)]
    rates: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();

    let rates = RateSchedule::load(args.rates.as_deref()).with_context(|| match &args.rates {
        Some(path) => format!("Failed to load rate schedule: {}", path.display()),
        None => "Failed to load built-in rate schedule".to_string(),
    })?;

    let repo = SqliteRepository::new(&args.database)
        .await
        .with_context(|| format!("Failed to connect to database: {}", args.database))?;

    if args.migrate {
        println!("Running migrations...");
        repo.run_migrations()
            .await
            .context("Failed to run migrations")?;
        println!("Migrations complete.");
    }

    println!("Loading pay entries from: {}", args.file.display());

    let file = File::open(&args.file)
        .with_context(|| format!("Failed to open: {}", args.file.display()))?;

    let records = PayEntryLoader::parse(file)
        .with_context(|| format!("Failed to parse CSV: {}", args.file.display()))?;

    println!("Parsed {} records from CSV", records.len());

    let ledger = PayrollLedger::new(Box::new(repo), Arc::new(rates));
    let inserted = PayEntryLoader::load(&ledger, &records)
        .await
        .context("Failed to load pay entries into database")?;

    println!("Successfully loaded {} pay entries into the database.", inserted);

    Ok(())
}
