use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use payroll_core::{EntryFilter, NewPayEntry, PayEntryUpdate};
use rust_decimal::Decimal;

use crate::export::ExportFormat;

// ─── CLI definition ──────────────────────────────────────────────────────────

/// Weekly payroll tax ledger for a household employee.
///
/// Every change re-taxes the rest of the calendar year so year-to-date wage
/// bases stay correct no matter which week was edited.
#[derive(Debug, Parser)]
#[command(name = "payroll", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file. Missing is fine; defaults are used.
    #[arg(long, global = true, default_value = "payroll.toml")]
    pub config: PathBuf,

    /// Storage backend (overrides config file).
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Connection string (overrides config file).
    /// For SQLite this is a file path (e.g. `payroll.db`) or `:memory:`.
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Rate schedule TOML file (overrides config file).
    #[arg(long, global = true)]
    pub rates: Option<PathBuf>,

    /// Log level or filter directive (overrides config file; RUST_LOG wins).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a week of pay.
    Add {
        /// First day of the work week (YYYY-MM-DD).
        #[arg(long)]
        week_start: NaiveDate,

        /// Last day of the work week. Defaults to six days after the start.
        #[arg(long)]
        week_end: Option<NaiveDate>,

        /// Gross pay for the week.
        #[arg(long)]
        gross: Decimal,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Change an existing entry. Later weeks of the year are re-taxed.
    Update {
        id: i64,

        #[arg(long)]
        week_start: Option<NaiveDate>,

        #[arg(long)]
        week_end: Option<NaiveDate>,

        #[arg(long)]
        gross: Option<Decimal>,

        #[arg(long, conflicts_with = "clear_notes")]
        notes: Option<String>,

        /// Remove the entry's note.
        #[arg(long)]
        clear_notes: bool,
    },

    /// Remove an entry and re-tax the weeks after it.
    Delete { id: i64 },

    /// Show one entry with its full tax breakdown.
    Show { id: i64 },

    /// List entries, newest week first.
    List(FilterArgs),

    /// Totals over the matching entries.
    Summary(FilterArgs),

    /// Year-to-date wages and taxes.
    Ytd { year: i32 },

    /// Recompute every entry of a year and save whatever drifted.
    Recalc { year: i32 },

    /// Show the configured rate tables.
    Rates {
        /// Only this year.
        year: Option<i32>,
    },

    /// Import pay entries from a CSV file.
    Import { file: PathBuf },

    /// Write every matching entry as CSV or JSON. Paging flags are ignored.
    Export {
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Write to this file instead of printing.
        #[arg(long)]
        output: Option<PathBuf>,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    /// Entries whose week starts on or after this date.
    #[arg(long)]
    pub from: Option<NaiveDate>,

    /// Entries whose week ends on or before this date.
    #[arg(long)]
    pub to: Option<NaiveDate>,

    #[arg(long)]
    pub min_gross: Option<Decimal>,

    #[arg(long)]
    pub max_gross: Option<Decimal>,

    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    #[arg(long, default_value_t = EntryFilter::DEFAULT_LIMIT)]
    pub limit: u32,
}

impl FilterArgs {
    pub fn to_filter(&self) -> EntryFilter {
        EntryFilter {
            start_date: self.from,
            end_date: self.to,
            min_gross_pay: self.min_gross,
            max_gross_pay: self.max_gross,
            offset: self.offset,
            limit: self.limit,
        }
    }
}

/// Builds the entry for `add`, filling in a seven-day week when no end is given.
pub fn new_entry(
    week_start: NaiveDate,
    week_end: Option<NaiveDate>,
    gross_pay: Decimal,
    notes: Option<String>,
) -> NewPayEntry {
    NewPayEntry {
        week_start,
        week_end: week_end.unwrap_or(week_start + chrono::Days::new(6)),
        gross_pay,
        notes,
    }
}

pub fn entry_update(
    week_start: Option<NaiveDate>,
    week_end: Option<NaiveDate>,
    gross_pay: Option<Decimal>,
    notes: Option<String>,
    clear_notes: bool,
) -> PayEntryUpdate {
    let notes = if clear_notes {
        Some(None)
    } else {
        notes.map(Some)
    };
    PayEntryUpdate {
        week_start,
        week_end,
        gross_pay,
        notes,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(
        month: u32,
        day: u32,
    ) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, month, day).unwrap()
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn add_parses_dates_and_decimal() {
        let cli = Cli::try_parse_from([
            "payroll",
            "add",
            "--week-start",
            "2024-01-01",
            "--gross",
            "812.50",
        ])
        .unwrap();

        let Command::Add {
            week_start,
            week_end,
            gross,
            notes,
        } = cli.command
        else {
            panic!("expected add, got {:?}", cli.command);
        };
        assert_eq!(
            new_entry(week_start, week_end, gross, notes),
            NewPayEntry {
                week_start: date(1, 1),
                week_end: date(1, 7),
                gross_pay: dec!(812.50),
                notes: None,
            }
        );
    }

    #[test]
    fn global_overrides_follow_the_subcommand() {
        let cli = Cli::try_parse_from(["payroll", "ytd", "2024", "--db", ":memory:"]).unwrap();

        assert_eq!(cli.db.as_deref(), Some(":memory:"));
        assert_eq!(cli.config, PathBuf::from("payroll.toml"));
    }

    #[test]
    fn bad_date_is_rejected() {
        let result = Cli::try_parse_from([
            "payroll",
            "add",
            "--week-start",
            "01/01/2024",
            "--gross",
            "800",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn clear_notes_conflicts_with_notes() {
        let result = Cli::try_parse_from([
            "payroll",
            "update",
            "3",
            "--notes",
            "x",
            "--clear-notes",
        ]);

        assert!(result.is_err());
    }

    #[test]
    fn update_maps_note_flags() {
        assert_eq!(entry_update(None, None, None, None, true).notes, Some(None));
        assert_eq!(
            entry_update(None, None, None, Some("bonus".into()), false).notes,
            Some(Some("bonus".to_string()))
        );
        assert!(entry_update(None, None, None, None, false).is_empty());
    }

    #[test]
    fn list_filters_default_to_first_page() {
        let cli = Cli::try_parse_from(["payroll", "list", "--min-gross", "500"]).unwrap();

        let Command::List(args) = cli.command else {
            panic!("expected list");
        };
        assert_eq!(
            args.to_filter(),
            EntryFilter {
                min_gross_pay: Some(dec!(500)),
                limit: EntryFilter::DEFAULT_LIMIT,
                ..Default::default()
            }
        );
    }

    #[test]
    fn export_takes_format_and_filters() {
        let cli = Cli::try_parse_from([
            "payroll",
            "export",
            "--format",
            "json",
            "--from",
            "2024-02-01",
        ])
        .unwrap();

        let Command::Export {
            format,
            output,
            filter,
        } = cli.command
        else {
            panic!("expected export");
        };
        assert_eq!(format, ExportFormat::Json);
        assert_eq!(output, None);
        assert_eq!(filter.from, Some(date(2, 1)));
    }

    #[test]
    fn export_defaults_to_csv_and_rejects_unknown_formats() {
        let cli = Cli::try_parse_from(["payroll", "export"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::Export {
                format: ExportFormat::Csv,
                ..
            }
        ));

        assert!(Cli::try_parse_from(["payroll", "export", "--format", "xml"]).is_err());
    }
}
