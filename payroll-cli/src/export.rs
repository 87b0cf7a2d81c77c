//! CSV and JSON renderings of stored pay entries.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;
use payroll_core::PayEntry;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

/// One exported entry, flattened so it maps onto a CSV row.
#[derive(Debug, Serialize)]
pub struct ExportRow<'a> {
    pub id: i64,
    pub week_start_date: NaiveDate,
    pub week_end_date: NaiveDate,
    pub gross_pay: Decimal,
    pub net_pay: Decimal,
    pub total_cost: Decimal,
    pub federal_income_tax: Decimal,
    pub social_security: Decimal,
    pub medicare: Decimal,
    pub state_income_tax: Decimal,
    pub futa: Decimal,
    pub suta: Decimal,
    pub employee_withholdings: Decimal,
    pub employer_liabilities: Decimal,
    pub notes: Option<&'a str>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl<'a> From<&'a PayEntry> for ExportRow<'a> {
    fn from(entry: &'a PayEntry) -> Self {
        let taxes = &entry.taxes;
        Self {
            id: entry.id,
            week_start_date: entry.week_start,
            week_end_date: entry.week_end,
            gross_pay: entry.gross_pay,
            net_pay: taxes.net_pay,
            total_cost: taxes.employer_cost(entry.gross_pay),
            federal_income_tax: taxes.federal_income_tax,
            social_security: taxes.social_security,
            medicare: taxes.medicare,
            state_income_tax: taxes.state_income_tax,
            futa: taxes.futa,
            suta: taxes.suta,
            employee_withholdings: taxes.employee_withholdings(),
            employer_liabilities: taxes.employer_liabilities(),
            notes: entry.notes.as_deref(),
            created_at: entry.created_at,
            updated_at: entry.updated_at,
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    entries: Vec<ExportRow<'a>>,
    total_count: usize,
}

/// Renders `entries` in `format`. CSV always carries a header row, even when
/// nothing matched.
pub fn render(
    entries: &[PayEntry],
    format: ExportFormat,
) -> Result<String> {
    match format {
        ExportFormat::Csv => to_csv(entries),
        ExportFormat::Json => to_json(entries),
    }
}

fn to_csv(entries: &[PayEntry]) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer
        .write_record(CSV_HEADER)
        .context("Failed to write CSV header")?;
    for entry in entries {
        writer
            .serialize(ExportRow::from(entry))
            .with_context(|| format!("Failed to write entry {} as CSV", entry.id))?;
    }
    let bytes = writer.into_inner().context("Failed to flush CSV output")?;
    String::from_utf8(bytes).context("CSV output is not UTF-8")
}

fn to_json(entries: &[PayEntry]) -> Result<String> {
    let export = JsonExport {
        entries: entries.iter().map(ExportRow::from).collect(),
        total_count: entries.len(),
    };
    serde_json::to_string_pretty(&export).context("Failed to encode entries as JSON")
}

// Kept in field order of `ExportRow`; written by hand so an empty export
// still has a header.
const CSV_HEADER: [&str; 17] = [
    "id",
    "week_start_date",
    "week_end_date",
    "gross_pay",
    "net_pay",
    "total_cost",
    "federal_income_tax",
    "social_security",
    "medicare",
    "state_income_tax",
    "futa",
    "suta",
    "employee_withholdings",
    "employer_liabilities",
    "notes",
    "created_at",
    "updated_at",
];

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use payroll_core::TaxResult;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn entry(notes: Option<&str>) -> PayEntry {
        let now = Utc::now();
        PayEntry {
            id: 4,
            week_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            week_end: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
            gross_pay: dec!(800.00),
            notes: notes.map(str::to_string),
            taxes: TaxResult {
                federal_income_tax: dec!(80.00),
                social_security: dec!(49.60),
                medicare: dec!(11.60),
                state_income_tax: dec!(46.00),
                futa: dec!(4.80),
                suta: dec!(21.68),
                net_pay: dec!(612.80),
                social_security_wages: dec!(800.00),
                futa_wages: dec!(800.00),
                suta_wages: dec!(800.00),
            },
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn empty_csv_is_just_the_header() {
        let text = render(&[], ExportFormat::Csv).unwrap();

        assert_eq!(text, format!("{}\n", CSV_HEADER.join(",")));
    }

    #[test]
    fn csv_row_quotes_notes_with_commas() {
        let text = render(&[entry(Some("holiday, paid"))], ExportFormat::Csv).unwrap();

        let row = text.lines().nth(1).unwrap();
        assert!(
            row.starts_with("4,2024-01-01,2024-01-07,800.00,612.80,826.48,80.00,"),
            "{row}"
        );
        assert!(row.contains(",\"holiday, paid\","), "{row}");
    }

    #[test]
    fn json_counts_entries_and_keeps_null_notes() {
        let text = render(&[entry(None), entry(None)], ExportFormat::Json).unwrap();

        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["total_count"], 2);
        assert_eq!(value["entries"][0]["week_start_date"], "2024-01-01");
        assert_eq!(value["entries"][0]["employee_withholdings"], "187.20");
        assert!(value["entries"][1]["notes"].is_null());
    }
}
