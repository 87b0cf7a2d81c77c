//! Plain-text renderings of ledger data for the terminal.

use std::fmt;

use payroll_core::{PayEntry, PayrollSummary, RateTable, RecalcReport, YtdSnapshot};

/// One entry with its full tax breakdown.
pub struct EntryDetail<'a>(pub &'a PayEntry);

impl fmt::Display for EntryDetail<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let entry = self.0;
        let taxes = &entry.taxes;
        writeln!(f, "Entry:              {}", entry.id)?;
        writeln!(f, "Week:               {} to {}", entry.week_start, entry.week_end)?;
        writeln!(f, "Gross pay:          {}", entry.gross_pay)?;
        writeln!(f, "Notes:              {}", entry.notes.as_deref().unwrap_or("-"))?;
        writeln!(f)?;
        writeln!(f, "Federal income tax: {}", taxes.federal_income_tax)?;
        writeln!(
            f,
            "Social Security:    {} (on {})",
            taxes.social_security, taxes.social_security_wages
        )?;
        writeln!(f, "Medicare:           {}", taxes.medicare)?;
        writeln!(f, "State income tax:   {}", taxes.state_income_tax)?;
        writeln!(f, "Net pay:            {}", taxes.net_pay)?;
        writeln!(f)?;
        writeln!(f, "FUTA:               {} (on {})", taxes.futa, taxes.futa_wages)?;
        writeln!(f, "SUTA:               {} (on {})", taxes.suta, taxes.suta_wages)?;
        write!(
            f,
            "Employer cost:      {}",
            taxes.employer_cost(entry.gross_pay)
        )
    }
}

/// Compact one-line-per-entry listing.
pub struct EntryTable<'a>(pub &'a [PayEntry]);

impl fmt::Display for EntryTable<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "No pay entries found.");
        }
        write!(
            f,
            "{:>6}  {:<10}  {:<10}  {:>10}  {:>9}  {:>9}  {:>9}  {:>9}  {:>10}",
            "ID", "START", "END", "GROSS", "FEDERAL", "SS", "MEDICARE", "STATE", "NET"
        )?;
        for entry in self.0 {
            let t = &entry.taxes;
            write!(
                f,
                "\n{:>6}  {:<10}  {:<10}  {:>10}  {:>9}  {:>9}  {:>9}  {:>9}  {:>10}",
                entry.id,
                entry.week_start,
                entry.week_end,
                entry.gross_pay,
                t.federal_income_tax,
                t.social_security,
                t.medicare,
                t.state_income_tax,
                t.net_pay,
            )?;
        }
        Ok(())
    }
}

pub struct SummaryView<'a>(pub &'a PayrollSummary);

impl fmt::Display for SummaryView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = self.0;
        writeln!(f, "Entries:            {}", s.entry_count)?;
        writeln!(f, "Total gross pay:    {}", s.total_gross_pay)?;
        writeln!(f, "Average gross pay:  {}", s.average_gross_pay)?;
        writeln!(f, "Employee taxes:     {}", s.total_employee_taxes)?;
        writeln!(f, "Total net pay:      {}", s.total_net_pay)?;
        writeln!(f, "Employer taxes:     {}", s.total_employer_taxes)?;
        write!(f, "Employer cost:      {}", s.total_employer_cost)
    }
}

pub struct YtdView<'a> {
    pub year: i32,
    pub snapshot: &'a YtdSnapshot,
}

impl fmt::Display for YtdView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = self.snapshot;
        let t = &s.totals;
        writeln!(f, "Year to date {} ({} entries)", self.year, s.entry_count)?;
        writeln!(f)?;
        writeln!(f, "Gross pay:              {}", s.cumulative_gross_pay)?;
        writeln!(f, "Social Security wages:  {}", s.social_security_wages)?;
        writeln!(f, "Medicare wages:         {}", s.medicare_wages)?;
        writeln!(f, "FUTA wages:             {}", s.futa_wages)?;
        writeln!(f, "SUTA wages:             {}", s.suta_wages)?;
        writeln!(f)?;
        writeln!(f, "Federal income tax:     {}", t.federal_income_tax)?;
        writeln!(f, "Social Security:        {}", t.social_security)?;
        writeln!(f, "Medicare:               {}", t.medicare)?;
        writeln!(f, "State income tax:       {}", t.state_income_tax)?;
        writeln!(f, "Employee withholdings:  {}", t.employee_withholdings())?;
        writeln!(f, "Net pay:                {}", t.net_pay)?;
        writeln!(f)?;
        writeln!(f, "FUTA:                   {}", t.futa)?;
        writeln!(f, "SUTA:                   {}", t.suta)?;
        write!(f, "Employer liabilities:   {}", t.employer_liabilities())
    }
}

pub struct RatesView<'a>(pub &'a RateTable);

impl fmt::Display for RatesView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = self.0;
        writeln!(f, "Tax year {}", r.tax_year)?;
        writeln!(f, "Federal brackets (on year-to-date gross):")?;
        for (lower, upper, rate) in r.bracket_ranges() {
            match upper {
                Some(upper) => writeln!(f, "  {:>10} to {:<10} {}", lower, upper, rate)?,
                None => writeln!(f, "  {:>10} and up{:7}{}", lower, "", rate)?,
            }
        }
        writeln!(
            f,
            "Social Security:  {} up to {}",
            r.social_security_rate, r.social_security_wage_base
        )?;
        writeln!(f, "Medicare:         {}", r.medicare_rate)?;
        writeln!(f, "State income tax: {}", r.state_income_tax_rate)?;
        writeln!(f, "FUTA:             {} up to {}", r.futa_rate, r.futa_wage_base)?;
        write!(f, "SUTA:             {} up to {}", r.suta_rate, r.suta_wage_base)
    }
}

pub struct RecalcView<'a>(pub &'a RecalcReport);

impl fmt::Display for RecalcView<'_> {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let r = self.0;
        write!(
            f,
            "Recomputed {}: {} entries walked, {} updated",
            r.year, r.walked, r.changed
        )
    }
}
