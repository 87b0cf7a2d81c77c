//! Year-to-date accumulation over an employee's entries.

use chrono::Datelike;
use rust_decimal::Decimal;

use crate::calculations::common::capped_taxable;
use crate::models::{PayEntry, RateTable, TaxResult, YtdSnapshot};

/// Sorts entries into the order accumulation uses: week start, then
/// creation order.
pub fn order_entries(entries: &mut [PayEntry]) {
    entries.sort_by(PayEntry::chronological_cmp);
}

/// Pure fold of prior entries into a [`YtdSnapshot`].
pub struct YtdAccumulator;

impl YtdAccumulator {
    /// Cumulative state after `prior_entries`.
    ///
    /// Entries outside `as_of_year` are skipped. Taxable wages per capped
    /// category are re-derived from gross pay and the table's wage bases, so
    /// the snapshot does not depend on how those entries were last computed.
    /// Tax totals come from each entry's stored taxes.
    ///
    /// An empty input gives [`YtdSnapshot::zero`].
    pub fn accumulate(
        prior_entries: &[PayEntry],
        as_of_year: i32,
        rates: &RateTable,
    ) -> YtdSnapshot {
        let mut ordered: Vec<&PayEntry> = prior_entries
            .iter()
            .filter(|entry| entry.week_start.year() == as_of_year)
            .collect();
        ordered.sort_by(|a, b| a.chronological_cmp(b));

        ordered
            .into_iter()
            .fold(YtdSnapshot::zero(), |snapshot, entry| {
                Self::step(&snapshot, entry.gross_pay, &entry.taxes, rates)
            })
    }

    /// Advances `snapshot` by one entry.
    ///
    /// The capped wage amounts are recomputed from `gross_pay`; everything
    /// else is taken from `taxes`.
    pub fn step(
        snapshot: &YtdSnapshot,
        gross_pay: Decimal,
        taxes: &TaxResult,
        rates: &RateTable,
    ) -> YtdSnapshot {
        let wages = TaxResult {
            social_security_wages: capped_taxable(
                gross_pay,
                snapshot.social_security_wages,
                rates.social_security_wage_base,
            ),
            futa_wages: capped_taxable(gross_pay, snapshot.futa_wages, rates.futa_wage_base),
            suta_wages: capped_taxable(gross_pay, snapshot.suta_wages, rates.suta_wage_base),
            ..*taxes
        };
        snapshot.advance(gross_pay, &wages)
    }
}
