//! The recomputation walk over one year's entries.

use crate::calculations::{TaxEngine, TaxError, YtdAccumulator};
use crate::models::{PayEntry, RateTable};

/// Id carried by a row that has not been stored yet.
pub(crate) const UNSAVED_ID: i64 = 0;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Walk {
    pub walked: usize,
    /// Indices of rows whose computed block changed.
    pub changed: Vec<usize>,
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) struct WalkFailure {
    pub entry_id: Option<i64>,
    pub source: TaxError,
}

/// Recomputes `rows[from..]` in place, starting from the YTD of `rows[..from]`.
///
/// `rows` must hold one year's entries in chronological order. On failure the
/// rows already visited have been rewritten; callers discard the working copy.
pub(crate) fn recompute_from(
    rows: &mut [PayEntry],
    from: usize,
    rates: &RateTable,
) -> Result<Walk, WalkFailure> {
    let engine = TaxEngine::new(rates);
    let mut snapshot = YtdAccumulator::accumulate(&rows[..from], rates.tax_year, rates);
    let mut changed = Vec::new();

    for (index, row) in rows.iter_mut().enumerate().skip(from) {
        let taxes = engine
            .compute_taxes(row.gross_pay, &snapshot)
            .map_err(|source| WalkFailure {
                entry_id: (row.id != UNSAVED_ID).then_some(row.id),
                source,
            })?;
        if taxes != row.taxes {
            row.taxes = taxes;
            changed.push(index);
        }
        snapshot = YtdAccumulator::step(&snapshot, row.gross_pay, &taxes, rates);
    }

    Ok(Walk {
        walked: rows.len() - from,
        changed,
    })
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use super::*;
    use crate::models::{FederalBracket, TaxResult};

    fn rates() -> RateTable {
        RateTable {
            tax_year: 2024,
            federal_brackets: vec![
                FederalBracket {
                    ceiling: Some(dec!(1000)),
                    rate: dec!(0.10),
                },
                FederalBracket {
                    ceiling: None,
                    rate: dec!(0.20),
                },
            ],
            social_security_rate: dec!(0.062),
            medicare_rate: dec!(0.0145),
            state_income_tax_rate: dec!(0.0575),
            futa_rate: dec!(0.006),
            suta_rate: dec!(0.0271),
            social_security_wage_base: dec!(168600),
            futa_wage_base: dec!(7000),
            suta_wage_base: dec!(8000),
        }
    }

    fn row(
        id: i64,
        week: u64,
        gross_pay: Decimal,
    ) -> PayEntry {
        let week_start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(7 * week);
        let created_at = Utc.timestamp_opt(1_700_000_000 + id, 0).unwrap();
        PayEntry {
            id,
            week_start,
            week_end: week_start + chrono::Days::new(6),
            gross_pay,
            notes: None,
            taxes: TaxResult::default(),
            created_at,
            updated_at: created_at,
        }
    }

    #[test]
    fn walk_from_start_fills_every_row() {
        let mut rows = vec![row(1, 0, dec!(800)), row(2, 1, dec!(800))];

        let walk = recompute_from(&mut rows, 0, &rates()).unwrap();

        assert_eq!(walk, Walk { walked: 2, changed: vec![0, 1] });
        assert_eq!(rows[0].taxes.federal_income_tax, dec!(80.00));
        // 200 at 10% plus 600 at 20%
        assert_eq!(rows[1].taxes.federal_income_tax, dec!(140.00));
    }

    #[test]
    fn rows_before_start_are_untouched() {
        let mut rows = vec![row(1, 0, dec!(800)), row(2, 1, dec!(800))];
        recompute_from(&mut rows, 0, &rates()).unwrap();
        rows[0].taxes.federal_income_tax = dec!(999.99);

        let walk = recompute_from(&mut rows, 1, &rates()).unwrap();

        assert_eq!(walk, Walk { walked: 1, changed: vec![] });
        assert_eq!(rows[0].taxes.federal_income_tax, dec!(999.99));
    }

    #[test]
    fn second_walk_changes_nothing() {
        let mut rows = vec![row(1, 0, dec!(3000)), row(2, 1, dec!(3000)), row(3, 2, dec!(3000))];
        recompute_from(&mut rows, 0, &rates()).unwrap();
        let first = rows.clone();

        let walk = recompute_from(&mut rows, 0, &rates()).unwrap();

        assert!(walk.changed.is_empty());
        assert_eq!(rows, first);
    }

    #[test]
    fn failure_names_the_stored_entry() {
        let mut rows = vec![row(1, 0, dec!(800)), row(7, 1, dec!(-5))];

        let failure = recompute_from(&mut rows, 0, &rates()).unwrap_err();

        assert_eq!(
            failure,
            WalkFailure {
                entry_id: Some(7),
                source: TaxError::NegativeGrossPay(dec!(-5)),
            }
        );
    }

    #[test]
    fn failure_on_unsaved_row_has_no_id() {
        let mut rows = vec![row(UNSAVED_ID, 0, dec!(-1))];

        let failure = recompute_from(&mut rows, 0, &rates()).unwrap_err();

        assert_eq!(failure.entry_id, None);
    }
}
