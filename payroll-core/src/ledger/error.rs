use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::MAX_GROSS_PAY;
use crate::calculations::{ConfigurationError, TaxError};
use crate::db::RepositoryError;

/// Input rejected before anything is computed or written.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("gross pay must be non-negative, got {0}")]
    NegativeGrossPay(Decimal),

    #[error("gross pay {0} exceeds the per-entry limit of {max}", max = MAX_GROSS_PAY)]
    GrossPayTooLarge(Decimal),

    #[error("week end {week_end} is before week start {week_start}")]
    EndBeforeStart {
        week_start: NaiveDate,
        week_end: NaiveDate,
    },

    #[error("week {week_start} to {week_end} overlaps entry {existing_id}")]
    Overlap {
        week_start: NaiveDate,
        week_end: NaiveDate,
        existing_id: i64,
    },
}

#[derive(Debug, Error)]
pub enum PayrollError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),

    /// An entry in the walk could not be recomputed. Nothing was written;
    /// `entry_id` is `None` when the failing entry was the one being created.
    #[error("recomputation of {year} aborted: {source}")]
    RecomputationAborted {
        year: i32,
        entry_id: Option<i64>,
        #[source]
        source: TaxError,
    },

    #[error("storage error: {0}")]
    Repository(#[from] RepositoryError),
}

pub(crate) fn validate_entry(
    week_start: NaiveDate,
    week_end: NaiveDate,
    gross_pay: Decimal,
) -> Result<(), InputError> {
    if gross_pay < Decimal::ZERO {
        return Err(InputError::NegativeGrossPay(gross_pay));
    }
    if gross_pay > MAX_GROSS_PAY {
        return Err(InputError::GrossPayTooLarge(gross_pay));
    }
    if week_end < week_start {
        return Err(InputError::EndBeforeStart {
            week_start,
            week_end,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    use super::*;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn single_day_week_is_valid() {
        assert_eq!(validate_entry(date(1), date(1), dec!(0)), Ok(()));
    }

    #[test]
    fn negative_gross_is_checked_first() {
        assert_eq!(
            validate_entry(date(7), date(1), dec!(-1.00)),
            Err(InputError::NegativeGrossPay(dec!(-1.00)))
        );
    }

    #[test]
    fn gross_pay_above_limit_is_rejected() {
        assert_eq!(validate_entry(date(1), date(7), MAX_GROSS_PAY), Ok(()));
        assert_eq!(
            validate_entry(date(1), date(7), Decimal::MAX),
            Err(InputError::GrossPayTooLarge(Decimal::MAX))
        );
    }

    #[test]
    fn end_before_start_is_rejected() {
        assert_eq!(
            validate_entry(date(7), date(1), dec!(100)),
            Err(InputError::EndBeforeStart {
                week_start: date(7),
                week_end: date(1),
            })
        );
    }

    #[test]
    fn overlap_message_names_existing_entry() {
        let err = InputError::Overlap {
            week_start: date(1),
            week_end: date(7),
            existing_id: 42,
        };

        assert_eq!(err.to_string(), "week 2024-01-01 to 2024-01-07 overlaps entry 42");
    }
}
