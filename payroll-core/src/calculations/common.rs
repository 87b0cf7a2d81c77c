//! Shared arithmetic for payroll calculations.
//!
//! Rounding, clamping and the wage-base rule used by both the engine and the
//! YTD accumulator.

use rust_decimal::{Decimal, RoundingStrategy};

/// Largest gross pay accepted for a single entry (one billion).
///
/// A calendar year holds at most 366 non-overlapping entries, so year-to-date
/// sums stay far inside `Decimal` range.
pub const MAX_GROSS_PAY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// Rounds a decimal value to cents using round-half-to-even.
///
/// Rounding happens per entry, so ties alternate direction instead of
/// drifting upward across a year of entries.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::round_half_even;
///
/// assert_eq!(round_half_even(dec!(123.454)), dec!(123.45));
/// assert_eq!(round_half_even(dec!(123.455)), dec!(123.46));
/// assert_eq!(round_half_even(dec!(123.445)), dec!(123.44));
/// assert_eq!(round_half_even(dec!(123.456)), dec!(123.46));
/// ```
pub fn round_half_even(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

/// Returns the maximum of two decimal values.
pub fn max(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a > b { a } else { b }
}

/// Returns the minimum of two decimal values.
pub fn min(
    a: Decimal,
    b: Decimal,
) -> Decimal {
    if a < b { a } else { b }
}

/// Portion of `gross_pay` still under a wage base.
///
/// `max(0, min(gross_pay, wage_base - cumulative))`. Once `cumulative`
/// reaches the wage base the result is zero; it is never negative.
///
/// # Examples
///
/// ```
/// use rust_decimal_macros::dec;
/// use payroll_core::calculations::common::capped_taxable;
///
/// // Entry straddles the cap: only $100 is left under it.
/// assert_eq!(capped_taxable(dec!(500), dec!(168500), dec!(168600)), dec!(100));
/// // Cap already reached.
/// assert_eq!(capped_taxable(dec!(500), dec!(170000), dec!(168600)), dec!(0));
/// ```
pub fn capped_taxable(
    gross_pay: Decimal,
    cumulative: Decimal,
    wage_base: Decimal,
) -> Decimal {
    max(Decimal::ZERO, min(gross_pay, wage_base - cumulative))
}

/// Length of the overlap between `[start, end)` and `[lower, upper)`.
///
/// An `upper` of `None` is unbounded.
pub fn overlap(
    start: Decimal,
    end: Decimal,
    lower: Decimal,
    upper: Option<Decimal>,
) -> Decimal {
    let from = max(start, lower);
    let to = match upper {
        Some(upper) => min(end, upper),
        None => end,
    };
    max(Decimal::ZERO, to - from)
}
