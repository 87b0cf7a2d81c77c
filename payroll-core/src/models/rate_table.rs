use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One step of the progressive federal schedule.
///
/// The lower bound is implied by the previous bracket's ceiling (zero for the
/// first bracket). A `ceiling` of `None` marks the open-ended top bracket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FederalBracket {
    #[serde(default)]
    pub ceiling: Option<Decimal>,
    pub rate: Decimal,
}

/// Rates, brackets and wage bases for one tax year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub tax_year: i32,

    /// Ordered by ceiling, ascending. The last bracket must be open-ended.
    pub federal_brackets: Vec<FederalBracket>,

    // Employee-side flat rates
    pub social_security_rate: Decimal,
    pub medicare_rate: Decimal,
    pub state_income_tax_rate: Decimal,

    // Employer-only flat rates
    pub futa_rate: Decimal,
    pub suta_rate: Decimal,

    // Wage-base caps
    pub social_security_wage_base: Decimal,
    pub futa_wage_base: Decimal,
    pub suta_wage_base: Decimal,
}

impl RateTable {
    /// Iterates the federal brackets as `(lower_bound, upper_bound, rate)`.
    ///
    /// `upper_bound` is `None` for the open-ended top bracket.
    pub fn bracket_ranges(&self) -> impl Iterator<Item = (Decimal, Option<Decimal>, Decimal)> + '_ {
        let mut lower = Decimal::ZERO;
        self.federal_brackets.iter().map(move |bracket| {
            let range = (lower, bracket.ceiling, bracket.rate);
            if let Some(ceiling) = bracket.ceiling {
                lower = ceiling;
            }
            range
        })
    }
}
