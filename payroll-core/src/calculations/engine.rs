//! Tax calculation engine for a single pay entry.
//!
//! Given an entry's gross pay and the [`YtdSnapshot`] immediately before it,
//! the engine derives every withholding and employer liability for the entry.
//!
//! # Calculation Steps
//!
//! | Step | Description |
//! |------|-------------|
//! | 1    | Taxable wages per capped category: `max(0, min(gross, cap - prior))` |
//! | 2    | Flat-rate taxes on taxable wages (SS, FUTA, SUTA) or gross (Medicare, state) |
//! | 3    | Progressive federal tax on `[prior gross, prior gross + gross)` |
//! | 4    | Net pay: gross minus employee withholdings |
//!
//! Every figure is rounded to cents (half to even) per entry.
//!
//! # Example
//!
//! ```
//! use rust_decimal_macros::dec;
//! use payroll_core::calculations::TaxEngine;
//! use payroll_core::{FederalBracket, RateTable, YtdSnapshot};
//!
//! let rates = RateTable {
//!     tax_year: 2024,
//!     federal_brackets: vec![
//!         FederalBracket { ceiling: Some(dec!(50000)), rate: dec!(0.10) },
//!         FederalBracket { ceiling: None, rate: dec!(0.12) },
//!     ],
//!     social_security_rate: dec!(0.062),
//!     medicare_rate: dec!(0.0145),
//!     state_income_tax_rate: dec!(0.0575),
//!     futa_rate: dec!(0.006),
//!     suta_rate: dec!(0.0271),
//!     social_security_wage_base: dec!(168600),
//!     futa_wage_base: dec!(7000),
//!     suta_wage_base: dec!(8000),
//! };
//!
//! let engine = TaxEngine::new(&rates);
//! let result = engine.compute_taxes(dec!(800.00), &YtdSnapshot::zero()).unwrap();
//!
//! assert_eq!(result.federal_income_tax, dec!(80.00));
//! assert_eq!(result.social_security, dec!(49.60));
//! assert_eq!(result.net_pay, dec!(612.80));
//! ```

use rust_decimal::Decimal;
use thiserror::Error;

use crate::calculations::common::{MAX_GROSS_PAY, capped_taxable, overlap, round_half_even};
use crate::calculations::rates::RateTableError;
use crate::models::{RateTable, TaxResult, YtdSnapshot};

/// Errors that reject an engine call before anything is computed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaxError {
    #[error("gross pay must be non-negative, got {0}")]
    NegativeGrossPay(Decimal),

    #[error("gross pay {0} exceeds the per-entry limit of {max}", max = MAX_GROSS_PAY)]
    GrossPayTooLarge(Decimal),

    #[error("invalid rate table: {0}")]
    InvalidRates(#[from] RateTableError),
}

/// Calculator bound to one year's [`RateTable`].
#[derive(Debug, Clone, Copy)]
pub struct TaxEngine<'a> {
    rates: &'a RateTable,
}

impl<'a> TaxEngine<'a> {
    pub fn new(rates: &'a RateTable) -> Self {
        Self { rates }
    }

    pub fn rates(&self) -> &'a RateTable {
        self.rates
    }

    /// Computes all taxes and net pay for one entry.
    ///
    /// A gross pay of zero yields an all-zero result.
    ///
    /// # Errors
    ///
    /// Returns [`TaxError`] if:
    /// - `gross_pay` is negative or above [`MAX_GROSS_PAY`]
    /// - the rate table fails validation
    pub fn compute_taxes(
        &self,
        gross_pay: Decimal,
        prior: &YtdSnapshot,
    ) -> Result<TaxResult, TaxError> {
        if gross_pay < Decimal::ZERO {
            return Err(TaxError::NegativeGrossPay(gross_pay));
        }
        if gross_pay > MAX_GROSS_PAY {
            return Err(TaxError::GrossPayTooLarge(gross_pay));
        }
        self.rates.validate()?;

        let rates = self.rates;

        let social_security_wages = capped_taxable(
            gross_pay,
            prior.social_security_wages,
            rates.social_security_wage_base,
        );
        let futa_wages = capped_taxable(gross_pay, prior.futa_wages, rates.futa_wage_base);
        let suta_wages = capped_taxable(gross_pay, prior.suta_wages, rates.suta_wage_base);

        let federal_income_tax = self.federal_income_tax(gross_pay, prior.cumulative_gross_pay);
        let social_security = round_half_even(social_security_wages * rates.social_security_rate);
        let medicare = round_half_even(gross_pay * rates.medicare_rate);
        let state_income_tax = round_half_even(gross_pay * rates.state_income_tax_rate);
        let futa = round_half_even(futa_wages * rates.futa_rate);
        let suta = round_half_even(suta_wages * rates.suta_rate);

        let net_pay = gross_pay - (federal_income_tax + social_security + medicare + state_income_tax);

        Ok(TaxResult {
            federal_income_tax,
            social_security,
            medicare,
            state_income_tax,
            futa,
            suta,
            net_pay,
            social_security_wages,
            futa_wages,
            suta_wages,
        })
    }

    /// Progressive federal tax on the slice of the year's income this entry
    /// adds: `[prior_gross, prior_gross + gross_pay)`.
    fn federal_income_tax(
        &self,
        gross_pay: Decimal,
        prior_gross: Decimal,
    ) -> Decimal {
        let start = prior_gross;
        let end = prior_gross + gross_pay;

        let tax: Decimal = self
            .rates
            .bracket_ranges()
            .map(|(lower, upper, rate)| overlap(start, end, lower, upper) * rate)
            .sum();

        round_half_even(tax)
    }
}
