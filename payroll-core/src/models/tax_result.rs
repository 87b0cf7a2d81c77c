use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Taxes computed for a single pay entry.
///
/// Every amount is already rounded to cents. `net_pay` is gross pay minus the
/// employee-side withholdings only; FUTA and SUTA are employer liabilities and
/// never reduce it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxResult {
    // Employee withholdings
    pub federal_income_tax: Decimal,
    pub social_security: Decimal,
    pub medicare: Decimal,
    pub state_income_tax: Decimal,

    // Employer liabilities
    pub futa: Decimal,
    pub suta: Decimal,

    pub net_pay: Decimal,

    /// Portion of this entry's gross pay under the Social Security wage base.
    pub social_security_wages: Decimal,
    /// Portion of this entry's gross pay under the FUTA wage base.
    pub futa_wages: Decimal,
    /// Portion of this entry's gross pay under the SUTA wage base.
    pub suta_wages: Decimal,
}

impl TaxResult {
    /// Federal income tax + Social Security + Medicare + state income tax.
    pub fn employee_withholdings(&self) -> Decimal {
        self.federal_income_tax + self.social_security + self.medicare + self.state_income_tax
    }

    /// FUTA + SUTA.
    pub fn employer_liabilities(&self) -> Decimal {
        self.futa + self.suta
    }

    /// What the household pays out in total for the week.
    pub fn employer_cost(
        &self,
        gross_pay: Decimal,
    ) -> Decimal {
        gross_pay + self.employer_liabilities()
    }
}
