use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::TaxResult;

/// Wage categories that carry their own annual wage base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WageBaseCategory {
    SocialSecurity,
    Futa,
    Suta,
}

impl WageBaseCategory {
    pub const ALL: [WageBaseCategory; 3] = [Self::SocialSecurity, Self::Futa, Self::Suta];
}

/// Per-category tax totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxTotals {
    pub federal_income_tax: Decimal,
    pub social_security: Decimal,
    pub medicare: Decimal,
    pub state_income_tax: Decimal,
    pub futa: Decimal,
    pub suta: Decimal,
    pub net_pay: Decimal,
}

impl TaxTotals {
    pub fn plus(
        self,
        taxes: &TaxResult,
    ) -> Self {
        Self {
            federal_income_tax: self.federal_income_tax + taxes.federal_income_tax,
            social_security: self.social_security + taxes.social_security,
            medicare: self.medicare + taxes.medicare,
            state_income_tax: self.state_income_tax + taxes.state_income_tax,
            futa: self.futa + taxes.futa,
            suta: self.suta + taxes.suta,
            net_pay: self.net_pay + taxes.net_pay,
        }
    }

    pub fn employee_withholdings(&self) -> Decimal {
        self.federal_income_tax + self.social_security + self.medicare + self.state_income_tax
    }

    pub fn employer_liabilities(&self) -> Decimal {
        self.futa + self.suta
    }
}

/// Cumulative state of a calendar year as of some point in it.
///
/// Snapshots are values: advancing one produces a new snapshot and never
/// changes the old one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YtdSnapshot {
    pub cumulative_gross_pay: Decimal,
    pub social_security_wages: Decimal,
    pub medicare_wages: Decimal,
    pub futa_wages: Decimal,
    pub suta_wages: Decimal,
    pub totals: TaxTotals,
    pub entry_count: usize,
}

impl YtdSnapshot {
    /// The snapshot before the first entry of a year.
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn cumulative_for(
        &self,
        category: WageBaseCategory,
    ) -> Decimal {
        match category {
            WageBaseCategory::SocialSecurity => self.social_security_wages,
            WageBaseCategory::Futa => self.futa_wages,
            WageBaseCategory::Suta => self.suta_wages,
        }
    }

    /// Snapshot after one more entry with the given gross pay and taxes.
    pub fn advance(
        &self,
        gross_pay: Decimal,
        taxes: &TaxResult,
    ) -> Self {
        Self {
            cumulative_gross_pay: self.cumulative_gross_pay + gross_pay,
            social_security_wages: self.social_security_wages + taxes.social_security_wages,
            medicare_wages: self.medicare_wages + gross_pay,
            futa_wages: self.futa_wages + taxes.futa_wages,
            suta_wages: self.suta_wages + taxes.suta_wages,
            totals: self.totals.plus(taxes),
            entry_count: self.entry_count + 1,
        }
    }
}
