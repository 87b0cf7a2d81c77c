use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::PayEntry;
use crate::calculations::common::round_half_even;

/// Aggregate figures over a set of entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollSummary {
    pub entry_count: usize,
    pub total_gross_pay: Decimal,
    pub total_net_pay: Decimal,
    pub total_employee_taxes: Decimal,
    pub total_employer_taxes: Decimal,
    pub total_employer_cost: Decimal,
    pub average_gross_pay: Decimal,
}

impl PayrollSummary {
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a PayEntry>) -> Self {
        let mut summary = entries
            .into_iter()
            .fold(Self::default(), |mut acc, entry| {
                acc.entry_count += 1;
                acc.total_gross_pay += entry.gross_pay;
                acc.total_net_pay += entry.taxes.net_pay;
                acc.total_employee_taxes += entry.taxes.employee_withholdings();
                acc.total_employer_taxes += entry.taxes.employer_liabilities();
                acc.total_employer_cost += entry.taxes.employer_cost(entry.gross_pay);
                acc
            });

        if summary.entry_count > 0 {
            summary.average_gross_pay =
                round_half_even(summary.total_gross_pay / Decimal::from(summary.entry_count));
        }
        summary
    }
}
