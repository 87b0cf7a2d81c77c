//! Rate/bracket lookup and rate-table validation.
//!
//! A [`RateSchedule`] is the year-keyed set of [`RateTable`]s loaded once at
//! start-up. It is immutable afterwards and shared behind an `Arc`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::RateTable;

/// Problems found in a single rate table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RateTableError {
    #[error("no federal brackets configured")]
    NoBrackets,

    #[error("federal bracket {index} ceiling {ceiling} does not exceed the previous ceiling")]
    UnsortedBrackets { index: usize, ceiling: Decimal },

    #[error("only the last federal bracket may be open-ended (bracket {0} has no ceiling)")]
    OpenBracketNotLast(usize),

    #[error("the last federal bracket must be open-ended")]
    MissingOpenEndedBracket,

    #[error("{name} must be between 0 and 1, got {value}")]
    RateOutOfRange { name: &'static str, value: Decimal },

    #[error("{name} wage base must be non-negative, got {value}")]
    NegativeWageBase { name: &'static str, value: Decimal },
}

/// Fatal configuration problems: missing years, unreadable or invalid tables.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("no rate table configured for tax year {0}")]
    NoRatesForYear(i32),

    #[error("rate table for tax year {0} is declared more than once")]
    DuplicateYear(i32),

    #[error("rate table for tax year {year} is invalid: {source}")]
    InvalidTable {
        year: i32,
        #[source]
        source: RateTableError,
    },

    #[error("failed to read rates file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse rates: {0}")]
    Parse(#[from] toml::de::Error),
}

impl RateTable {
    /// Checks every rate, wage base and the bracket ordering.
    ///
    /// # Errors
    ///
    /// Returns [`RateTableError`] describing the first problem found.
    pub fn validate(&self) -> Result<(), RateTableError> {
        if self.federal_brackets.is_empty() {
            return Err(RateTableError::NoBrackets);
        }

        let last = self.federal_brackets.len() - 1;
        let mut previous = Decimal::ZERO;
        for (index, bracket) in self.federal_brackets.iter().enumerate() {
            check_rate("federal bracket rate", bracket.rate)?;
            match bracket.ceiling {
                Some(ceiling) if ceiling <= previous => {
                    return Err(RateTableError::UnsortedBrackets { index, ceiling });
                }
                Some(_) if index == last => return Err(RateTableError::MissingOpenEndedBracket),
                Some(ceiling) => previous = ceiling,
                None if index != last => return Err(RateTableError::OpenBracketNotLast(index)),
                None => {}
            }
        }

        check_rate("social security rate", self.social_security_rate)?;
        check_rate("medicare rate", self.medicare_rate)?;
        check_rate("state income tax rate", self.state_income_tax_rate)?;
        check_rate("FUTA rate", self.futa_rate)?;
        check_rate("SUTA rate", self.suta_rate)?;

        check_wage_base("social security", self.social_security_wage_base)?;
        check_wage_base("FUTA", self.futa_wage_base)?;
        check_wage_base("SUTA", self.suta_wage_base)?;
        Ok(())
    }
}

fn check_rate(
    name: &'static str,
    value: Decimal,
) -> Result<(), RateTableError> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(RateTableError::RateOutOfRange { name, value });
    }
    Ok(())
}

fn check_wage_base(
    name: &'static str,
    value: Decimal,
) -> Result<(), RateTableError> {
    if value < Decimal::ZERO {
        return Err(RateTableError::NegativeWageBase { name, value });
    }
    Ok(())
}

/// Year-keyed rate tables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSchedule {
    tables: BTreeMap<i32, RateTable>,
}

impl RateSchedule {
    /// Builds a schedule, validating every table and rejecting duplicate years.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::DuplicateYear`] or
    /// [`ConfigurationError::InvalidTable`].
    pub fn new(tables: Vec<RateTable>) -> Result<Self, ConfigurationError> {
        let mut by_year = BTreeMap::new();
        for table in tables {
            table
                .validate()
                .map_err(|source| ConfigurationError::InvalidTable {
                    year: table.tax_year,
                    source,
                })?;
            let year = table.tax_year;
            if by_year.insert(year, table).is_some() {
                return Err(ConfigurationError::DuplicateYear(year));
            }
        }
        Ok(Self { tables: by_year })
    }

    /// Looks up the table for `year`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigurationError::NoRatesForYear`]; another year's rates are
    /// never substituted.
    pub fn rates_for(
        &self,
        year: i32,
    ) -> Result<&RateTable, ConfigurationError> {
        self.tables
            .get(&year)
            .ok_or(ConfigurationError::NoRatesForYear(year))
    }

    /// Configured years, ascending.
    pub fn years(&self) -> Vec<i32> {
        self.tables.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
