//! Loading the rate schedule from TOML.
//!
//! ```toml
//! [[tax_years]]
//! tax_year = 2024
//! social_security_rate = "0.062"
//! # ...
//! federal_brackets = [
//!     { ceiling = "11600", rate = "0.10" },
//!     { rate = "0.37" },
//! ]
//! ```

use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use crate::calculations::{ConfigurationError, RateSchedule};
use crate::models::RateTable;

const BUILTIN_RATES: &str = include_str!("../config/rates.toml");

#[derive(Debug, Deserialize)]
struct RatesFile {
    #[serde(default)]
    tax_years: Vec<RateTable>,
}

impl RateSchedule {
    /// Parses a schedule from TOML text.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Parse`] for malformed TOML or a missing field,
    /// otherwise any validation error from [`RateSchedule::new`].
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigurationError> {
        let file: RatesFile = toml::from_str(input)?;
        let schedule = Self::new(file.tax_years)?;
        debug!(years = ?schedule.years(), "rate schedule loaded");
        Ok(schedule)
    }

    /// Reads and parses a schedule file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let contents =
            std::fs::read_to_string(path).map_err(|source| ConfigurationError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::from_toml_str(&contents)
    }

    /// The schedule compiled into the binary (tax year 2024).
    pub fn builtin() -> Result<Self, ConfigurationError> {
        Self::from_toml_str(BUILTIN_RATES)
    }

    /// Loads `path` when given, the built-in schedule otherwise.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigurationError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }
}
