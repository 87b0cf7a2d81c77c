//! Payroll tax estimation for one household employee.
//!
//! * [`calculations`] holds the pure pieces: rate tables, the YTD
//!   accumulator and the per-entry [`TaxEngine`](calculations::TaxEngine).
//! * [`ledger`] owns mutation and keeps every year's computed blocks
//!   consistent with entry order.
//! * [`db`] is the storage seam; backends live in their own crates.

pub mod calculations;
pub mod config;
pub mod db;
pub mod ledger;
pub mod models;

pub use calculations::{ConfigurationError, RateSchedule, TaxError};
pub use db::{DbConfig, PayrollRepository, RepositoryError, RepositoryRegistry};
pub use ledger::{InputError, PayrollError, PayrollLedger, RecalcReport, YearState};
pub use models::*;
