//! Payroll tax calculations.
//!
//! Rate lookup, year-to-date accumulation and the per-entry tax engine. All of
//! it is pure: no I/O and no shared mutable state.

pub mod common;
pub mod engine;
pub mod rates;
pub mod ytd;

pub use engine::{TaxEngine, TaxError};
pub use rates::{ConfigurationError, RateSchedule, RateTableError};
pub use ytd::{YtdAccumulator, order_entries};
