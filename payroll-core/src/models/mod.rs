mod pay_entry;
mod rate_table;
mod summary;
mod tax_result;
mod ytd_snapshot;

pub use pay_entry::{EntryFilter, NewPayEntry, PayEntry, PayEntryUpdate};
pub use rate_table::{FederalBracket, RateTable};
pub use summary::PayrollSummary;
pub use tax_result::TaxResult;
pub use ytd_snapshot::{TaxTotals, WageBaseCategory, YtdSnapshot};
