//! Bulk import of pay entries from CSV.

mod loader;

pub use loader::{PayEntryLoader, PayEntryLoaderError, PayEntryRecord};
