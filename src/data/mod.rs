//! Data module - CSV loading, schema and cleaning

mod cleaner;
mod loader;
pub mod schema;

pub use cleaner::{CleanError, CleaningSummary, DataCleaner};
pub use loader::{DataLoader, LoaderError};
pub use schema::{Admission, CleanTable, HospitalSize, MissingCount, RawRecord, RecordTable};
