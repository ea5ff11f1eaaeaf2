//! Data sources for cohort construction.
//!
//! Rule steps read administrative extracts through the [`DataSource`]
//! capability: "given a kind, a date and an optional set of subjects,
//! return a table keyed by subject".
//!
//! # Features
//!
//! - **InMemorySource**: one table per extract, register extracts versioned by date
//! - **CsvDirectorySource**: the same, loaded from `<kind>.csv` files
//! - **frame**: id, date and mask helpers shared with rules and stores

mod csv;
mod error;
pub mod frame;
mod memory;
mod source;

// === Error Types ===
pub use error::{Result, SourceError};

// === Capability ===
pub use source::{DataSource, FetchRequest, SourceKind};

// === Implementations ===
pub use csv::{CsvDirectorySource, read_csv_table};
pub use memory::{DEFAULT_REGISTER_DATE_COLUMN, InMemorySource};
