//! Memoized snapshot storage.
//!
//! Snapshots are stored per (table kind, identity). Every stored frame
//! carries synthetic `key_*` columns encoding the flattened identity, so
//! several identities can share one physical table and be filtered back out.
//!
//! # Features
//!
//! - **MemoizedStore**: `exists` / `read` / `write` with replace-on-key writes
//! - **InMemoryStore**: partitions held in memory, with a write counter
//! - **CsvStore**: one CSV file and manifest per identity, atomically replaced

mod csv;
mod error;
mod memory;
mod store;
pub mod table;

// === Error Types ===
pub use error::{Result, StoreError};

// === Capability ===
pub use store::MemoizedStore;
pub use table::{KEY_COLUMN_PREFIX, TableKind};

// === Implementations ===
pub use csv::{CsvStore, key_digest};
pub use memory::InMemoryStore;
