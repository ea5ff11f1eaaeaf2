//! Store error types.

use std::path::PathBuf;

use thiserror::Error;

use crate::table::TableKind;

/// Store operation error.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Nothing has been written for this kind yet.
    #[error("no {kind} table in store")]
    TableNotFound { kind: TableKind },

    /// The kind exists but holds no rows for the identity.
    #[error("no {kind} data stored under {key}")]
    IdentityDataNotFound { kind: TableKind, key: String },

    /// File I/O error.
    #[error("Failed to {operation} file: {path}")]
    Io {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Temp file could not be renamed over the target.
    #[error("Failed to replace {target_path}")]
    AtomicWriteFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The frame already has a column the store uses for the identity key.
    #[error("column {column} is reserved for the identity key")]
    ReservedColumn { column: String },

    /// Stored file does not belong to the requested identity.
    #[error("stored file {path} does not carry key {key}")]
    KeyMismatch { path: PathBuf, key: String },

    #[error("Invalid manifest {path}: {message}")]
    Manifest { path: PathBuf, message: String },

    #[error("Failed to {operation} CSV {path}: {message}")]
    Csv {
        operation: &'static str,
        path: PathBuf,
        message: String,
    },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl StoreError {
    /// Whether the error only signals that nothing is cached yet.
    pub fn is_cache_miss(&self) -> bool {
        matches!(
            self,
            Self::TableNotFound { .. } | Self::IdentityDataNotFound { .. }
        )
    }
}

impl From<polars::prelude::PolarsError> for StoreError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misses_are_classified() {
        assert!(
            StoreError::TableNotFound {
                kind: TableKind::PopulationSlice
            }
            .is_cache_miss()
        );
        assert!(
            StoreError::IdentityDataNotFound {
                kind: TableKind::TreatmentPeriod,
                key: "date=2016-01-01".to_string(),
            }
            .is_cache_miss()
        );
        assert!(
            !StoreError::DataFrame {
                message: "boom".to_string()
            }
            .is_cache_miss()
        );
    }
}
