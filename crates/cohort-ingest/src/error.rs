//! Error types for data source access.

use std::path::PathBuf;
use thiserror::Error;

use crate::source::SourceKind;

/// Errors raised while fetching source tables.
#[derive(Debug, Error)]
pub enum SourceError {
    // === Source Configuration ===
    /// No table is registered for the requested kind.
    #[error("no {kind} table is available")]
    MissingTable { kind: SourceKind },

    /// A requested or required column is absent from the source table.
    #[error("column '{column}' not found in {kind} table")]
    MissingColumn { kind: SourceKind, column: String },

    // === File System Errors ===
    /// Directory not found or not readable.
    #[error("directory not found: {path}")]
    DirectoryNotFound { path: PathBuf },

    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    // === DataFrame Errors ===
    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for SourceError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for data source operations.
pub type Result<T> = std::result::Result<T, SourceError>;
