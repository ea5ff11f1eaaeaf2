use std::path::PathBuf;

use thiserror::Error;

use cohort_ingest::SourceError;
use cohort_model::{ModelError, PeriodId};
use cohort_rules::RuleError;
use cohort_store::StoreError;

/// Errors raised while building or running an evaluation model.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    /// One treatment period failed; siblings are unaffected.
    #[error("{id} failed: {source}")]
    Period {
        id: PeriodId,
        #[source]
        source: Box<EngineError>,
    },

    #[error("Failed to read model config {path}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid model config {path}: {message}")]
    ConfigParse { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, EngineError>;
