use chrono::NaiveDate;
use thiserror::Error;

use cohort_ingest::SourceError;
use cohort_model::ModelError;

/// Errors raised while building or running rule pipelines.
#[derive(Debug, Error)]
pub enum RuleError {
    /// No pipeline is in force on the query date.
    #[error("no rule configuration in force on {date}")]
    ConfigurationResolution { date: NaiveDate },

    #[error("rule '{rule}' has invalid parameters: {message}")]
    InvalidParameter { rule: &'static str, message: String },

    #[error("rule '{rule}' requires column '{column}'")]
    MissingColumn { rule: &'static str, column: String },

    #[error("rule '{rule}' requires input data")]
    MissingInput { rule: &'static str },

    #[error("rule '{rule}' requires a dated identity")]
    MissingIdentity { rule: &'static str },

    #[error("pipeline has no steps and no seed data")]
    EmptyPipeline,

    /// Subject ids are not unique after the pipeline ran.
    #[error("{count} subject ids occur more than once (first: {first})")]
    IdentityCollision { count: usize, first: String },

    #[error("upstream fetch failed: {0}")]
    UpstreamFetch(#[from] SourceError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for RuleError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RuleError>;
