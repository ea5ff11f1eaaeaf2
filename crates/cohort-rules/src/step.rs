//! The rule step capability and its execution context.

use std::fmt;

use polars::prelude::DataFrame;

use cohort_ingest::{DataSource, FetchRequest};
use cohort_model::Identity;

use crate::error::Result;

/// Everything a step may read besides its own parameters.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    source: &'a dyn DataSource,
}

impl<'a> StepContext<'a> {
    pub fn new(source: &'a dyn DataSource) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &'a dyn DataSource {
        self.source
    }

    /// Subject identifier column shared by every snapshot.
    pub fn id_column(&self) -> &'a str {
        self.source.id_column()
    }

    pub fn fetch(&self, request: &FetchRequest) -> Result<DataFrame> {
        Ok(self.source.fetch(request)?)
    }
}

impl fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("id_column", &self.id_column())
            .finish()
    }
}

/// A single parametrized transformation of a population table.
///
/// Without `data` the step produces seed data itself (typically a source
/// fetch for `identity`). With `data` it returns an augmented copy; the input
/// is never modified. Output must depend only on the parameters, the
/// identity, the input table and the source contents.
pub trait RuleStep: fmt::Debug + Send + Sync {
    /// Registry name of the rule.
    fn name(&self) -> &'static str;

    fn run(
        &self,
        ctx: &StepContext<'_>,
        identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame>;
}
