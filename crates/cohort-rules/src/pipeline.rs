//! Ordered composition of rule steps.
//!
//! Each step consumes the previous step's output. A pipeline can start from
//! nothing (the first step fetches its own seed) or resume from supplied seed
//! data, which is how treatment periods build on their parent slice.
//!
//! # Example
//!
//! ```ignore
//! use cohort_rules::{RuleConfig, RulePipeline, StepContext};
//!
//! let pipeline = RulePipeline::from_configs(configs)?;
//! let snapshot = pipeline.run(&StepContext::new(&source), Some(&identity), None)?;
//! ```

use std::fmt;

use polars::prelude::DataFrame;
use tracing::debug;

use cohort_model::Identity;

use crate::error::{Result, RuleError};
use crate::flags::ensure_unique_ids;
use crate::rules::RuleConfig;
use crate::step::{RuleStep, StepContext};

/// Immutable sequence of boxed rule steps.
#[derive(Default)]
pub struct RulePipeline {
    steps: Vec<Box<dyn RuleStep>>,
}

impl RulePipeline {
    pub fn new(steps: Vec<Box<dyn RuleStep>>) -> Self {
        Self { steps }
    }

    /// Build every step, failing on the first invalid configuration.
    pub fn from_configs(configs: impl IntoIterator<Item = RuleConfig>) -> Result<Self> {
        let steps = configs
            .into_iter()
            .map(RuleConfig::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { steps })
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step in order, threading each output into the next.
    ///
    /// The final table must hold a unique id per row; otherwise the run fails
    /// with [`RuleError::IdentityCollision`]. `seed` is never modified.
    pub fn run(
        &self,
        ctx: &StepContext<'_>,
        identity: Option<&Identity>,
        seed: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let mut current: Option<DataFrame> = None;
        for step in &self.steps {
            let input = current.as_ref().or(seed);
            let output = step.run(ctx, identity, input)?;
            debug!(
                step = step.name(),
                rows = output.height(),
                columns = output.width(),
                "rule step finished"
            );
            current = Some(output);
        }

        let result = match (current, seed) {
            (Some(result), _) => result,
            (None, Some(seed)) => seed.clone(),
            (None, None) => return Err(RuleError::EmptyPipeline),
        };
        ensure_unique_ids(&result, ctx.id_column())?;
        Ok(result)
    }
}

impl fmt::Debug for RulePipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.steps.iter()).finish()
    }
}

impl FromIterator<Box<dyn RuleStep>> for RulePipeline {
    fn from_iter<I: IntoIterator<Item = Box<dyn RuleStep>>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
