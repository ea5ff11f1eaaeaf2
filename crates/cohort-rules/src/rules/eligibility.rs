//! Per-subject eligibility flags and their aggregate.

use std::collections::{BTreeMap, BTreeSet};

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use cohort_ingest::frame::string_values;
use cohort_model::{DateOffset, Identity};

use crate::error::{Result, RuleError};
use crate::flags::{append_flag, bools, dates, require_column, require_data, require_identity};
use crate::step::{RuleStep, StepContext};

fn default_date_of_birth_col() -> String {
    "date_of_birth".to_string()
}

fn default_code_col() -> String {
    "lr_code".to_string()
}

fn default_claim_start_col() -> String {
    "clm_comm_date".to_string()
}

fn default_eligible_col() -> String {
    "eligible_population".to_string()
}

fn require_bound(
    rule: &'static str,
    min: Option<&DateOffset>,
    max: Option<&DateOffset>,
) -> Result<()> {
    if min.is_none() && max.is_none() {
        return Err(RuleError::InvalidParameter {
            rule,
            message: "at least one of the minimum or maximum bounds is required".to_string(),
        });
    }
    Ok(())
}

/// Flags rows whose event date lies within `[min, max)` before the anchor.
///
/// With `min`, the date must be on or before `anchor - min`; with `max`, it
/// must be after `anchor - max`. Missing dates are never eligible.
fn window_flags(
    rule: &'static str,
    identity: &Identity,
    data: &DataFrame,
    column: &str,
    min: Option<&DateOffset>,
    max: Option<&DateOffset>,
) -> Result<Vec<bool>> {
    let anchor = identity.reference_date();
    let latest = min.map(|offset| offset.before(anchor)).transpose()?;
    let earliest = max.map(|offset| offset.before(anchor)).transpose()?;
    Ok(dates(rule, data, column)?
        .into_iter()
        .map(|value| {
            value.is_some_and(|date| {
                latest.is_none_or(|latest| date <= latest)
                    && earliest.is_none_or(|earliest| date > earliest)
            })
        })
        .collect())
}

/// Age at the reference date within bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgeEligible {
    #[serde(default = "default_date_of_birth_col")]
    pub date_of_birth_col: String,
    /// Minimum age, inclusive.
    #[serde(default)]
    pub min_age: Option<DateOffset>,
    /// Maximum age, exclusive.
    #[serde(default)]
    pub max_age: Option<DateOffset>,
}

impl AgeEligible {
    pub const NAME: &'static str = "age_eligible";

    pub fn validate(&self) -> Result<()> {
        require_bound(Self::NAME, self.min_age.as_ref(), self.max_age.as_ref())
    }
}

impl RuleStep for AgeEligible {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(
        &self,
        _ctx: &StepContext<'_>,
        identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let identity = require_identity(Self::NAME, identity)?;
        let data = require_data(Self::NAME, data)?;
        let flags = window_flags(
            Self::NAME,
            identity,
            data,
            &self.date_of_birth_col,
            self.min_age.as_ref(),
            self.max_age.as_ref(),
        )?;
        append_flag(data, Self::NAME, flags)
    }
}

/// Claim code among the eligible codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimCodeEligible {
    #[serde(default = "default_code_col")]
    pub code_col: String,
    pub eligible_codes: BTreeSet<String>,
}

impl ClaimCodeEligible {
    pub const NAME: &'static str = "claim_code_eligible";

    pub fn validate(&self) -> Result<()> {
        if self.eligible_codes.is_empty() {
            return Err(RuleError::InvalidParameter {
                rule: Self::NAME,
                message: "eligible_codes must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl RuleStep for ClaimCodeEligible {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(
        &self,
        _ctx: &StepContext<'_>,
        _identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let data = require_data(Self::NAME, data)?;
        require_column(Self::NAME, data, &self.code_col)?;
        let flags = string_values(data, &self.code_col)?
            .iter()
            .map(|code| {
                code.as_deref()
                    .is_some_and(|code| self.eligible_codes.contains(code.trim()))
            })
            .collect();
        append_flag(data, Self::NAME, flags)
    }
}

/// Claim duration at the reference date within bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimDurationEligible {
    #[serde(default = "default_claim_start_col")]
    pub claim_start_col: String,
    /// Minimum duration, inclusive.
    #[serde(default)]
    pub min_duration: Option<DateOffset>,
    /// Maximum duration, exclusive.
    #[serde(default)]
    pub max_duration: Option<DateOffset>,
}

impl ClaimDurationEligible {
    pub const NAME: &'static str = "claim_duration_eligible";

    pub fn validate(&self) -> Result<()> {
        require_bound(
            Self::NAME,
            self.min_duration.as_ref(),
            self.max_duration.as_ref(),
        )
    }
}

impl RuleStep for ClaimDurationEligible {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(
        &self,
        _ctx: &StepContext<'_>,
        identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let identity = require_identity(Self::NAME, identity)?;
        let data = require_data(Self::NAME, data)?;
        let flags = window_flags(
            Self::NAME,
            identity,
            data,
            &self.claim_start_col,
            self.min_duration.as_ref(),
            self.max_duration.as_ref(),
        )?;
        append_flag(data, Self::NAME, flags)
    }
}

/// Logical AND over boolean columns, each compared to its required value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligiblePopulation {
    pub eligibility_criteria: BTreeMap<String, bool>,
    #[serde(default = "default_eligible_col")]
    pub output_col: String,
}

impl EligiblePopulation {
    pub const NAME: &'static str = "eligible_population";

    pub fn new(criteria: impl IntoIterator<Item = (String, bool)>) -> Self {
        Self {
            eligibility_criteria: criteria.into_iter().collect(),
            output_col: default_eligible_col(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.eligibility_criteria.is_empty() {
            return Err(RuleError::InvalidParameter {
                rule: Self::NAME,
                message: "eligibility_criteria must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

impl RuleStep for EligiblePopulation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(
        &self,
        _ctx: &StepContext<'_>,
        _identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let data = require_data(Self::NAME, data)?;
        let mut eligible = vec![true; data.height()];
        for (column, required) in &self.eligibility_criteria {
            let values = bools(Self::NAME, data, column)?;
            for (flag, value) in eligible.iter_mut().zip(values) {
                *flag &= value == *required;
            }
        }
        append_flag(data, &self.output_col, eligible)
    }
}
