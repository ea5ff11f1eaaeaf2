//! Steps that seed or filter the population itself.

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use cohort_ingest::{FetchRequest, SourceKind};
use cohort_model::Identity;

use crate::error::Result;
use crate::flags::{
    append_flag, bools, id_set, join_on_id, require_column, require_data, require_identity,
};
use crate::step::{RuleStep, StepContext};

/// Claimants on the Live Register at the reference date.
///
/// Without input it fetches the register extract in force at the identity's
/// reference date. With input it keeps only rows still on the register and
/// refreshes the selected register columns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveRegisterPopulation {
    /// Register columns to carry. Empty means every column.
    pub columns: Vec<String>,
}

impl LiveRegisterPopulation {
    pub const NAME: &'static str = "live_register_population";

    fn request(&self, identity: &Identity) -> FetchRequest {
        let request = FetchRequest::new(SourceKind::ClaimantRegister).at(identity.reference_date());
        if self.columns.is_empty() {
            request
        } else {
            request.with_columns(self.columns.iter().cloned())
        }
    }
}

impl RuleStep for LiveRegisterPopulation {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(
        &self,
        ctx: &StepContext<'_>,
        identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let identity = require_identity(Self::NAME, identity)?;
        let Some(data) = data else {
            return ctx.fetch(&self.request(identity));
        };
        require_column(Self::NAME, data, ctx.id_column())?;
        let register = ctx.fetch(
            &self
                .request(identity)
                .for_ids(id_set(data, ctx.id_column())?),
        )?;
        join_on_id(data, &register, ctx.id_column())
    }
}

/// Which edge of the identity's window a check looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodEdge {
    Start,
    #[default]
    End,
}

/// Flags subjects present on the register at the start or end of the period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OnLiveRegister {
    pub when: PeriodEdge,
}

impl OnLiveRegister {
    pub const NAME: &'static str = "on_live_register";
}

impl RuleStep for OnLiveRegister {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn run(
        &self,
        ctx: &StepContext<'_>,
        identity: Option<&Identity>,
        data: Option<&DataFrame>,
    ) -> Result<DataFrame> {
        let identity = require_identity(Self::NAME, identity)?;
        let data = require_data(Self::NAME, data)?;
        require_column(Self::NAME, data, ctx.id_column())?;
        let date = match self.when {
            PeriodEdge::Start => identity.reference_date(),
            PeriodEdge::End => identity.end_date(),
        };
        let request = FetchRequest::new(SourceKind::ClaimantRegister)
            .at(date)
            .for_ids(id_set(data, ctx.id_column())?)
            .with_columns(Vec::<String>::new());
        let on_register = id_set(&ctx.fetch(&request)?, ctx.id_column())?;
        let flags = cohort_ingest::frame::string_values(data, ctx.id_column())?
            .iter()
            .map(|id| id.as_ref().is_some_and(|id| on_register.contains(id)))
            .collect();
        append_flag(data, Self::NAME, flags)
    }
}

/// Keeps only rows whose boolean column is true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeepEligible {
    pub column: String,
}

impl KeepEligible {
    pub const NAME: &'static str = "keep_eligible";
}

impl RuleStep for KeepEligible {
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
        let keep = bools(Self::NAME, data, &self.column)?;
        Ok(cohort_ingest::frame::mask_rows(data, &keep)?)
    }
}
