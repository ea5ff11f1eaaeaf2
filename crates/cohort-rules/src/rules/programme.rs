//! Participation in JobPath and in the Local Employment Service.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use cohort_ingest::frame::{date_values, string_values};
use cohort_ingest::{FetchRequest, SourceKind};
use cohort_model::{DateOffset, Identity};

use crate::error::{Result, RuleError};
use crate::flags::{append_flag, id_set, require_column, require_data, require_identity, truthy};
use crate::step::{RuleStep, StepContext};

fn default_episode_length() -> DateOffset {
    DateOffset::years(1)
}

fn default_start_col() -> String {
    "start_date".to_string()
}

fn default_register_flag_col() -> String {
    "jobpath_flag".to_string()
}

fn default_true() -> bool {
    true
}

/// Subjects with a referral episode covering `date`.
///
/// An episode starts on its start date and is assumed to last
/// `episode_length`; referrals without a start date are ignored.
fn active_referrals(
    rule: &'static str,
    ctx: &StepContext<'_>,
    kind: SourceKind,
    ids: BTreeSet<String>,
    start_col: &str,
    episode_length: &DateOffset,
    date: NaiveDate,
) -> Result<BTreeSet<String>> {
    let referrals = ctx.fetch(
        &FetchRequest::new(kind)
            .for_ids(ids)
            .with_columns([start_col]),
    )?;
    require_column(rule, &referrals, start_col)?;

    let mut active = BTreeSet::new();
    let starts = date_values(&referrals, start_col)?;
    for (id, start) in string_values(&referrals, ctx.id_column())?
        .into_iter()
        .zip(starts)
    {
        let (Some(id), Some(start)) = (id, start) else {
            continue;
        };
        if start <= date && date < episode_length.after(start)? {
            active.insert(id);
        }
    }
    Ok(active)
}

fn membership_flags(
    data: &DataFrame,
    id_column: &str,
    members: &BTreeSet<String>,
) -> Result<Vec<bool>> {
    Ok(string_values(data, id_column)?
        .iter()
        .map(|id| id.as_ref().is_some_and(|id| members.contains(id)))
        .collect())
}

/// Subjects on a Local Employment Service episode at the reference date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnLes {
    #[serde(default = "default_episode_length")]
    pub assumed_episode_length: DateOffset,
    #[serde(default = "default_start_col")]
    pub start_col: String,
}

impl Default for OnLes {
    fn default() -> Self {
        Self {
            assumed_episode_length: default_episode_length(),
            start_col: default_start_col(),
        }
    }
}

impl OnLes {
    pub const NAME: &'static str = "on_les";

    pub fn validate(&self) -> Result<()> {
        if self.assumed_episode_length.is_zero() {
            return Err(RuleError::InvalidParameter {
                rule: Self::NAME,
                message: "assumed_episode_length must be positive".to_string(),
            });
        }
        Ok(())
    }
}

impl RuleStep for OnLes {
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
        let active = active_referrals(
            Self::NAME,
            ctx,
            SourceKind::Les,
            id_set(data, ctx.id_column())?,
            &self.start_col,
            &self.assumed_episode_length,
            identity.reference_date(),
        )?;
        append_flag(data, Self::NAME, membership_flags(data, ctx.id_column(), &active)?)
    }
}

/// How the operational and register signals combine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Combine {
    #[default]
    Either,
    Both,
}

/// Subjects on JobPath at the reference date.
///
/// Reads the operational referral extract, the register's JobPath flag, or
/// both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnJobPath {
    #[serde(default = "default_episode_length")]
    pub assumed_episode_length: DateOffset,
    #[serde(default = "default_start_col")]
    pub start_col: String,
    #[serde(default = "default_true")]
    pub use_operational_data: bool,
    #[serde(default)]
    pub use_register_flag: bool,
    #[serde(default = "default_register_flag_col")]
    pub register_flag_col: String,
    #[serde(default)]
    pub combine: Combine,
}

impl Default for OnJobPath {
    fn default() -> Self {
        Self {
            assumed_episode_length: default_episode_length(),
            start_col: default_start_col(),
            use_operational_data: true,
            use_register_flag: false,
            register_flag_col: default_register_flag_col(),
            combine: Combine::default(),
        }
    }
}

impl OnJobPath {
    pub const NAME: &'static str = "on_jobpath";

    pub fn validate(&self) -> Result<()> {
        if !self.use_operational_data && !self.use_register_flag {
            return Err(RuleError::InvalidParameter {
                rule: Self::NAME,
                message: "enable use_operational_data or use_register_flag".to_string(),
            });
        }
        if self.use_operational_data && self.assumed_episode_length.is_zero() {
            return Err(RuleError::InvalidParameter {
                rule: Self::NAME,
                message: "assumed_episode_length must be positive".to_string(),
            });
        }
        Ok(())
    }

    fn flagged_on_register(
        &self,
        ctx: &StepContext<'_>,
        ids: BTreeSet<String>,
        date: NaiveDate,
    ) -> Result<BTreeSet<String>> {
        let register = ctx.fetch(
            &FetchRequest::new(SourceKind::ClaimantRegister)
                .at(date)
                .for_ids(ids)
                .with_columns([self.register_flag_col.as_str()]),
        )?;
        let flags = string_values(&register, &self.register_flag_col)?;
        Ok(string_values(&register, ctx.id_column())?
            .into_iter()
            .zip(flags)
            .filter_map(|(id, flag)| id.filter(|_| truthy(flag.as_deref())))
            .collect())
    }
}

impl RuleStep for OnJobPath {
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
        let date = identity.reference_date();
        let ids = id_set(data, ctx.id_column())?;

        let operational = if self.use_operational_data {
            let active = active_referrals(
                Self::NAME,
                ctx,
                SourceKind::JobPath,
                ids.clone(),
                &self.start_col,
                &self.assumed_episode_length,
                date,
            )?;
            Some(membership_flags(data, ctx.id_column(), &active)?)
        } else {
            None
        };
        let register = if self.use_register_flag {
            let flagged = self.flagged_on_register(ctx, ids, date)?;
            Some(membership_flags(data, ctx.id_column(), &flagged)?)
        } else {
            None
        };

        let flags = match (operational, register) {
            (Some(operational), Some(register)) => operational
                .into_iter()
                .zip(register)
                .map(|(a, b)| match self.combine {
                    Combine::Either => a || b,
                    Combine::Both => a && b,
                })
                .collect(),
            (Some(flags), None) | (None, Some(flags)) => flags,
            (None, None) => {
                return Err(RuleError::InvalidParameter {
                    rule: Self::NAME,
                    message: "enable use_operational_data or use_register_flag".to_string(),
                });
            }
        };
        append_flag(data, Self::NAME, flags)
    }
}
