//! Rule catalogue.
//!
//! Each rule is a parameter struct implementing [`RuleStep`]. [`RuleConfig`]
//! is the serialisable sum over all of them, tagged by `"rule"`:
//!
//! ```json
//! {"rule": "age_eligible", "max_age": {"years": 60}}
//! ```

mod eligibility;
mod population;
mod programme;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use eligibility::{AgeEligible, ClaimCodeEligible, ClaimDurationEligible, EligiblePopulation};
pub use population::{KeepEligible, LiveRegisterPopulation, OnLiveRegister, PeriodEdge};
pub use programme::{Combine, OnJobPath, OnLes};

use crate::error::Result;
use crate::step::RuleStep;

/// Every rule the pipeline can be built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RuleKind {
    LiveRegisterPopulation,
    AgeEligible,
    ClaimCodeEligible,
    ClaimDurationEligible,
    OnLiveRegister,
    OnLes,
    OnJobPath,
    EligiblePopulation,
    KeepEligible,
}

impl RuleKind {
    pub const ALL: [RuleKind; 9] = [
        Self::LiveRegisterPopulation,
        Self::AgeEligible,
        Self::ClaimCodeEligible,
        Self::ClaimDurationEligible,
        Self::OnLiveRegister,
        Self::OnLes,
        Self::OnJobPath,
        Self::EligiblePopulation,
        Self::KeepEligible,
    ];

    /// Tag used in configuration files.
    pub const fn name(self) -> &'static str {
        match self {
            Self::LiveRegisterPopulation => LiveRegisterPopulation::NAME,
            Self::AgeEligible => AgeEligible::NAME,
            Self::ClaimCodeEligible => ClaimCodeEligible::NAME,
            Self::ClaimDurationEligible => ClaimDurationEligible::NAME,
            Self::OnLiveRegister => OnLiveRegister::NAME,
            Self::OnLes => OnLes::NAME,
            Self::OnJobPath => OnJobPath::NAME,
            Self::EligiblePopulation => EligiblePopulation::NAME,
            Self::KeepEligible => KeepEligible::NAME,
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::LiveRegisterPopulation => {
                "Claimants on the Live Register at the reference date"
            }
            Self::AgeEligible => "Age at the reference date within [min_age, max_age)",
            Self::ClaimCodeEligible => "Claim code is one of eligible_codes",
            Self::ClaimDurationEligible => {
                "Claim duration at the reference date within [min_duration, max_duration)"
            }
            Self::OnLiveRegister => "Still on the Live Register at the start or end of the period",
            Self::OnLes => "On a Local Employment Service episode at the reference date",
            Self::OnJobPath => "On JobPath at the reference date",
            Self::EligiblePopulation => "All eligibility criteria hold",
            Self::KeepEligible => "Keeps only rows where a boolean column is true",
        }
    }

    /// Column the rule appends, if it appends a fixed one.
    pub const fn output_column(self) -> Option<&'static str> {
        match self {
            Self::LiveRegisterPopulation | Self::KeepEligible | Self::EligiblePopulation => None,
            other => Some(other.name()),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Serialisable rule configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum RuleConfig {
    LiveRegisterPopulation(LiveRegisterPopulation),
    AgeEligible(AgeEligible),
    ClaimCodeEligible(ClaimCodeEligible),
    ClaimDurationEligible(ClaimDurationEligible),
    OnLiveRegister(OnLiveRegister),
    OnLes(OnLes),
    #[serde(rename = "on_jobpath")]
    OnJobPath(OnJobPath),
    EligiblePopulation(EligiblePopulation),
    KeepEligible(KeepEligible),
}

impl RuleConfig {
    pub fn kind(&self) -> RuleKind {
        match self {
            Self::LiveRegisterPopulation(_) => RuleKind::LiveRegisterPopulation,
            Self::AgeEligible(_) => RuleKind::AgeEligible,
            Self::ClaimCodeEligible(_) => RuleKind::ClaimCodeEligible,
            Self::ClaimDurationEligible(_) => RuleKind::ClaimDurationEligible,
            Self::OnLiveRegister(_) => RuleKind::OnLiveRegister,
            Self::OnLes(_) => RuleKind::OnLes,
            Self::OnJobPath(_) => RuleKind::OnJobPath,
            Self::EligiblePopulation(_) => RuleKind::EligiblePopulation,
            Self::KeepEligible(_) => RuleKind::KeepEligible,
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::AgeEligible(rule) => rule.validate(),
            Self::ClaimCodeEligible(rule) => rule.validate(),
            Self::ClaimDurationEligible(rule) => rule.validate(),
            Self::OnLes(rule) => rule.validate(),
            Self::OnJobPath(rule) => rule.validate(),
            Self::EligiblePopulation(rule) => rule.validate(),
            Self::LiveRegisterPopulation(_) | Self::OnLiveRegister(_) | Self::KeepEligible(_) => {
                Ok(())
            }
        }
    }

    /// Validate the parameters and box the step.
    pub fn build(self) -> Result<Box<dyn RuleStep>> {
        self.validate()?;
        Ok(match self {
            Self::LiveRegisterPopulation(rule) => Box::new(rule),
            Self::AgeEligible(rule) => Box::new(rule),
            Self::ClaimCodeEligible(rule) => Box::new(rule),
            Self::ClaimDurationEligible(rule) => Box::new(rule),
            Self::OnLiveRegister(rule) => Box::new(rule),
            Self::OnLes(rule) => Box::new(rule),
            Self::OnJobPath(rule) => Box::new(rule),
            Self::EligiblePopulation(rule) => Box::new(rule),
            Self::KeepEligible(rule) => Box::new(rule),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_tag() {
        for kind in RuleKind::ALL {
            assert!(!kind.description().is_empty());
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn parses_tagged_config() {
        let config: RuleConfig = serde_json::from_str(
            r#"{"rule": "age_eligible", "max_age": {"years": 60}}"#,
        )
        .unwrap();
        assert_eq!(config.kind(), RuleKind::AgeEligible);
        let RuleConfig::AgeEligible(rule) = &config else {
            panic!("expected age rule");
        };
        assert_eq!(rule.date_of_birth_col, "date_of_birth");
        assert_eq!(rule.max_age, Some(cohort_model::DateOffset::years(60)));
        assert!(config.build().is_ok());
    }

    #[test]
    fn jobpath_tag_is_single_word() {
        let config: RuleConfig = serde_json::from_str(r#"{"rule": "on_jobpath"}"#).unwrap();
        assert_eq!(config.kind(), RuleKind::OnJobPath);
    }

    #[test]
    fn build_rejects_unbounded_age_rule() {
        let config: RuleConfig = serde_json::from_str(r#"{"rule": "age_eligible"}"#).unwrap();
        assert!(matches!(
            config.build(),
            Err(crate::RuleError::InvalidParameter { rule: "age_eligible", .. })
        ));
    }
}
