//! JSON model configuration.
//!
//! ```json
//! {
//!   "id_column": "ppsn",
//!   "data_dir": "data",
//!   "store_dir": "store",
//!   "slices": {
//!     "start": "2016-01-01",
//!     "end": "2016-12-31",
//!     "frequency": "quarterly",
//!     "pipelines": {
//!       "2016-01-01": [
//!         {"rule": "live_register_population"},
//!         {"rule": "age_eligible", "max_age": {"years": 60}}
//!       ]
//!     }
//!   },
//!   "periods": {
//!     "last": "2017-12-31",
//!     "pipelines": {"2016-01-01": [{"rule": "on_live_register"}]}
//!   }
//! }
//! ```
//!
//! Relative directories resolve against the config file's directory.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use cohort_model::Frequency;
use cohort_rules::{RuleConfig, RulePipeline, TemporalSelector};

use crate::error::{EngineError, Result};
use crate::model::EvaluationModel;
use crate::period::PeriodEngine;
use crate::slice::SliceEngine;
use crate::snapshot::CachePolicy;

fn default_id_column() -> String {
    "ppsn".to_string()
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("store")
}

/// Rule pipelines keyed by the date they come into force.
pub type PipelineConfigs = BTreeMap<NaiveDate, Vec<RuleConfig>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceConfig {
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub frequency: Frequency,
    pub pipelines: PipelineConfigs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeriodConfig {
    #[serde(default)]
    pub frequency: Frequency,
    /// Any date inside the last period to build.
    pub last: NaiveDate,
    pub pipelines: PipelineConfigs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Subject identifier column in every table.
    #[serde(default = "default_id_column")]
    pub id_column: String,
    /// Directory of `<kind>.csv` extracts.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Root of the snapshot store.
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    #[serde(default)]
    pub cache: CachePolicy,
    pub slices: SliceConfig,
    pub periods: PeriodConfig,
}

impl ModelConfig {
    /// Parse a config file, resolving relative directories against it.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| EngineError::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mut config = Self::from_json_str(&text).map_err(|message| EngineError::ConfigParse {
            path: path.to_path_buf(),
            message,
        })?;
        if let Some(base) = path.parent() {
            config.data_dir = base.join(&config.data_dir);
            config.store_dir = base.join(&config.store_dir);
        }
        Ok(config)
    }

    /// Parse and check a config document. Errors are returned as messages.
    pub fn from_json_str(text: &str) -> std::result::Result<Self, String> {
        let config: Self = serde_json::from_str(text).map_err(|e| e.to_string())?;
        if config.slices.end < config.slices.start {
            return Err(format!(
                "slices.end ({}) precedes slices.start ({})",
                config.slices.end, config.slices.start
            ));
        }
        Ok(config)
    }

    /// Build the engines, validating every rule.
    pub fn build_model(&self) -> Result<EvaluationModel> {
        let slices = SliceEngine::new(
            build_selector(&self.slices.pipelines)?,
            self.slices.start,
            self.slices.end,
            self.slices.frequency,
        );
        let periods = PeriodEngine::new(
            build_selector(&self.periods.pipelines)?,
            self.periods.frequency,
            self.periods.last,
        );
        Ok(EvaluationModel::new(slices, periods).with_policy(self.cache))
    }
}

fn build_selector(configs: &PipelineConfigs) -> Result<TemporalSelector<Arc<RulePipeline>>> {
    let selector: TemporalSelector<Vec<RuleConfig>> = configs
        .iter()
        .map(|(date, rules)| (*date, rules.clone()))
        .collect();
    Ok(selector.try_map(|rules| RulePipeline::from_configs(rules).map(Arc::new))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"{
        "slices": {
            "start": "2016-01-01",
            "end": "2016-12-31",
            "frequency": "quarterly",
            "pipelines": {
                "2016-01-01": [
                    {"rule": "live_register_population"},
                    {"rule": "age_eligible", "max_age": {"years": 60}}
                ]
            }
        },
        "periods": {
            "last": "2017-03-31",
            "pipelines": {"2016-01-01": [{"rule": "on_live_register"}]}
        }
    }"#;

    #[test]
    fn defaults_fill_in() {
        let config = ModelConfig::from_json_str(CONFIG).unwrap();
        assert_eq!(config.id_column, "ppsn");
        assert_eq!(config.cache, CachePolicy::ReadThrough);
        assert_eq!(config.periods.frequency, Frequency::Monthly);
        assert_eq!(config.slices.frequency, Frequency::Quarterly);
    }

    #[test]
    fn builds_engines() {
        let model = ModelConfig::from_json_str(CONFIG)
            .unwrap()
            .build_model()
            .unwrap();
        assert_eq!(model.slices.anchors().len(), 4);
    }

    #[test]
    fn reversed_range_is_rejected() {
        let text = CONFIG.replace("\"end\": \"2016-12-31\"", "\"end\": \"2015-12-31\"");
        assert!(ModelConfig::from_json_str(&text).is_err());
    }

    #[test]
    fn invalid_rule_fails_the_build() {
        let text = CONFIG.replace(
            r#"{"rule": "age_eligible", "max_age": {"years": 60}}"#,
            r#"{"rule": "age_eligible"}"#,
        );
        let config = ModelConfig::from_json_str(&text).unwrap();
        assert!(matches!(config.build_model(), Err(EngineError::Rule(_))));
    }
}
