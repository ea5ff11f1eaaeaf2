//! Table kinds and the synthetic identity columns stored with every frame.

use std::fmt;

use polars::prelude::{Column, DataFrame};
use serde::{Deserialize, Serialize};

use cohort_ingest::frame::{has_column, string_values};
use cohort_model::FlatKey;

use crate::error::{Result, StoreError};

/// Prefix of the columns that encode an identity inside a stored frame.
pub const KEY_COLUMN_PREFIX: &str = "key_";

/// Physical table a snapshot is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    PopulationSlice,
    TreatmentPeriod,
}

impl TableKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::PopulationSlice => "population_slice",
            Self::TreatmentPeriod => "treatment_period",
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn key_column(key: &str) -> String {
    format!("{KEY_COLUMN_PREFIX}{key}")
}

/// Copy of `data` with one constant column per flat key entry.
///
/// Fails when `data` already has a column of the same name.
pub fn attach_key(data: &DataFrame, key: &FlatKey) -> Result<DataFrame> {
    let mut out = data.clone();
    for (name, value) in key.entries() {
        let column = key_column(name);
        if has_column(data, &column) {
            return Err(StoreError::ReservedColumn { column });
        }
        let values = vec![value.as_str(); data.height()];
        out.with_column(Column::new(column.into(), values))?;
    }
    Ok(out)
}

/// Drop the synthetic columns of `key`. Other columns are left alone, even
/// when their name starts with [`KEY_COLUMN_PREFIX`].
pub fn strip_key(data: &DataFrame, key: &FlatKey) -> DataFrame {
    data.drop_many(key.keys().map(key_column))
}

/// Whether every row carries exactly `key`.
pub fn carries_key(data: &DataFrame, key: &FlatKey) -> Result<bool> {
    for (name, value) in key.entries() {
        let column = key_column(name);
        if !has_column(data, &column) {
            return Ok(false);
        }
        let matches = string_values(data, &column)?
            .iter()
            .all(|stored| stored.as_deref() == Some(value.as_str()));
        if !matches {
            return Ok(false);
        }
    }
    Ok(true)
}
