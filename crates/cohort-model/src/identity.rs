//! Structured identities naming population slices and treatment periods.
//!
//! Every identity flattens to a canonical list of `(key, value)` pairs,
//! sorted by key, with nested fields joined by [`KEY_SEPARATOR`]. Stores use
//! that list both as a lookup key and as synthetic columns.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::period::PeriodLabel;

/// Separator used when flattening nested identity fields.
pub const KEY_SEPARATOR: &str = "_";

/// Identity of a population slice: its anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SliceId {
    pub date: NaiveDate,
}

impl SliceId {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        out.push((join_key(prefix, "date"), self.date.format("%Y-%m-%d").to_string()));
    }
}

impl fmt::Display for SliceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slice {}", self.date)
    }
}

/// Identity of a treatment period under a slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeriodId {
    pub slice: SliceId,
    pub period: PeriodLabel,
}

impl PeriodId {
    pub fn new(slice: SliceId, period: PeriodLabel) -> Self {
        Self { slice, period }
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<(String, String)>) {
        self.slice.flatten_into(&join_key(prefix, "slice"), out);
        out.push((join_key(prefix, "period"), self.period.to_string()));
    }
}

impl fmt::Display for PeriodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "period {} of {}", self.period, self.slice)
    }
}

/// Any snapshot identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
pub enum Identity {
    Slice(SliceId),
    Period(PeriodId),
}

impl Identity {
    /// Date the snapshot is evaluated at: the slice anchor, or the first day
    /// of the treatment period.
    pub fn reference_date(&self) -> NaiveDate {
        match self {
            Self::Slice(id) => id.date,
            Self::Period(id) => id.period.start(),
        }
    }

    /// Last day covered by the snapshot. Equals the anchor for slices.
    pub fn end_date(&self) -> NaiveDate {
        match self {
            Self::Slice(id) => id.date,
            Self::Period(id) => id.period.end(),
        }
    }

    pub fn flat_key(&self) -> FlatKey {
        let mut entries = Vec::new();
        match self {
            Self::Slice(id) => id.flatten_into("", &mut entries),
            Self::Period(id) => id.flatten_into("", &mut entries),
        }
        FlatKey::new(entries)
    }
}

impl From<SliceId> for Identity {
    fn from(id: SliceId) -> Self {
        Self::Slice(id)
    }
}

impl From<PeriodId> for Identity {
    fn from(id: PeriodId) -> Self {
        Self::Period(id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Slice(id) => id.fmt(f),
            Self::Period(id) => id.fmt(f),
        }
    }
}

/// Canonical flattened identity: `(key, value)` pairs sorted by key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlatKey(Vec<(String, String)>);

impl FlatKey {
    pub fn new(mut entries: Vec<(String, String)>) -> Self {
        entries.sort();
        Self(entries)
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.0
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    /// `key=value` pairs joined with `;`.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(";")
    }
}

impl fmt::Display for FlatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

fn join_key(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}{KEY_SEPARATOR}{name}")
    }
}
