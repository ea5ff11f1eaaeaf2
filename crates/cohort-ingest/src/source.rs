//! The data source capability consumed by rule steps.

use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Administrative extract a fetch reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Live Register of benefit claimants, one extract per register date.
    ClaimantRegister,
    /// JobPath referrals (operational programme data).
    #[serde(rename = "jobpath")]
    JobPath,
    /// Local Employment Service referrals.
    Les,
    /// Earnings and payment records.
    Earnings,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        Self::ClaimantRegister,
        Self::JobPath,
        Self::Les,
        Self::Earnings,
    ];

    /// Stable name, also the file stem used by directory-backed sources.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClaimantRegister => "claimant_register",
            Self::JobPath => "jobpath",
            Self::Les => "les",
            Self::Earnings => "earnings",
        }
    }

    /// Whether the extract is versioned by register date, one row per subject.
    pub const fn is_dated(self) -> bool {
        matches!(self, Self::ClaimantRegister)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parameters of a single fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub kind: SourceKind,
    /// Reference date for dated extracts. Ignored by undated ones.
    pub date: Option<NaiveDate>,
    /// Restrict the result to these subjects.
    pub ids: Option<BTreeSet<String>>,
    /// Columns to return besides the id column. `None` returns every column.
    pub columns: Option<Vec<String>>,
}

impl FetchRequest {
    pub fn new(kind: SourceKind) -> Self {
        Self {
            kind,
            date: None,
            ids: None,
            columns: None,
        }
    }

    #[must_use]
    pub fn at(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    #[must_use]
    pub fn for_ids(mut self, ids: BTreeSet<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = Some(columns.into_iter().map(Into::into).collect());
        self
    }
}

/// Capability to fetch a table of subject records.
///
/// Results are keyed by the source's id column. Dated extracts return one
/// row per subject.
pub trait DataSource {
    /// Name of the subject identifier column in every returned table.
    fn id_column(&self) -> &str;

    fn fetch(&self, request: &FetchRequest) -> Result<DataFrame>;
}

impl<T: DataSource + ?Sized> DataSource for &T {
    fn id_column(&self) -> &str {
        (**self).id_column()
    }

    fn fetch(&self, request: &FetchRequest) -> Result<DataFrame> {
        (**self).fetch(request)
    }
}
