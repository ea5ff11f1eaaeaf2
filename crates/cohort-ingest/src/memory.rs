//! Source backed by tables held in memory.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::{debug, warn};

use crate::error::{Result, SourceError};
use crate::frame::{date_values, dedupe_first, has_column, mask_rows, string_values};
use crate::source::{DataSource, FetchRequest, SourceKind};

/// Default column holding the register extract date.
pub const DEFAULT_REGISTER_DATE_COLUMN: &str = "register_date";

/// Source over one table per [`SourceKind`].
///
/// Register tables stack several extracts distinguished by a register date
/// column; a dated fetch reads the latest extract on or before the requested
/// date.
#[derive(Debug, Clone)]
pub struct InMemorySource {
    id_column: String,
    register_date_column: String,
    tables: BTreeMap<SourceKind, DataFrame>,
}

impl InMemorySource {
    pub fn new(id_column: impl Into<String>) -> Self {
        Self {
            id_column: id_column.into(),
            register_date_column: DEFAULT_REGISTER_DATE_COLUMN.to_string(),
            tables: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_register_date_column(mut self, column: impl Into<String>) -> Self {
        self.register_date_column = column.into();
        self
    }

    #[must_use]
    pub fn with_table(mut self, kind: SourceKind, table: DataFrame) -> Self {
        self.insert(kind, table);
        self
    }

    pub fn insert(&mut self, kind: SourceKind, table: DataFrame) {
        self.tables.insert(kind, table);
    }

    pub fn table(&self, kind: SourceKind) -> Option<&DataFrame> {
        self.tables.get(&kind)
    }

    /// Latest register date on or before `date`.
    pub fn register_date_on_or_before(&self, date: NaiveDate) -> Result<Option<NaiveDate>> {
        let table = self.require(SourceKind::ClaimantRegister)?;
        self.require_column(SourceKind::ClaimantRegister, table, &self.register_date_column)?;
        Ok(date_values(table, &self.register_date_column)?
            .into_iter()
            .flatten()
            .filter(|candidate| *candidate <= date)
            .max())
    }

    fn require(&self, kind: SourceKind) -> Result<&DataFrame> {
        self.tables
            .get(&kind)
            .ok_or(SourceError::MissingTable { kind })
    }

    fn require_column(&self, kind: SourceKind, table: &DataFrame, column: &str) -> Result<()> {
        if has_column(table, column) {
            Ok(())
        } else {
            Err(SourceError::MissingColumn {
                kind,
                column: column.to_string(),
            })
        }
    }

    fn select_extract(&self, table: &DataFrame, date: NaiveDate) -> Result<DataFrame> {
        let dates = date_values(table, &self.register_date_column)?;
        let Some(extract) = dates.iter().flatten().filter(|d| **d <= date).max().copied() else {
            debug!(%date, "no register extract on or before date");
            return Ok(mask_rows(table, &vec![false; table.height()])?);
        };
        let keep: Vec<bool> = dates.iter().map(|d| *d == Some(extract)).collect();
        Ok(mask_rows(table, &keep)?)
    }
}

impl DataSource for InMemorySource {
    fn id_column(&self) -> &str {
        &self.id_column
    }

    fn fetch(&self, request: &FetchRequest) -> Result<DataFrame> {
        let kind = request.kind;
        let table = self.require(kind)?;
        self.require_column(kind, table, &self.id_column)?;

        let mut result = match (kind.is_dated(), request.date) {
            (true, Some(date)) => {
                self.require_column(kind, table, &self.register_date_column)?;
                self.select_extract(table, date)?
            }
            _ => table.clone(),
        };

        if let Some(ids) = &request.ids {
            let keep: Vec<bool> = string_values(&result, &self.id_column)?
                .iter()
                .map(|id| id.as_ref().is_some_and(|id| ids.contains(id)))
                .collect();
            result = mask_rows(&result, &keep)?;
        }

        if kind.is_dated() {
            let (deduped, removed) = dedupe_first(&result, &self.id_column)?;
            if removed > 0 {
                warn!(%kind, removed, "dropped duplicate or unidentified register records");
            }
            result = deduped;
        }

        if let Some(columns) = &request.columns {
            let mut selection: Vec<&str> = vec![self.id_column.as_str()];
            for column in columns {
                self.require_column(kind, &result, column)?;
                if !selection.contains(&column.as_str()) {
                    selection.push(column.as_str());
                }
            }
            result = result.select(selection)?;
        }

        debug!(%kind, date = ?request.date, rows = result.height(), "fetched source table");
        Ok(result)
    }
}
