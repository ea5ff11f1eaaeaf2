//! Source reading one CSV file per extract from a directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use polars::prelude::{CsvReadOptions, DataFrame, DataType, Schema, SerReader};
use tracing::{debug, info};

use crate::error::{Result, SourceError};
use crate::frame::{ensure_string_ids, has_column};
use crate::memory::InMemorySource;
use crate::source::{DataSource, FetchRequest, SourceKind};

/// Reads a CSV file into a Polars DataFrame.
///
/// `id_column` is always read as text so identifiers such as `0012` keep
/// their leading zeros; the other columns are inferred.
pub fn read_csv_table(path: &Path, id_column: &str) -> Result<DataFrame> {
    let header = read_with(
        path,
        CsvReadOptions::default()
            .with_has_header(true)
            .with_n_rows(Some(1)),
    )?;
    let mut options = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100));
    if has_column(&header, id_column) {
        let mut overwrite = Schema::with_capacity(1);
        overwrite.with_column(id_column.into(), DataType::String);
        options = options.with_schema_overwrite(Some(Arc::new(overwrite)));
    }
    read_with(path, options)
}

fn read_with(path: &Path, options: CsvReadOptions) -> Result<DataFrame> {
    let csv_error = |e: polars::prelude::PolarsError| SourceError::CsvParse {
        path: path.to_path_buf(),
        message: e.to_string(),
    };
    options
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(csv_error)?
        .finish()
        .map_err(csv_error)
}

/// Directory of `<kind>.csv` extracts, e.g. `claimant_register.csv`.
///
/// Files are loaded once at open time; missing files simply leave that kind
/// unavailable.
#[derive(Debug, Clone)]
pub struct CsvDirectorySource {
    root: PathBuf,
    inner: InMemorySource,
}

impl CsvDirectorySource {
    pub fn open(root: impl Into<PathBuf>, id_column: &str) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(SourceError::DirectoryNotFound { path: root });
        }
        let mut inner = InMemorySource::new(id_column);
        for kind in SourceKind::ALL {
            let path = root.join(format!("{}.csv", kind.name()));
            if !path.is_file() {
                debug!(%kind, path = %path.display(), "extract not present");
                continue;
            }
            let mut table = read_csv_table(&path, id_column)?;
            if !has_column(&table, id_column) {
                return Err(SourceError::MissingColumn {
                    kind,
                    column: id_column.to_string(),
                });
            }
            ensure_string_ids(&mut table, id_column)?;
            info!(%kind, rows = table.height(), path = %path.display(), "loaded extract");
            inner.insert(kind, table);
        }
        Ok(Self { root, inner })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl DataSource for CsvDirectorySource {
    fn id_column(&self) -> &str {
        self.inner.id_column()
    }

    fn fetch(&self, request: &FetchRequest) -> Result<DataFrame> {
        self.inner.fetch(request)
    }
}
