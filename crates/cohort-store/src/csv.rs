//! Store writing one CSV file per identity under a root directory.
//!
//! Layout:
//!
//! ```text
//! <root>/<kind>/<sha256(canonical key)>.csv    rows plus key_* columns
//! <root>/<kind>/<sha256(canonical key)>.json   manifest: key and column types
//! ```
//!
//! The manifest is the lookup index: an identity exists once its manifest is
//! in place. Both files are written through a temp file and renamed, CSV
//! first, so a crash never exposes a manifest without its rows.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use polars::prelude::{
    CsvReadOptions, CsvWriter, DataFrame, DataType, Schema, SerReader, SerWriter,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use cohort_model::{FlatKey, Identity};

use crate::error::{Result, StoreError};
use crate::store::MemoizedStore;
use crate::table::{TableKind, attach_key, carries_key, strip_key};

/// Column type as recorded in a manifest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StoredType {
    Boolean,
    Int64,
    Float64,
    String,
}

impl StoredType {
    fn of(dtype: &DataType) -> Self {
        if matches!(dtype, DataType::Boolean) {
            Self::Boolean
        } else if dtype.is_integer() {
            Self::Int64
        } else if dtype.is_float() {
            Self::Float64
        } else {
            Self::String
        }
    }

    fn dtype(self) -> DataType {
        match self {
            Self::Boolean => DataType::Boolean,
            Self::Int64 => DataType::Int64,
            Self::Float64 => DataType::Float64,
            Self::String => DataType::String,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Manifest {
    key: Vec<(String, String)>,
    rows: usize,
    columns: Vec<(String, StoredType)>,
}

impl Manifest {
    fn describe(key: &FlatKey, stored: &DataFrame) -> Self {
        Self {
            key: key.entries().to_vec(),
            rows: stored.height(),
            columns: stored
                .get_columns()
                .iter()
                .map(|column| (column.name().to_string(), StoredType::of(column.dtype())))
                .collect(),
        }
    }

    fn schema(&self) -> Schema {
        let mut schema = Schema::with_capacity(self.columns.len());
        for (name, stored) in &self.columns {
            schema.with_column(name.as_str().into(), stored.dtype());
        }
        schema
    }
}

/// Hex SHA-256 of the canonical key, used as the file stem.
pub fn key_digest(key: &FlatKey) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.canonical().as_bytes());
    hex::encode(hasher.finalize())
}

/// Directory-backed [`MemoizedStore`].
#[derive(Debug, Clone)]
pub struct CsvStore {
    root: PathBuf,
}

impl CsvStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| StoreError::Io {
            operation: "create directory",
            path: root.clone(),
            source: e,
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn kind_dir(&self, kind: TableKind) -> PathBuf {
        self.root.join(kind.name())
    }

    /// Paths of the data file and manifest for one identity.
    pub fn paths(&self, kind: TableKind, identity: &Identity) -> (PathBuf, PathBuf) {
        let stem = key_digest(&identity.flat_key());
        let dir = self.kind_dir(kind);
        (
            dir.join(format!("{stem}.csv")),
            dir.join(format!("{stem}.json")),
        )
    }

    fn read_manifest(&self, path: &Path) -> Result<Manifest> {
        let bytes = fs::read(path).map_err(|e| StoreError::Io {
            operation: "read",
            path: path.to_path_buf(),
            source: e,
        })?;
        serde_json::from_slice(&bytes).map_err(|e| StoreError::Manifest {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    fn read_rows(&self, path: &Path, manifest: &Manifest) -> Result<DataFrame> {
        let csv_error = |e: polars::prelude::PolarsError| StoreError::Csv {
            operation: "read",
            path: path.to_path_buf(),
            message: e.to_string(),
        };
        CsvReadOptions::default()
            .with_has_header(true)
            .with_schema(Some(Arc::new(manifest.schema())))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(csv_error)?
            .finish()
            .map_err(csv_error)
    }
}

/// Replace `target` with whatever `write` produces, through a sibling temp file.
fn replace_file(target: &Path, write: impl FnOnce(&mut File) -> Result<()>) -> Result<()> {
    let mut temp_name = target.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);
    let mut file = File::create(&temp_path).map_err(|e| StoreError::Io {
        operation: "create",
        path: temp_path.clone(),
        source: e,
    })?;
    write(&mut file)?;
    file.sync_all().map_err(|e| StoreError::Io {
        operation: "sync",
        path: temp_path.clone(),
        source: e,
    })?;
    fs::rename(&temp_path, target).map_err(|e| StoreError::AtomicWriteFailed {
        temp_path: temp_path.clone(),
        target_path: target.to_path_buf(),
        source: e,
    })
}

impl MemoizedStore for CsvStore {
    fn exists(&self, kind: TableKind, identity: &Identity) -> Result<bool> {
        let (data_path, manifest_path) = self.paths(kind, identity);
        Ok(manifest_path.is_file() && data_path.is_file())
    }

    fn read(&self, kind: TableKind, identity: &Identity) -> Result<DataFrame> {
        if !self.kind_dir(kind).is_dir() {
            return Err(StoreError::TableNotFound { kind });
        }
        let key = identity.flat_key();
        let (data_path, manifest_path) = self.paths(kind, identity);
        if !manifest_path.is_file() || !data_path.is_file() {
            return Err(StoreError::IdentityDataNotFound {
                kind,
                key: key.canonical(),
            });
        }

        let manifest = self.read_manifest(&manifest_path)?;
        if manifest.key.as_slice() != key.entries() {
            return Err(StoreError::KeyMismatch {
                path: manifest_path,
                key: key.canonical(),
            });
        }
        let stored = self.read_rows(&data_path, &manifest)?;
        if stored.height() != manifest.rows || !carries_key(&stored, &key)? {
            return Err(StoreError::KeyMismatch {
                path: data_path,
                key: key.canonical(),
            });
        }
        debug!(%kind, %identity, rows = stored.height(), "read snapshot");
        Ok(strip_key(&stored, &key))
    }

    fn write(&mut self, kind: TableKind, identity: &Identity, data: &DataFrame) -> Result<()> {
        let dir = self.kind_dir(kind);
        fs::create_dir_all(&dir).map_err(|e| StoreError::Io {
            operation: "create directory",
            path: dir.clone(),
            source: e,
        })?;

        let key = identity.flat_key();
        let mut stored = attach_key(data, &key)?;
        let manifest = Manifest::describe(&key, &stored);
        let (data_path, manifest_path) = self.paths(kind, identity);

        // The old manifest goes first so a half-replaced identity reads as missing.
        if manifest_path.is_file() {
            fs::remove_file(&manifest_path).map_err(|e| StoreError::Io {
                operation: "remove",
                path: manifest_path.clone(),
                source: e,
            })?;
        }

        replace_file(&data_path, |file| {
            CsvWriter::new(file)
                .include_header(true)
                .finish(&mut stored)
                .map_err(|e| StoreError::Csv {
                    operation: "write",
                    path: data_path.clone(),
                    message: e.to_string(),
                })
        })?;

        let bytes = serde_json::to_vec_pretty(&manifest).map_err(|e| StoreError::Manifest {
            path: manifest_path.clone(),
            message: e.to_string(),
        })?;
        replace_file(&manifest_path, |file| {
            file.write_all(&bytes).map_err(|e| StoreError::Io {
                operation: "write",
                path: manifest_path.clone(),
                source: e,
            })
        })?;

        info!(
            %kind,
            %identity,
            rows = data.height(),
            path = %data_path.display(),
            "stored snapshot"
        );
        Ok(())
    }
}
