//! Store holding snapshots in memory.

use std::collections::BTreeMap;

use polars::prelude::DataFrame;
use tracing::debug;

use cohort_model::{FlatKey, Identity};

use crate::error::{Result, StoreError};
use crate::store::MemoizedStore;
use crate::table::{TableKind, attach_key, strip_key};

/// One logical table per kind, partitioned by flat identity key.
///
/// Frames are kept with their synthetic key columns, as they would be in a
/// shared physical table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryStore {
    tables: BTreeMap<TableKind, BTreeMap<FlatKey, DataFrame>>,
    writes: usize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful writes since creation.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Stored identity keys of one kind, in key order.
    pub fn keys(&self, kind: TableKind) -> Vec<&FlatKey> {
        self.tables
            .get(&kind)
            .map(|partitions| partitions.keys().collect())
            .unwrap_or_default()
    }

    /// Every stored row of one kind, key columns included.
    pub fn table(&self, kind: TableKind) -> Option<Vec<&DataFrame>> {
        self.tables
            .get(&kind)
            .map(|partitions| partitions.values().collect())
    }
}

impl MemoizedStore for InMemoryStore {
    fn exists(&self, kind: TableKind, identity: &Identity) -> Result<bool> {
        Ok(self
            .tables
            .get(&kind)
            .is_some_and(|partitions| partitions.contains_key(&identity.flat_key())))
    }

    fn read(&self, kind: TableKind, identity: &Identity) -> Result<DataFrame> {
        let partitions = self
            .tables
            .get(&kind)
            .ok_or(StoreError::TableNotFound { kind })?;
        let key = identity.flat_key();
        let stored = partitions
            .get(&key)
            .ok_or_else(|| StoreError::IdentityDataNotFound {
                kind,
                key: key.canonical(),
            })?;
        Ok(strip_key(stored, &key))
    }

    fn write(&mut self, kind: TableKind, identity: &Identity, data: &DataFrame) -> Result<()> {
        let key = identity.flat_key();
        let stored = attach_key(data, &key)?;
        let replaced = self
            .tables
            .entry(kind)
            .or_default()
            .insert(key, stored)
            .is_some();
        self.writes += 1;
        debug!(%kind, %identity, rows = data.height(), replaced, "stored snapshot");
        Ok(())
    }
}
