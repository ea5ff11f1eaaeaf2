use polars::prelude::DataFrame;

use cohort_model::Identity;

use crate::error::Result;
use crate::table::TableKind;

/// Snapshot cache keyed by table kind and structured identity.
///
/// `write` replaces whatever was stored under the identity: rows for that
/// identity are deleted before the new frame is appended. Implementations
/// make the replacement atomic per identity, so a failed write leaves either
/// the old frame or nothing visible.
pub trait MemoizedStore {
    fn exists(&self, kind: TableKind, identity: &Identity) -> Result<bool>;

    /// Fails with a cache-miss error (see
    /// [`StoreError::is_cache_miss`](crate::StoreError::is_cache_miss)) when
    /// nothing is stored.
    fn read(&self, kind: TableKind, identity: &Identity) -> Result<DataFrame>;

    fn write(&mut self, kind: TableKind, identity: &Identity, data: &DataFrame) -> Result<()>;
}

impl<S: MemoizedStore + ?Sized> MemoizedStore for &mut S {
    fn exists(&self, kind: TableKind, identity: &Identity) -> Result<bool> {
        (**self).exists(kind, identity)
    }

    fn read(&self, kind: TableKind, identity: &Identity) -> Result<DataFrame> {
        (**self).read(kind, identity)
    }

    fn write(&mut self, kind: TableKind, identity: &Identity, data: &DataFrame) -> Result<()> {
        (**self).write(kind, identity, data)
    }
}
