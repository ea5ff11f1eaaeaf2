//! Read-or-compute logic shared by the slice and period engines.

use std::collections::HashSet;
use std::fmt;
use std::time::Instant;

use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use cohort_model::Identity;
use cohort_store::{MemoizedStore, TableKind};

use crate::error::Result;

/// Whether stored snapshots may be reused.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Reuse stored snapshots, computing only on a miss.
    #[default]
    ReadThrough,
    /// Recompute and overwrite every identity once per run.
    Rebuild,
}

/// How a snapshot came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnapshotOutcome {
    /// Adopted from the store.
    Loaded,
    /// Computed by the pipeline and written through.
    Computed,
}

impl SnapshotOutcome {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::Computed => "computed",
        }
    }
}

impl fmt::Display for SnapshotOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Identities computed during one run.
///
/// Under [`CachePolicy::Rebuild`] an identity already rebuilt in this run is
/// read back instead of being computed a second time.
#[derive(Debug, Default, Clone)]
pub struct RunLedger {
    computed: HashSet<(TableKind, Identity)>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, kind: TableKind, identity: &Identity) -> bool {
        self.computed.contains(&(kind, *identity))
    }

    pub fn len(&self) -> usize {
        self.computed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.computed.is_empty()
    }

    fn record(&mut self, kind: TableKind, identity: Identity) {
        self.computed.insert((kind, identity));
    }
}

/// Read `identity` from the store, or compute it and write it through.
///
/// Nothing is written unless `compute` succeeds.
pub(crate) fn materialize<P>(
    kind: TableKind,
    identity: &Identity,
    policy: CachePolicy,
    store: &mut dyn MemoizedStore,
    ledger: &mut RunLedger,
    compute: impl FnOnce() -> Result<(DataFrame, P)>,
) -> Result<(DataFrame, Option<P>, SnapshotOutcome)> {
    let reuse = match policy {
        CachePolicy::ReadThrough => true,
        CachePolicy::Rebuild => ledger.contains(kind, identity),
    };
    if reuse {
        match store.read(kind, identity) {
            Ok(data) => {
                debug!(%kind, %identity, rows = data.height(), "cache hit");
                return Ok((data, None, SnapshotOutcome::Loaded));
            }
            Err(err) if err.is_cache_miss() => {
                debug!(%kind, %identity, reason = %err, "cache miss");
            }
            Err(err) => return Err(err.into()),
        }
    }

    let started = Instant::now();
    let (data, pipeline) = compute()?;
    store.write(kind, identity, &data)?;
    ledger.record(kind, *identity);
    info!(
        %kind,
        %identity,
        rows = data.height(),
        columns = data.width(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "computed snapshot"
    );
    Ok((data, Some(pipeline), SnapshotOutcome::Computed))
}
