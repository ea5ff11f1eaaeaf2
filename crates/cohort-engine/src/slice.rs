//! Population slices: one snapshot per cohort anchor date.

use std::sync::Arc;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::info_span;

use cohort_ingest::DataSource;
use cohort_model::{Frequency, Identity, SliceId};
use cohort_rules::{RulePipeline, StepContext, TemporalSelector};
use cohort_store::{MemoizedStore, TableKind};

use crate::error::Result;
use crate::snapshot::{CachePolicy, RunLedger, SnapshotOutcome, materialize};

/// A cohort snapshot at one anchor date.
#[derive(Debug, Clone)]
pub struct PopulationSlice {
    pub id: SliceId,
    pub data: DataFrame,
    /// Pipeline that produced `data`; `None` when loaded from the store.
    pub pipeline: Option<Arc<RulePipeline>>,
    pub outcome: SnapshotOutcome,
}

impl PopulationSlice {
    pub fn identity(&self) -> Identity {
        self.id.into()
    }

    pub fn date(&self) -> NaiveDate {
        self.id.date
    }
}

/// Builds population slices over a range of anchor dates.
#[derive(Debug, Clone)]
pub struct SliceEngine {
    selector: TemporalSelector<Arc<RulePipeline>>,
    start: NaiveDate,
    end: NaiveDate,
    frequency: Frequency,
    policy: CachePolicy,
}

impl SliceEngine {
    pub fn new(
        selector: TemporalSelector<Arc<RulePipeline>>,
        start: NaiveDate,
        end: NaiveDate,
        frequency: Frequency,
    ) -> Self {
        Self {
            selector,
            start,
            end,
            frequency,
            policy: CachePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    /// Anchor dates in ascending order.
    pub fn anchors(&self) -> Vec<NaiveDate> {
        self.frequency.anchors(self.start, self.end)
    }

    /// Load or compute the slice anchored at `date`.
    ///
    /// On a miss the pipeline in force at `date` runs without seed data and
    /// its output is written through before being returned.
    pub fn run_one(
        &self,
        date: NaiveDate,
        source: &dyn DataSource,
        store: &mut dyn MemoizedStore,
        ledger: &mut RunLedger,
    ) -> Result<PopulationSlice> {
        let id = SliceId::new(date);
        let identity = Identity::from(id);
        let _span = info_span!("slice", %date).entered();

        let (data, pipeline, outcome) = materialize(
            TableKind::PopulationSlice,
            &identity,
            self.policy,
            store,
            ledger,
            || {
                let pipeline = Arc::clone(self.selector.resolve(date)?);
                let data = pipeline.run(&StepContext::new(source), Some(&identity), None)?;
                Ok((data, pipeline))
            },
        )?;
        Ok(PopulationSlice {
            id,
            data,
            pipeline,
            outcome,
        })
    }

    /// Lazily run every anchor in ascending order.
    ///
    /// Each call starts a fresh run; slices already stored are loaded.
    pub fn run_all<'a>(
        &'a self,
        source: &'a dyn DataSource,
        store: &'a mut dyn MemoizedStore,
    ) -> SliceRun<'a> {
        SliceRun {
            engine: self,
            source,
            store,
            ledger: RunLedger::new(),
            anchors: self.anchors().into_iter(),
        }
    }
}

/// Iterator over the slices of one run.
pub struct SliceRun<'a> {
    engine: &'a SliceEngine,
    source: &'a dyn DataSource,
    store: &'a mut dyn MemoizedStore,
    ledger: RunLedger,
    anchors: std::vec::IntoIter<NaiveDate>,
}

impl SliceRun<'_> {
    pub fn ledger(&self) -> &RunLedger {
        &self.ledger
    }
}

impl Iterator for SliceRun<'_> {
    type Item = Result<PopulationSlice>;

    fn next(&mut self) -> Option<Self::Item> {
        let date = self.anchors.next()?;
        Some(
            self.engine
                .run_one(date, self.source, &mut *self.store, &mut self.ledger),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.anchors.size_hint()
    }
}
