//! Treatment periods nested under a population slice.

use std::sync::Arc;

use chrono::NaiveDate;
use polars::prelude::DataFrame;
use tracing::{info_span, warn};

use cohort_ingest::DataSource;
use cohort_model::{Frequency, Identity, PeriodId, PeriodLabel};
use cohort_rules::{RulePipeline, StepContext, TemporalSelector};
use cohort_store::{MemoizedStore, TableKind};

use crate::error::{EngineError, Result};
use crate::slice::PopulationSlice;
use crate::snapshot::{CachePolicy, RunLedger, SnapshotOutcome, materialize};

/// Snapshot of one slice over one treatment period.
#[derive(Debug, Clone)]
pub struct TreatmentPeriod {
    pub id: PeriodId,
    pub data: DataFrame,
    /// Pipeline that produced `data`; `None` when loaded from the store.
    pub pipeline: Option<Arc<RulePipeline>>,
    pub outcome: SnapshotOutcome,
}

impl TreatmentPeriod {
    pub fn identity(&self) -> Identity {
        self.id.into()
    }

    pub fn label(&self) -> PeriodLabel {
        self.id.period
    }
}

/// Builds the treatment periods of each slice, seeded from the slice.
#[derive(Debug, Clone)]
pub struct PeriodEngine {
    selector: TemporalSelector<Arc<RulePipeline>>,
    frequency: Frequency,
    last: NaiveDate,
    policy: CachePolicy,
}

impl PeriodEngine {
    /// Periods run from the one containing the slice anchor through the
    /// one containing `last`.
    pub fn new(
        selector: TemporalSelector<Arc<RulePipeline>>,
        frequency: Frequency,
        last: NaiveDate,
    ) -> Self {
        Self {
            selector,
            frequency,
            last,
            policy: CachePolicy::default(),
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: CachePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn frequency(&self) -> Frequency {
        self.frequency
    }

    pub fn labels_for(&self, slice: &PopulationSlice) -> Vec<PeriodLabel> {
        PeriodLabel::containing(slice.date(), self.frequency).range_through(self.last)
    }

    /// Load or compute one period of `slice`.
    ///
    /// The pipeline in force at the period start runs on the slice snapshot.
    pub fn run_one(
        &self,
        slice: &PopulationSlice,
        label: PeriodLabel,
        source: &dyn DataSource,
        store: &mut dyn MemoizedStore,
        ledger: &mut RunLedger,
    ) -> Result<TreatmentPeriod> {
        let id = PeriodId::new(slice.id, label);
        let identity = Identity::from(id);
        let _span = info_span!("period", slice = %slice.date(), period = %label).entered();

        let (data, pipeline, outcome) = materialize(
            TableKind::TreatmentPeriod,
            &identity,
            self.policy,
            store,
            ledger,
            || {
                let pipeline = Arc::clone(self.selector.resolve(label.start())?);
                let data = pipeline.run(
                    &StepContext::new(source),
                    Some(&identity),
                    Some(&slice.data),
                )?;
                Ok((data, pipeline))
            },
        )
        .map_err(|err| {
            warn!(%id, error = %err, "treatment period failed");
            EngineError::Period {
                id,
                source: Box::new(err),
            }
        })?;
        Ok(TreatmentPeriod {
            id,
            data,
            pipeline,
            outcome,
        })
    }

    /// Lazily run every period of `slice` in ascending order.
    ///
    /// A failed period is yielded as an error and iteration carries on with
    /// the next label.
    pub fn run_for<'a>(
        &'a self,
        slice: &'a PopulationSlice,
        source: &'a dyn DataSource,
        store: &'a mut dyn MemoizedStore,
    ) -> PeriodRun<'a> {
        PeriodRun {
            engine: self,
            slice,
            source,
            store,
            ledger: RunLedger::new(),
            labels: self.labels_for(slice).into_iter(),
        }
    }
}

/// Iterator over the periods of one slice.
pub struct PeriodRun<'a> {
    engine: &'a PeriodEngine,
    slice: &'a PopulationSlice,
    source: &'a dyn DataSource,
    store: &'a mut dyn MemoizedStore,
    ledger: RunLedger,
    labels: std::vec::IntoIter<PeriodLabel>,
}

impl Iterator for PeriodRun<'_> {
    type Item = Result<TreatmentPeriod>;

    fn next(&mut self) -> Option<Self::Item> {
        let label = self.labels.next()?;
        Some(self.engine.run_one(
            self.slice,
            label,
            self.source,
            &mut *self.store,
            &mut self.ledger,
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.labels.size_hint()
    }
}
