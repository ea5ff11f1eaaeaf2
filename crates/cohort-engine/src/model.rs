//! A complete evaluation run: every slice, then every period of each slice.

use std::collections::BTreeMap;

use tracing::{info, info_span};

use cohort_ingest::DataSource;
use cohort_model::{PeriodId, SliceId};
use cohort_store::MemoizedStore;

use crate::error::{EngineError, Result};
use crate::period::{PeriodEngine, TreatmentPeriod};
use crate::slice::{PopulationSlice, SliceEngine};
use crate::snapshot::{CachePolicy, RunLedger, SnapshotOutcome};

/// Counts of one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub slices_loaded: usize,
    pub slices_computed: usize,
    pub periods_loaded: usize,
    pub periods_computed: usize,
    /// Periods that failed, with the error message.
    pub failed: Vec<(PeriodId, String)>,
}

impl RunSummary {
    fn count_slice(&mut self, outcome: SnapshotOutcome) {
        match outcome {
            SnapshotOutcome::Loaded => self.slices_loaded += 1,
            SnapshotOutcome::Computed => self.slices_computed += 1,
        }
    }

    fn count_period(&mut self, outcome: SnapshotOutcome) {
        match outcome {
            SnapshotOutcome::Loaded => self.periods_loaded += 1,
            SnapshotOutcome::Computed => self.periods_computed += 1,
        }
    }

    pub fn slices(&self) -> usize {
        self.slices_loaded + self.slices_computed
    }

    pub fn periods(&self) -> usize {
        self.periods_loaded + self.periods_computed
    }
}

/// Results of [`EvaluationModel::run`], keyed by identity.
#[derive(Debug, Clone, Default)]
pub struct ModelResults {
    pub slices: BTreeMap<SliceId, PopulationSlice>,
    pub periods: BTreeMap<PeriodId, TreatmentPeriod>,
    pub summary: RunSummary,
}

impl ModelResults {
    /// Periods of one slice, in ascending label order.
    pub fn periods_of(&self, slice: SliceId) -> impl Iterator<Item = &TreatmentPeriod> {
        self.periods
            .values()
            .filter(move |period| period.id.slice == slice)
    }
}

/// One slice engine and one period engine run together.
#[derive(Debug, Clone)]
pub struct EvaluationModel {
    pub slices: SliceEngine,
    pub periods: PeriodEngine,
}

impl EvaluationModel {
    pub fn new(slices: SliceEngine, periods: PeriodEngine) -> Self {
        Self { slices, periods }
    }

    /// Apply `policy` to both engines.
    #[must_use]
    pub fn with_policy(self, policy: CachePolicy) -> Self {
        Self {
            slices: self.slices.with_policy(policy),
            periods: self.periods.with_policy(policy),
        }
    }

    /// Run slice-major, period-minor.
    ///
    /// A failing slice aborts the run. A failing period is recorded in the
    /// summary and its siblings still run.
    pub fn run(
        &self,
        source: &dyn DataSource,
        store: &mut dyn MemoizedStore,
    ) -> Result<ModelResults> {
        let _span = info_span!("model_run").entered();
        let mut ledger = RunLedger::new();
        let mut results = ModelResults::default();

        for date in self.slices.anchors() {
            let slice = self.slices.run_one(date, source, store, &mut ledger)?;
            results.summary.count_slice(slice.outcome);

            for label in self.periods.labels_for(&slice) {
                match self
                    .periods
                    .run_one(&slice, label, source, store, &mut ledger)
                {
                    Ok(period) => {
                        results.summary.count_period(period.outcome);
                        results.periods.insert(period.id, period);
                    }
                    Err(EngineError::Period { id, source: cause }) => {
                        results.summary.failed.push((id, cause.to_string()));
                    }
                    Err(err) => return Err(err),
                }
            }
            results.slices.insert(slice.id, slice);
        }

        let summary = &results.summary;
        info!(
            slices = summary.slices(),
            slices_computed = summary.slices_computed,
            periods = summary.periods(),
            periods_computed = summary.periods_computed,
            failed = summary.failed.len(),
            "model run finished"
        );
        Ok(results)
    }
}
