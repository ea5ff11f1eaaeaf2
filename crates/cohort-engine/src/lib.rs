//! Slice and treatment-period orchestration.
//!
//! A [`SliceEngine`] walks the cohort anchor dates; for each anchor it reads
//! the population slice from the store or runs the pipeline in force at that
//! date and writes the result through. A [`PeriodEngine`] does the same one
//! level down, seeding each treatment period from its parent slice.
//! [`EvaluationModel`] runs both, slice-major and period-minor.

pub mod config;
mod error;
mod model;
mod period;
mod slice;
mod snapshot;

// === Error Types ===
pub use error::{EngineError, Result};

// === Engines ===
pub use period::{PeriodEngine, PeriodRun, TreatmentPeriod};
pub use slice::{PopulationSlice, SliceEngine, SliceRun};
pub use snapshot::{CachePolicy, RunLedger, SnapshotOutcome};

// === Model ===
pub use config::ModelConfig;
pub use model::{EvaluationModel, ModelResults, RunSummary};
