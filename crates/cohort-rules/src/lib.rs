//! Eligibility rules and their composition.
//!
//! # Features
//!
//! - **RuleStep**: one pure transformation of a population table
//! - **Rule catalogue**: register population, age, claim code, claim duration,
//!   programme participation, aggregate eligibility
//! - **RulePipeline**: ordered steps, optionally resumed from seed data
//! - **TemporalSelector**: pipeline in force at a given date

mod error;
mod flags;
mod pipeline;
pub mod rules;
mod selector;
mod step;

// === Error Types ===
pub use error::{Result, RuleError};

// === Steps ===
pub use rules::{RuleConfig, RuleKind};
pub use step::{RuleStep, StepContext};

// === Composition ===
pub use pipeline::RulePipeline;
pub use selector::TemporalSelector;
