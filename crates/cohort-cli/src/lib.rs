//! CLI library components for the cohort builder.

pub mod cli;
pub mod commands;
pub mod logging;
pub mod summary;
