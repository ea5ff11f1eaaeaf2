use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tracing::{info, info_span};

use cohort_engine::{CachePolicy, ModelConfig, ModelResults};
use cohort_ingest::CsvDirectorySource;
use cohort_rules::RuleKind;
use cohort_store::CsvStore;

use crate::cli::RunArgs;
use crate::summary::{apply_table_style, dim_cell};

/// What `cohort run` produced.
#[derive(Debug)]
pub struct RunOutcome {
    pub config: ModelConfig,
    pub store_dir: PathBuf,
    pub results: ModelResults,
}

impl RunOutcome {
    pub fn has_failures(&self) -> bool {
        !self.results.summary.failed.is_empty()
    }
}

pub fn run_model(args: &RunArgs) -> Result<RunOutcome> {
    let config = ModelConfig::from_path(&args.config)
        .with_context(|| format!("load model config {}", args.config.display()))?;
    let run_span = info_span!("run", config = %args.config.display());
    let _run_guard = run_span.enter();
    let started = Instant::now();

    let source = CsvDirectorySource::open(&config.data_dir, &config.id_column)
        .with_context(|| format!("open data directory {}", config.data_dir.display()))?;
    let store_dir = args
        .store_dir
        .clone()
        .unwrap_or_else(|| config.store_dir.clone());
    let mut store = CsvStore::open(&store_dir)
        .with_context(|| format!("open store {}", store_dir.display()))?;

    let mut model = config.build_model().context("build model")?;
    if args.rebuild {
        model = model.with_policy(CachePolicy::Rebuild);
    }
    let results = model.run(&source, &mut store).context("run model")?;
    info!(
        store = %store_dir.display(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "run complete"
    );
    Ok(RunOutcome {
        config,
        store_dir,
        results,
    })
}

/// The rule catalogue as a table.
pub fn rules_table() -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Rule", "Output column", "Description"]);
    apply_table_style(&mut table);
    for kind in RuleKind::ALL {
        let column = match kind.output_column() {
            Some(column) => Cell::new(column),
            None => dim_cell("-"),
        };
        table.add_row(vec![
            Cell::new(kind.name()),
            column,
            Cell::new(kind.description()),
        ]);
    }
    table
}

pub fn run_rules() -> Result<()> {
    println!("{}", rules_table());
    Ok(())
}
