use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use cohort_engine::{ModelResults, SnapshotOutcome};
use cohort_model::SliceId;

use crate::commands::RunOutcome;

pub fn print_summary(outcome: &RunOutcome) {
    println!("Data: {}", outcome.config.data_dir.display());
    println!("Store: {}", outcome.store_dir.display());
    println!("{}", slice_table(&outcome.results));
    if let Some(table) = failure_table(&outcome.results) {
        println!();
        println!("Failed periods:");
        println!("{table}");
    }
}

/// One row per slice plus a total row.
pub fn slice_table(results: &ModelResults) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Slice"),
        header_cell("Subjects"),
        header_cell("Snapshot"),
        header_cell("Periods"),
        header_cell("Computed"),
        header_cell("Failed"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Center);
    for index in 3..6 {
        align_column(&mut table, index, CellAlignment::Right);
    }

    for slice in results.slices.values() {
        let periods: Vec<_> = results.periods_of(slice.id).collect();
        let computed = periods
            .iter()
            .filter(|period| period.outcome == SnapshotOutcome::Computed)
            .count();
        table.add_row(vec![
            Cell::new(slice.id).fg(Color::Blue).add_attribute(Attribute::Bold),
            Cell::new(slice.data.height()),
            outcome_cell(slice.outcome),
            Cell::new(periods.len()),
            count_cell(computed, Color::Green),
            count_cell(failures_of(results, slice.id), Color::Red),
        ]);
    }

    let summary = &results.summary;
    table.add_row(vec![
        Cell::new("TOTAL")
            .fg(Color::Cyan)
            .add_attribute(Attribute::Bold),
        dim_cell("-"),
        Cell::new(format!(
            "{} loaded / {} computed",
            summary.slices_loaded, summary.slices_computed
        ))
        .add_attribute(Attribute::Bold),
        Cell::new(summary.periods()).add_attribute(Attribute::Bold),
        count_cell(summary.periods_computed, Color::Green).add_attribute(Attribute::Bold),
        count_cell(summary.failed.len(), Color::Red).add_attribute(Attribute::Bold),
    ]);
    table
}

/// `None` when every period succeeded.
pub fn failure_table(results: &ModelResults) -> Option<Table> {
    if results.summary.failed.is_empty() {
        return None;
    }
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Slice"),
        header_cell("Period"),
        header_cell("Error"),
    ]);
    apply_table_style(&mut table);
    for (id, message) in &results.summary.failed {
        table.add_row(vec![
            Cell::new(id.slice),
            Cell::new(id.period),
            Cell::new(message).fg(Color::Red),
        ]);
    }
    Some(table)
}

fn failures_of(results: &ModelResults, slice: SliceId) -> usize {
    results
        .summary
        .failed
        .iter()
        .filter(|(id, _)| id.slice == slice)
        .count()
}

pub fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn outcome_cell(outcome: SnapshotOutcome) -> Cell {
    match outcome {
        SnapshotOutcome::Computed => Cell::new(outcome.label()).fg(Color::Green),
        SnapshotOutcome::Loaded => dim_cell(outcome.label()),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color)
    } else {
        dim_cell(count)
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
