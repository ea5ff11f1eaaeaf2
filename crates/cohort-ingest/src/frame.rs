//! DataFrame helpers shared by sources, rules and stores.
//!
//! Dates travel as ISO 8601 strings (`YYYY-MM-DD`, optionally followed by a
//! time part) and are parsed on demand.

use std::collections::HashSet;

use chrono::NaiveDate;
use polars::prelude::{BooleanChunked, DataFrame, DataType, NewChunkedArray, PolarsResult};

/// Parse the date part of an ISO 8601 date or datetime string.
pub fn parse_iso_date(value: &str) -> Option<NaiveDate> {
    let trimmed = value.trim();
    let date_part = trimmed.get(..10).unwrap_or(trimmed);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|col| col.as_str() == name)
}

/// Column values rendered as strings. Nulls and blank strings become `None`.
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = df.column(name)?.cast(&DataType::String)?;
    let values = column.str()?;
    Ok(values
        .into_iter()
        .map(|value| {
            value
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
        .collect())
}

/// Column values parsed as dates. Unparseable values become `None`.
pub fn date_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<NaiveDate>>> {
    Ok(string_values(df, name)?
        .into_iter()
        .map(|value| value.as_deref().and_then(parse_iso_date))
        .collect())
}

/// Keep the rows whose mask entry is true.
pub fn mask_rows(df: &DataFrame, keep: &[bool]) -> PolarsResult<DataFrame> {
    let mask = BooleanChunked::from_slice("mask".into(), keep);
    df.filter(&mask)
}

/// Replace the id column with its string rendering.
pub fn ensure_string_ids(df: &mut DataFrame, id_column: &str) -> PolarsResult<()> {
    let ids = df.column(id_column)?.cast(&DataType::String)?;
    df.with_column(ids)?;
    Ok(())
}

/// Collapse duplicate subjects to their first record.
///
/// Rows after the first for an id are treated as missing and dropped along
/// with rows that have no id at all. Returns the deduplicated frame and the
/// number of rows removed.
pub fn dedupe_first(df: &DataFrame, id_column: &str) -> PolarsResult<(DataFrame, usize)> {
    let ids = string_values(df, id_column)?;
    let mut seen = HashSet::with_capacity(ids.len());
    let keep: Vec<bool> = ids
        .iter()
        .map(|id| id.as_ref().is_some_and(|id| seen.insert(id.clone())))
        .collect();
    let removed = keep.iter().filter(|kept| !**kept).count();
    if removed == 0 {
        return Ok((df.clone(), 0));
    }
    Ok((mask_rows(df, &keep)?, removed))
}

/// Ids that occur more than once, in first-seen order.
pub fn duplicate_ids(df: &DataFrame, id_column: &str) -> PolarsResult<Vec<String>> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut duplicates = Vec::new();
    for id in string_values(df, id_column)?.into_iter().flatten() {
        if !seen.insert(id.clone()) && reported.insert(id.clone()) {
            duplicates.push(id);
        }
    }
    Ok(duplicates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn parses_dates_and_datetimes() {
        assert_eq!(
            parse_iso_date("2016-01-01"),
            NaiveDate::from_ymd_opt(2016, 1, 1)
        );
        assert_eq!(
            parse_iso_date("2016-01-01 00:00:00"),
            NaiveDate::from_ymd_opt(2016, 1, 1)
        );
        assert_eq!(parse_iso_date("01/01/2016"), None);
        assert_eq!(parse_iso_date(""), None);
    }

    #[test]
    fn dedupe_keeps_first_and_drops_missing_ids() {
        let df = df!(
            "ppsn" => [Some("A"), Some("B"), Some("A"), None, Some("C")],
            "code" => ["UA", "UB", "UC", "UD", "UE"]
        )
        .unwrap();

        let (deduped, removed) = dedupe_first(&df, "ppsn").unwrap();

        assert_eq!(removed, 2);
        assert_eq!(deduped.height(), 3);
        let codes = deduped.column("code").unwrap().str().unwrap();
        assert_eq!(codes.get(0), Some("UA"));
        assert_eq!(codes.get(1), Some("UB"));
        assert_eq!(codes.get(2), Some("UE"));
    }

    #[test]
    fn duplicate_ids_reported_once() {
        let df = df!("ppsn" => ["A", "B", "A", "A", "B", "C"]).unwrap();
        assert_eq!(duplicate_ids(&df, "ppsn").unwrap(), vec!["A", "B"]);
    }

    #[test]
    fn numeric_ids_become_strings() {
        let mut df = df!("ppsn" => [101i64, 102, 103]).unwrap();
        ensure_string_ids(&mut df, "ppsn").unwrap();
        let ids = df.column("ppsn").unwrap().str().unwrap();
        assert_eq!(ids.get(1), Some("102"));
    }
}
