//! Column helpers shared by the rule implementations.

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use polars::prelude::{Column, DataFrame, IdxCa, IdxSize};

use cohort_ingest::frame::{date_values, duplicate_ids, has_column, string_values};
use cohort_model::Identity;

use crate::error::{Result, RuleError};

pub(crate) fn require_data<'d>(
    rule: &'static str,
    data: Option<&'d DataFrame>,
) -> Result<&'d DataFrame> {
    data.ok_or(RuleError::MissingInput { rule })
}

pub(crate) fn require_identity<'i>(
    rule: &'static str,
    identity: Option<&'i Identity>,
) -> Result<&'i Identity> {
    identity.ok_or(RuleError::MissingIdentity { rule })
}

pub(crate) fn require_column(rule: &'static str, data: &DataFrame, column: &str) -> Result<()> {
    if has_column(data, column) {
        Ok(())
    } else {
        Err(RuleError::MissingColumn {
            rule,
            column: column.to_string(),
        })
    }
}

/// Copy of `data` with one boolean column appended (or replaced).
pub(crate) fn append_flag(data: &DataFrame, name: &str, values: Vec<bool>) -> Result<DataFrame> {
    let mut out = data.clone();
    out.with_column(Column::new(name.into(), values))?;
    Ok(out)
}

pub(crate) fn dates(
    rule: &'static str,
    data: &DataFrame,
    column: &str,
) -> Result<Vec<Option<NaiveDate>>> {
    require_column(rule, data, column)?;
    Ok(date_values(data, column)?)
}

/// Boolean column values with nulls read as false.
pub(crate) fn bools(rule: &'static str, data: &DataFrame, column: &str) -> Result<Vec<bool>> {
    require_column(rule, data, column)?;
    let values = data.column(column)?.bool()?;
    Ok(values.into_iter().map(|v| v.unwrap_or(false)).collect())
}

/// Loose truthiness for register flag columns ("1", "Y", "true").
pub(crate) fn truthy(value: Option<&str>) -> bool {
    matches!(
        value.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "1.0" | "y" | "yes" | "true")
    )
}

pub(crate) fn id_set(data: &DataFrame, id_column: &str) -> Result<BTreeSet<String>> {
    Ok(string_values(data, id_column)?.into_iter().flatten().collect())
}

/// Inner join on the id column, keeping `data`'s row order.
///
/// Columns of `extra` other than the id replace same-named columns of `data`.
pub(crate) fn join_on_id(
    data: &DataFrame,
    extra: &DataFrame,
    id_column: &str,
) -> Result<DataFrame> {
    let extra_ids = string_values(extra, id_column)?;
    let mut positions: HashMap<&str, IdxSize> = HashMap::with_capacity(extra_ids.len());
    for (idx, id) in extra_ids.iter().enumerate() {
        if let Some(id) = id {
            positions.entry(id.as_str()).or_insert(idx as IdxSize);
        }
    }

    let mut left = Vec::new();
    let mut right = Vec::new();
    for (idx, id) in string_values(data, id_column)?.iter().enumerate() {
        if let Some(position) = id.as_deref().and_then(|id| positions.get(id)) {
            left.push(idx as IdxSize);
            right.push(*position);
        }
    }

    let mut joined = data.take(&IdxCa::from_vec("left".into(), left))?;
    let matched = extra.take(&IdxCa::from_vec("right".into(), right))?;
    for column in matched.get_columns() {
        if column.name().as_str() != id_column {
            joined.with_column(column.clone())?;
        }
    }
    Ok(joined)
}

/// Fail when the id column is absent or holds duplicates.
pub(crate) fn ensure_unique_ids(data: &DataFrame, id_column: &str) -> Result<()> {
    require_column("rule_pipeline", data, id_column)?;
    let duplicates = duplicate_ids(data, id_column)?;
    match duplicates.first() {
        None => Ok(()),
        Some(first) => Err(RuleError::IdentityCollision {
            count: duplicates.len(),
            first: first.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    #[test]
    fn join_keeps_left_order_and_replaces_columns() {
        let data = df!(
            "ppsn" => ["C", "A", "B"],
            "lr_code" => ["old", "old", "old"]
        )
        .unwrap();
        let extra = df!(
            "ppsn" => ["A", "C"],
            "lr_code" => ["UA", "UC"],
            "sex" => ["F", "M"]
        )
        .unwrap();

        let joined = join_on_id(&data, &extra, "ppsn").unwrap();

        assert_eq!(joined.height(), 2);
        let ids = joined.column("ppsn").unwrap().str().unwrap();
        let codes = joined.column("lr_code").unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("C"));
        assert_eq!(codes.get(0), Some("UC"));
        assert_eq!(ids.get(1), Some("A"));
        assert!(joined.column("sex").is_ok());
    }

    #[test]
    fn truthy_accepts_common_flag_spellings() {
        assert!(truthy(Some("1")));
        assert!(truthy(Some(" Y ")));
        assert!(truthy(Some("true")));
        assert!(!truthy(Some("0")));
        assert!(!truthy(None));
    }

    #[test]
    fn duplicate_ids_collide() {
        let data = df!("ppsn" => ["A", "B", "A"]).unwrap();
        let err = ensure_unique_ids(&data, "ppsn").unwrap_err();
        assert!(matches!(
            err,
            RuleError::IdentityCollision { count: 1, ref first } if first == "A"
        ));
    }
}
