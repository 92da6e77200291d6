//! Shaping of the encounter table into the derived feature table.
//!
//! The raw dataset repeats each encounter once per diagnosis. The feature
//! table keeps one row per encounter, drops raw timestamp and diagnosis
//! columns, and orders the remaining columns for readability.

use std::collections::HashSet;

use polars::prelude::*;
use tracing::{debug, info, warn};

use icu_common::string_values;
use icu_model::{AGE, ColumnNames, HOSP_STAY_DURATION, ICU_STAY_DURATION};

use crate::error::{Result, TransformError};

/// Keeps the first row of every encounter, in order of first appearance.
///
/// Rows without an encounter identifier cannot be keyed and are dropped.
pub fn first_row_per_encounter(df: &DataFrame, encounter_id: &str) -> Result<DataFrame> {
    let ids = string_values(df, encounter_id).map_err(|_| TransformError::MissingColumn {
        column: encounter_id.to_string(),
    })?;
    let mut seen = HashSet::with_capacity(ids.len());
    let mut unkeyed = 0usize;
    let mask: BooleanChunked = ids
        .iter()
        .map(|id| match id {
            Some(id) => seen.insert(id.as_str()),
            None => {
                unkeyed += 1;
                false
            }
        })
        .collect();
    let deduplicated = df.filter(&mask)?;
    if unkeyed > 0 {
        warn!(rows = unkeyed, "rows without an encounter identifier dropped");
    }
    info!(
        input_rows = df.height(),
        encounters = deduplicated.height(),
        "encounters de-duplicated"
    );
    Ok(deduplicated)
}

/// Selects and orders the feature table columns.
///
/// Order: identifier, age, ICU stay, hospital stay, remaining columns in input
/// order, outcome last. Timestamp columns, the diagnosis code column and
/// `excluded` columns are dropped; excluded names absent from the table are
/// ignored.
pub fn arrange_feature_columns(
    df: &DataFrame,
    columns: &ColumnNames,
    excluded: &[String],
) -> Result<DataFrame> {
    let present: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .collect();
    let leading = [
        columns.encounter_id.as_str(),
        AGE,
        ICU_STAY_DURATION,
        HOSP_STAY_DURATION,
    ];
    for name in leading.into_iter().chain([columns.outcome.as_str()]) {
        if !present.iter().any(|column| column == name) {
            return Err(TransformError::MissingColumn {
                column: name.to_string(),
            });
        }
    }

    let timestamps = columns.timestamps();
    let dropped = |name: &str| {
        timestamps.contains(&name)
            || name == columns.diagnosis_code
            || excluded.iter().any(|excluded| excluded == name)
    };
    let mut order: Vec<&str> = leading.to_vec();
    order.extend(present.iter().map(String::as_str).filter(|name| {
        !leading.contains(name) && *name != columns.outcome && !dropped(*name)
    }));
    order.push(columns.outcome.as_str());

    debug!(columns = ?order, "feature columns arranged");
    Ok(df.select(order)?)
}

/// Columns of a table grouped by dtype.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnKinds {
    pub continuous: Vec<String>,
    pub categorical: Vec<String>,
    pub boolean: Vec<String>,
    pub integer: Vec<String>,
    pub datetime: Vec<String>,
}

/// Groups the columns of `df` by dtype, preserving column order within a group.
pub fn classify_columns(df: &DataFrame) -> ColumnKinds {
    let mut kinds = ColumnKinds::default();
    for column in df.get_columns() {
        let name = column.name().to_string();
        let dtype = column.dtype();
        if dtype.is_float() {
            kinds.continuous.push(name);
        } else if dtype.is_integer() {
            kinds.integer.push(name);
        } else if matches!(dtype, DataType::Boolean) {
            kinds.boolean.push(name);
        } else if dtype.is_temporal() {
            kinds.datetime.push(name);
        } else {
            kinds.categorical.push(name);
        }
    }
    kinds
}
