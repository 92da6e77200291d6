//! One-hot encoding of categorical and binned columns.

use std::collections::{BTreeSet, HashSet};

use polars::prelude::*;
use tracing::{debug, info};

use icu_common::string_values;

use crate::error::{Result, TransformError};

/// Name of the indicator column for `value` of `column`.
pub fn indicator_name(column: &str, value: &str) -> String {
    format!("{column}_{value}")
}

/// Expands every column not listed in `passthrough` into Int32 0/1 indicators.
///
/// Passthrough columns keep their relative order and come first. Encoded
/// columns follow, ordered by source column name and then by value. A missing
/// cell sets none of its column's indicators.
pub fn encode_categorical(df: &DataFrame, passthrough: &[String]) -> Result<DataFrame> {
    for name in passthrough {
        if df.get_column_index(name).is_none() {
            return Err(TransformError::MissingColumn {
                column: name.clone(),
            });
        }
    }

    let mut kept: Vec<Column> = Vec::new();
    let mut sources: Vec<String> = Vec::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if passthrough.iter().any(|keep| keep == name) {
            kept.push(column.clone());
        } else {
            sources.push(name.to_string());
        }
    }
    sources.sort();

    let mut names: HashSet<String> = kept.iter().map(|c| c.name().to_string()).collect();
    let mut encoded: Vec<Column> = Vec::new();
    for source in &sources {
        let values = string_values(df, source)?;
        let distinct: BTreeSet<&str> = values.iter().flatten().map(String::as_str).collect();
        debug!(column = %source, levels = distinct.len(), "encoding column");
        for level in distinct {
            let name = indicator_name(source, level);
            if !names.insert(name.clone()) {
                return Err(TransformError::DuplicateColumn { column: name });
            }
            let indicator: Vec<i32> = values
                .iter()
                .map(|value| i32::from(value.as_deref() == Some(level)))
                .collect();
            encoded.push(Series::new(name.into(), indicator).into());
        }
    }

    info!(
        passthrough = kept.len(),
        encoded_sources = sources.len(),
        indicators = encoded.len(),
        "categorical columns encoded"
    );
    kept.extend(encoded);
    Ok(DataFrame::new(kept)?)
}
