//! Encounter dataset loading.
//!
//! The dataset is read with every column as text; typed interpretation
//! (timestamps, numbers, outcome flags) happens downstream so that malformed
//! cells degrade to missing instead of failing the read.

use std::path::Path;

use polars::prelude::*;
use tracing::{debug, info};

use icu_model::ColumnNames;

use crate::error::{IngestError, Result};

/// Reads the encounter CSV and checks that every configured column is present.
pub fn read_encounter_table(path: &Path, columns: &ColumnNames) -> Result<DataFrame> {
    std::fs::metadata(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    if df.height() == 0 {
        return Err(IngestError::EmptyCsv {
            path: path.to_path_buf(),
        });
    }
    require_columns(&df, &columns.required())?;

    info!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "encounter table loaded"
    );
    debug!(columns = ?df.get_column_names(), "encounter columns");
    Ok(df)
}

/// Fails with [`IngestError::MissingColumns`] listing every absent column.
pub fn require_columns(df: &DataFrame, required: &[&str]) -> Result<()> {
    let present: Vec<&str> = df
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    let missing: Vec<String> = required
        .iter()
        .filter(|name| !present.contains(name))
        .map(|name| (*name).to_string())
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(IngestError::MissingColumns { columns: missing })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_columns_lists_all_missing() {
        let df = DataFrame::new(vec![
            Series::new("icustay_id".into(), ["1"]).into(),
            Series::new("dob".into(), ["2100-01-01"]).into(),
        ])
        .unwrap();
        let error = require_columns(&df, &["icustay_id", "intime", "outtime"]).unwrap_err();
        match error {
            IngestError::MissingColumns { columns } => {
                assert_eq!(columns, vec!["intime", "outtime"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn require_columns_accepts_superset() {
        let df = DataFrame::new(vec![
            Series::new("a".into(), ["1"]).into(),
            Series::new("b".into(), ["2"]).into(),
        ])
        .unwrap();
        assert!(require_columns(&df, &["b"]).is_ok());
    }
}
