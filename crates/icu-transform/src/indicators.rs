//! Per-encounter benchmark diagnosis indicators.
//!
//! One row per encounter, one 0/1 column per benchmark category. A cell is 1
//! when any diagnosis of the encounter resolves to that category.

use std::collections::{BTreeSet, HashMap};

use polars::prelude::*;
use tracing::info;

use icu_common::string_values;

use crate::diagnosis::ResolvedDiagnosis;
use crate::error::{Result, TransformError};

/// Encounter by category indicator matrix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosisIndicatorMatrix {
    encounter_ids: Vec<String>,
    categories: Vec<String>,
    /// Row-major, `encounter_ids.len() * categories.len()` cells.
    values: Vec<bool>,
}

impl DiagnosisIndicatorMatrix {
    pub fn encounter_ids(&self) -> &[String] {
        &self.encounter_ids
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Indicator for `(row, column)`; out-of-range positions read as unset.
    pub fn get(&self, row: usize, column: usize) -> bool {
        if column >= self.categories.len() {
            return false;
        }
        self.values
            .get(row * self.categories.len() + column)
            .copied()
            .unwrap_or(false)
    }

    /// Indicators of one encounter, in category order.
    pub fn row(&self, encounter_id: &str) -> Option<&[bool]> {
        let row = self.encounter_ids.iter().position(|id| id == encounter_id)?;
        let width = self.categories.len();
        Some(&self.values[row * width..(row + 1) * width])
    }

    /// Renders the matrix with an identifier column followed by Int32 indicators.
    pub fn to_frame(&self, id_column: &str) -> Result<DataFrame> {
        let mut columns: Vec<Column> = Vec::with_capacity(self.categories.len() + 1);
        columns.push(Series::new(id_column.into(), self.encounter_ids.clone()).into());
        for (idx, category) in self.categories.iter().enumerate() {
            columns.push(Series::new(category.as_str().into(), self.column_values(idx)).into());
        }
        Ok(DataFrame::new(columns)?)
    }

    fn column_values(&self, column: usize) -> Vec<i32> {
        (0..self.encounter_ids.len())
            .map(|row| i32::from(self.get(row, column)))
            .collect()
    }
}

/// Builds the indicator matrix over `encounter_ids` and `categories`.
///
/// Every encounter gets a row, including encounters without any resolved
/// diagnosis. Diagnoses that are not benchmark-eligible, or whose category is
/// not a column, are ignored. A diagnosis for an encounter outside
/// `encounter_ids` is an [`TransformError::IndexMismatch`].
pub fn build_indicator_matrix(
    encounter_ids: &[String],
    categories: &[String],
    diagnoses: &[ResolvedDiagnosis],
) -> Result<DiagnosisIndicatorMatrix> {
    let rows: HashMap<&str, usize> = encounter_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let columns: HashMap<&str, usize> = categories
        .iter()
        .enumerate()
        .map(|(idx, name)| (name.as_str(), idx))
        .collect();

    let width = categories.len();
    let mut values = vec![false; encounter_ids.len() * width];
    let mut unknown = BTreeSet::new();
    for diagnosis in diagnoses.iter().filter(|diagnosis| diagnosis.use_in_benchmark) {
        let Some(&row) = rows.get(diagnosis.encounter_id.as_str()) else {
            unknown.insert(diagnosis.encounter_id.clone());
            continue;
        };
        let column = diagnosis
            .category
            .as_deref()
            .and_then(|category| columns.get(category));
        if let Some(&column) = column {
            values[row * width + column] = true;
        }
    }
    if !unknown.is_empty() {
        return Err(TransformError::IndexMismatch {
            ids: unknown.into_iter().collect(),
        });
    }

    let flagged = values.iter().filter(|value| **value).count();
    info!(
        encounters = encounter_ids.len(),
        categories = width,
        flagged,
        "diagnosis indicators built"
    );
    Ok(DiagnosisIndicatorMatrix {
        encounter_ids: encounter_ids.to_vec(),
        categories: categories.to_vec(),
        values,
    })
}

/// Appends the indicator columns to the feature table, aligned by identifier.
///
/// Feature rows without a matrix row get all-zero indicators. Matrix rows for
/// identifiers absent from the feature table are an
/// [`TransformError::IndexMismatch`].
pub fn merge_indicators(
    features: &DataFrame,
    id_column: &str,
    matrix: &DiagnosisIndicatorMatrix,
) -> Result<DataFrame> {
    let ids = string_values(features, id_column).map_err(|_| TransformError::MissingColumn {
        column: id_column.to_string(),
    })?;
    let present: BTreeSet<&str> = ids.iter().flatten().map(String::as_str).collect();
    let orphaned: Vec<String> = matrix
        .encounter_ids
        .iter()
        .filter(|id| !present.contains(id.as_str()))
        .cloned()
        .collect();
    if !orphaned.is_empty() {
        return Err(TransformError::IndexMismatch { ids: orphaned });
    }

    let matrix_rows: HashMap<&str, usize> = matrix
        .encounter_ids
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let aligned: Vec<Option<usize>> = ids
        .iter()
        .map(|id| id.as_deref().and_then(|id| matrix_rows.get(id).copied()))
        .collect();

    let mut merged = features.clone();
    for (column, category) in matrix.categories.iter().enumerate() {
        if merged.get_column_index(category).is_some() {
            return Err(TransformError::DuplicateColumn {
                column: category.clone(),
            });
        }
        let values: Vec<i32> = aligned
            .iter()
            .map(|row| row.map_or(0, |row| i32::from(matrix.get(row, column))))
            .collect();
        merged.with_column(Series::new(category.as_str().into(), values))?;
    }
    info!(
        rows = merged.height(),
        columns = merged.width(),
        "diagnosis indicators merged"
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diagnosis(id: &str, category: Option<&str>, use_in_benchmark: bool) -> ResolvedDiagnosis {
        ResolvedDiagnosis {
            encounter_id: id.to_string(),
            category: category.map(ToString::to_string),
            use_in_benchmark,
        }
    }

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn single_diagnosis_sets_single_indicator() {
        let matrix = build_indicator_matrix(
            &strings(&["1"]),
            &strings(&["Acute Renal Failure", "Heart Failure", "Septicemia"]),
            &[diagnosis("1", Some("Heart Failure"), true)],
        )
        .unwrap();
        assert_eq!(matrix.row("1"), Some(&[false, true, false][..]));
    }

    #[test]
    fn repeated_categories_collapse() {
        let matrix = build_indicator_matrix(
            &strings(&["1", "2", "3"]),
            &strings(&["Heart Failure", "Shock"]),
            &[
                diagnosis("1", Some("Heart Failure"), true),
                diagnosis("1", Some("Heart Failure"), true),
                diagnosis("1", Some("Shock"), true),
                diagnosis("2", Some("Fracture"), false),
                diagnosis("2", None, false),
            ],
        )
        .unwrap();
        assert_eq!(matrix.row("1"), Some(&[true, true][..]));
        assert_eq!(matrix.row("2"), Some(&[false, false][..]));
        assert_eq!(matrix.row("3"), Some(&[false, false][..]));
        assert_eq!(matrix.row("4"), None);
    }

    #[test]
    fn unknown_encounter_is_index_mismatch() {
        let error = build_indicator_matrix(
            &strings(&["1"]),
            &strings(&["Shock"]),
            &[diagnosis("9", Some("Shock"), true)],
        )
        .unwrap_err();
        assert!(matches!(error, TransformError::IndexMismatch { ids } if ids == vec!["9"]));
    }

    #[test]
    fn frame_has_int32_indicators() {
        let matrix = build_indicator_matrix(
            &strings(&["1", "2"]),
            &strings(&["Shock"]),
            &[diagnosis("2", Some("Shock"), true)],
        )
        .unwrap();
        let frame = matrix.to_frame("icustay_id").unwrap();
        let shock = frame.column("Shock").unwrap();
        assert_eq!(shock.dtype(), &DataType::Int32);
        let values: Vec<Option<i32>> = shock
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(0), Some(1)]);
    }

    #[test]
    fn merge_aligns_by_identifier() {
        let features = DataFrame::new(vec![
            Series::new("icustay_id".into(), ["2", "1", "3"]).into(),
            Series::new("hospital_expire_flag".into(), ["1", "0", "0"]).into(),
        ])
        .unwrap();
        let matrix = build_indicator_matrix(
            &strings(&["1", "2"]),
            &strings(&["Shock"]),
            &[diagnosis("2", Some("Shock"), true)],
        )
        .unwrap();
        let merged = merge_indicators(&features, "icustay_id", &matrix).unwrap();
        let values: Vec<Option<i32>> = merged
            .column("Shock")
            .unwrap()
            .as_materialized_series()
            .i32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(1), Some(0), Some(0)]);
    }

    #[test]
    fn merge_rejects_orphaned_rows_and_duplicates() {
        let features =
            DataFrame::new(vec![Series::new("icustay_id".into(), ["1"]).into()]).unwrap();
        let orphaned =
            build_indicator_matrix(&strings(&["1", "5"]), &strings(&["Shock"]), &[]).unwrap();
        assert!(matches!(
            merge_indicators(&features, "icustay_id", &orphaned).unwrap_err(),
            TransformError::IndexMismatch { .. }
        ));

        let clashing =
            build_indicator_matrix(&strings(&["1"]), &strings(&["icustay_id"]), &[]).unwrap();
        assert!(matches!(
            merge_indicators(&features, "icustay_id", &clashing).unwrap_err(),
            TransformError::DuplicateColumn { .. }
        ));
    }
}
