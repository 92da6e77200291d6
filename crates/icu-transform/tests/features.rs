//! Derivation of the feature table from a small long-format encounter table.

use icu_common::string_values;
use icu_model::{ColumnNames, CollisionPolicy, DerivationConfig, Taxonomy, TaxonomyCategory};
use icu_transform::{
    CodeLookup, arrange_feature_columns, benchmark_categories, build_indicator_matrix,
    derive_temporal_features, encode_categorical, first_row_per_encounter, merge_indicators,
    quantize_columns, resolve_diagnoses,
};
use polars::prelude::*;
use std::collections::BTreeMap;

fn encounters() -> DataFrame {
    #[rustfmt::skip]
    let rows = [
        // subject, stay, dob, admit, discharge, in, out, code, died, gender
        ("1", "100", "2100-01-01", "2145-06-01 08:00:00", "2145-06-05 08:00:00",
         "2145-06-01 10:00:00", "2145-06-02 10:00:00", "428.0", "0", "M"),
        ("2", "200", "2080-03-15", "2150-01-10 00:00:00", "2150-01-12 00:00:00",
         "2150-01-10 06:00:00", "2150-01-10 18:00:00", "5849", "1", "F"),
        ("2", "200", "2080-03-15", "2150-01-10 00:00:00", "2150-01-12 00:00:00",
         "2150-01-10 06:00:00", "2150-01-10 18:00:00", "428.0", "1", "F"),
        ("3", "300", "", "2150-02-01 00:00:00", "2150-02-03 00:00:00",
         "2150-02-01 02:00:00", "2150-02-01 01:00:00", "V1582", "0", "F"),
        ("4", "400", "1900-01-01", "2150-04-01 00:00:00", "2150-04-09 00:00:00",
         "2150-04-01 03:00:00", "2150-04-03 03:00:00", "82000", "1", "M"),
    ];
    macro_rules! column {
        ($name:expr, $idx:tt) => {
            Series::new(
                $name.into(),
                rows.iter().map(|row| row.$idx).collect::<Vec<&str>>(),
            )
            .into()
        };
    }
    DataFrame::new(vec![
        column!("subject_id", 0),
        column!("icustay_id", 1),
        column!("dob", 2),
        column!("admittime", 3),
        column!("dischtime", 4),
        column!("intime", 5),
        column!("outtime", 6),
        column!("icd9_code", 7),
        column!("hospital_expire_flag", 8),
        column!("gender", 9),
    ])
    .unwrap()
}

fn taxonomy() -> Taxonomy {
    let mut categories = BTreeMap::new();
    categories.insert(
        "Heart Failure".to_string(),
        TaxonomyCategory {
            codes: vec!["428.0".to_string()],
            use_in_benchmark: true,
        },
    );
    categories.insert(
        "Acute Renal Failure".to_string(),
        TaxonomyCategory {
            codes: vec!["5849".to_string()],
            use_in_benchmark: true,
        },
    );
    categories.insert(
        "Fracture".to_string(),
        TaxonomyCategory {
            codes: vec!["82000".to_string()],
            use_in_benchmark: false,
        },
    );
    Taxonomy::new(categories)
}

fn ints(df: &DataFrame, name: &str) -> Vec<i32> {
    df.column(name)
        .unwrap()
        .as_materialized_series()
        .i32()
        .unwrap()
        .into_iter()
        .map(|v| v.unwrap_or(-1))
        .collect()
}

#[test]
fn builds_encoded_feature_table() {
    let columns = ColumnNames::default();
    let derivation = DerivationConfig::default();
    let raw = encounters();

    let derived = derive_temporal_features(&raw, &columns, derivation.max_plausible_age).unwrap();
    let per_encounter = first_row_per_encounter(&derived, &columns.encounter_id).unwrap();
    let features =
        arrange_feature_columns(&per_encounter, &columns, &derivation.excluded_columns).unwrap();
    assert_eq!(features.height(), 4);

    let ages = features
        .column("age")
        .unwrap()
        .as_materialized_series()
        .f64()
        .unwrap()
        .into_iter()
        .collect::<Vec<_>>();
    assert_eq!(ages, vec![Some(45.0), Some(69.0), None, None]);

    let lookup = CodeLookup::build(&taxonomy(), CollisionPolicy::FirstWins).unwrap();
    let categories = benchmark_categories(&lookup);
    assert_eq!(categories, vec!["Acute Renal Failure", "Heart Failure"]);
    let diagnoses =
        resolve_diagnoses(&raw, &columns.encounter_id, &columns.diagnosis_code, &lookup).unwrap();
    let ids: Vec<String> = string_values(&features, &columns.encounter_id)
        .unwrap()
        .into_iter()
        .flatten()
        .collect();
    let matrix = build_indicator_matrix(&ids, &categories, &diagnoses).unwrap();
    assert_eq!(matrix.row("100"), Some(&[false, true][..]));
    assert_eq!(matrix.row("200"), Some(&[true, true][..]));
    assert_eq!(matrix.row("400"), Some(&[false, false][..]));

    let merged = merge_indicators(&features, &columns.encounter_id, &matrix).unwrap();
    let continuous = vec![
        "age".to_string(),
        "icu_stay_duration".to_string(),
        "hosp_stay_duration".to_string(),
    ];
    let (quantized, boundaries) = quantize_columns(&merged, &continuous).unwrap();
    assert_eq!(boundaries.len(), 3);

    let mut passthrough = vec![columns.encounter_id.clone(), columns.outcome.clone()];
    passthrough.extend(categories.iter().cloned());
    let encoded = encode_categorical(&quantized, &passthrough).unwrap();

    assert_eq!(ints(&encoded, "Heart Failure"), vec![1, 1, 0, 0]);
    assert_eq!(ints(&encoded, "gender_M"), vec![1, 0, 0, 1]);
    let names: Vec<&str> = encoded
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(
        &names[..4],
        &[
            "icustay_id",
            "hospital_expire_flag",
            "Acute Renal Failure",
            "Heart Failure"
        ]
    );
    assert!(names.iter().all(|name| !name.starts_with("subject_id")));
    assert!(names.contains(&"age_Q0"));
    assert!(!names.iter().any(|name| name.starts_with("icd9_code")));
}
