//! ICU encounter feature transforms.
//!
//! Turns the denormalized encounter table into a model-ready feature table.
//!
//! # Overview
//!
//! - **temporal**: age at ICU admission, ICU and hospital stay lengths
//! - **frame**: one row per encounter, feature column ordering, dtype grouping
//! - **diagnosis**: diagnosis code to taxonomy category lookup
//! - **indicators**: per-encounter benchmark category indicators
//! - **quantize**: quartile binning of continuous columns
//! - **encode**: one-hot expansion of categorical columns
//!
//! # Design Principles
//!
//! - **Degrade to missing**: per-row data problems become missing values and a
//!   logged count, never an error
//! - **Deterministic columns**: categories and indicator columns are emitted in
//!   sorted order so repeated runs produce identical tables

pub mod diagnosis;
pub mod encode;
pub mod error;
pub mod frame;
pub mod indicators;
pub mod quantize;
pub mod temporal;

pub use diagnosis::{
    CategoryAssignment, CodeCollision, CodeLookup, ResolvedDiagnosis, benchmark_categories,
    resolve_diagnoses,
};
pub use encode::{encode_categorical, indicator_name};
pub use error::{Result, TransformError};
pub use frame::{ColumnKinds, arrange_feature_columns, classify_columns, first_row_per_encounter};
pub use indicators::{DiagnosisIndicatorMatrix, build_indicator_matrix, merge_indicators};
pub use quantize::{BIN_LABELS, QuartileBoundaries, quantize_column, quantize_columns};
pub use temporal::{age_in_years, derive_temporal_features, parse_timestamp, whole_hours_between};
