//! Error types for feature transforms.

use thiserror::Error;

/// Structural failures of a transform. Per-cell data problems never end up
/// here; they degrade to missing values.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("column not found: {column}")]
    MissingColumn { column: String },

    /// Indicator rows refer to encounters that are not in the feature table.
    #[error("indicator rows do not match the feature table index: {}", ids.join(", "))]
    IndexMismatch { ids: Vec<String> },

    /// Column is already categorical and cannot be quantized again.
    #[error("column {column} is already binned")]
    AlreadyBinned { column: String },

    #[error("column {column} is not numeric")]
    NotContinuous { column: String },

    #[error("column {column} has no observed values to fit quartiles")]
    NoObservedValues { column: String },

    /// Two taxonomy categories claim the same code under the reject policy.
    #[error("diagnosis code {code} is claimed by both {first} and {second}")]
    CodeCollision {
        code: String,
        first: String,
        second: String,
    },

    #[error("duplicate output column: {column}")]
    DuplicateColumn { column: String },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for TransformError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Result type for transform operations.
pub type Result<T> = std::result::Result<T, TransformError>;
