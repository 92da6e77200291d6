//! Error types for feature selection.

use thiserror::Error;

/// Failures that invalidate a selection run.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("column not found: {column}")]
    MissingColumn { column: String },

    #[error("outcome has {rows} missing values")]
    MissingOutcome { rows: usize },

    /// The outcome needs at least two classes to be scored against.
    #[error("outcome has {classes} distinct class(es); at least two are required")]
    SingleClassOutcome { classes: usize },

    #[error("feature {feature} has zero variance")]
    ZeroVariance { feature: String },

    #[error("feature {feature} has negative values; chi-squared requires non-negative features")]
    NegativeValue { feature: String },

    #[error("feature {feature} has missing or non-finite values")]
    NonFinite { feature: String },

    #[error("feature {feature} is not numeric")]
    NotNumeric { feature: String },

    #[error("no candidate features to score")]
    NoFeatures,

    #[error("invalid selection policy: {message}")]
    InvalidPolicy { message: String },

    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for SelectionError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

impl From<icu_model::ConfigError> for SelectionError {
    fn from(err: icu_model::ConfigError) -> Self {
        Self::InvalidPolicy {
            message: err.to_string(),
        }
    }
}

/// Result type for selection operations.
pub type Result<T> = std::result::Result<T, SelectionError>;
