//! Error types for encounter and taxonomy ingestion.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading the encounter dataset.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Input file not found.
    #[error("input file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Failed to read file.
    #[error("failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse CSV with Polars.
    #[error("failed to parse CSV {path}: {message}")]
    CsvParse { path: PathBuf, message: String },

    /// CSV file has a header but no rows.
    #[error("CSV file has no rows: {path}")]
    EmptyCsv { path: PathBuf },

    /// Required input columns are absent.
    #[error("required columns missing from input: {}", columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    /// Failed DataFrame operation.
    #[error("DataFrame operation failed: {message}")]
    DataFrame { message: String },
}

impl From<polars::prelude::PolarsError> for IngestError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        Self::DataFrame {
            message: err.to_string(),
        }
    }
}

/// Errors that can occur while loading the diagnosis taxonomy.
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document does not have the expected shape.
    #[error("malformed taxonomy {origin}: {message}")]
    Format { origin: String, message: String },

    #[error("unsupported taxonomy format for {path} (expected .yaml, .yml or .json)")]
    UnsupportedFormat { path: PathBuf },
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestError>;
