//! Shared utilities for the ICU feature crates.
//!
//! This crate provides the Polars helpers used across the workspace for
//! pulling typed, missing-aware values out of `DataFrame` columns.

pub mod polars;

// Re-export commonly used functions at crate root for convenience
pub use polars::{any_to_string, f64_values, format_numeric, parse_f64, string_values};
