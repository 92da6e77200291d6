//! Univariate feature selection against a binary (or multi-class) outcome.
//!
//! - **stats**: χ² upper-tail probabilities via the incomplete gamma function
//! - **scoring**: χ² and mutual-information scores of a single feature
//! - **selector**: scoring of a whole feature table and policy-based selection

pub mod error;
pub mod scoring;
pub mod selector;
pub mod stats;

pub use error::{Result, SelectionError};
pub use scoring::{ClassLabels, chi2, mutual_information};
pub use selector::{SelectionResult, apply_policy, score_features, select_features};
pub use stats::chi2_survival;
