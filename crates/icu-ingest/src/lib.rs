//! Input loading for the ICU feature pipeline.
//!
//! - **encounters**: the denormalized encounter CSV, read into a Polars `DataFrame`
//! - **taxonomy**: the diagnosis category document (YAML or JSON)

pub mod encounters;
pub mod error;
pub mod taxonomy;

pub use encounters::{read_encounter_table, require_columns};
pub use error::{IngestError, Result, TaxonomyError};
pub use taxonomy::{TaxonomyFormat, load_taxonomy, parse_taxonomy};
