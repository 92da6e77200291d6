pub mod columns;
pub mod config;
pub mod error;
pub mod selection;
pub mod taxonomy;

pub use columns::{AGE, ColumnNames, HOSP_STAY_DURATION, ICU_STAY_DURATION};
pub use config::{
    DEFAULT_MAX_PLAUSIBLE_AGE, DerivationConfig, EncodingConfig, PipelineConfig, PolicyKind,
    SelectionConfig, TaxonomyConfig, validate_policy,
};
pub use error::{ConfigError, Result};
pub use selection::{
    DegenerateFeature, DegeneratePolicy, DegenerateReason, FeatureScore, FeatureScoreReport,
    Scorer, SelectionPolicy,
};
pub use taxonomy::{CollisionPolicy, Taxonomy, TaxonomyCategory};
