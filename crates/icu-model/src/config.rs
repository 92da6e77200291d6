//! Pipeline configuration.
//!
//! Loaded from a TOML document; every table and key is optional.
//!
//! ```toml
//! [columns]
//! encounter_id = "icustay_id"
//!
//! [derivation]
//! max_plausible_age = 110
//!
//! [selection]
//! scorer = "chi2"
//! policy = "p_value"
//! threshold = 0.001
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::columns::ColumnNames;
use crate::error::{ConfigError, Result};
use crate::selection::{DegeneratePolicy, Scorer, SelectionPolicy};
use crate::taxonomy::CollisionPolicy;

/// Default ceiling for a plausible derived age, in years.
pub const DEFAULT_MAX_PLAUSIBLE_AGE: i64 = 110;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    pub columns: ColumnNames,
    pub derivation: DerivationConfig,
    pub taxonomy: TaxonomyConfig,
    pub encoding: EncodingConfig,
    pub selection: SelectionConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DerivationConfig {
    /// Ages strictly above this value are treated as missing.
    pub max_plausible_age: i64,
    /// Raw columns that are never used as features.
    pub excluded_columns: Vec<String>,
}

impl Default for DerivationConfig {
    fn default() -> Self {
        Self {
            max_plausible_age: DEFAULT_MAX_PLAUSIBLE_AGE,
            excluded_columns: [
                "hadm_id",
                "seq_num",
                "short_title",
                "icd9_code.1",
                "deathtime",
                "subject_id",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TaxonomyConfig {
    pub collision_policy: CollisionPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncodingConfig {
    /// Columns to quantize. Empty selects every Float64 column.
    pub continuous_columns: Vec<String>,
}

/// Name of the decision rule in the config file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    TopK,
    #[default]
    PValue,
    Score,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectionConfig {
    pub scorer: Scorer,
    pub policy: PolicyKind,
    /// Feature count for `top_k`; absent keeps every feature.
    pub k: Option<usize>,
    /// Threshold for `p_value` and `score`.
    pub threshold: f64,
    pub on_degenerate: DegeneratePolicy,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            scorer: Scorer::Chi2,
            policy: PolicyKind::PValue,
            k: None,
            threshold: 0.001,
            on_degenerate: DegeneratePolicy::Fail,
        }
    }
}

impl SelectionConfig {
    /// Resolves the configured rule into a [`SelectionPolicy`].
    pub fn policy(&self) -> Result<SelectionPolicy> {
        let policy = match self.policy {
            PolicyKind::TopK => SelectionPolicy::TopK(self.k),
            PolicyKind::PValue => SelectionPolicy::PValueBelow(self.threshold),
            PolicyKind::Score => SelectionPolicy::ScoreAtLeast(self.threshold),
        };
        validate_policy(self.scorer, policy)?;
        Ok(policy)
    }
}

/// Checks that a policy can be applied with the given scorer.
pub fn validate_policy(scorer: Scorer, policy: SelectionPolicy) -> Result<()> {
    match policy {
        SelectionPolicy::TopK(Some(0)) => Err(ConfigError::Invalid {
            message: "top-k selection needs k >= 1".to_string(),
        }),
        SelectionPolicy::PValueBelow(_) if !scorer.has_p_values() => Err(ConfigError::Invalid {
            message: format!(
                "p-value selection is not available for the {} scorer",
                scorer.as_str()
            ),
        }),
        SelectionPolicy::PValueBelow(threshold) if !(threshold > 0.0 && threshold <= 1.0) => {
            Err(ConfigError::Invalid {
                message: format!("p-value threshold must be in (0, 1], got {threshold}"),
            })
        }
        SelectionPolicy::ScoreAtLeast(threshold) if !threshold.is_finite() => {
            Err(ConfigError::Invalid {
                message: format!("score threshold must be finite, got {threshold}"),
            })
        }
        _ => Ok(()),
    }
}

impl PipelineConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|source| ConfigError::Toml { source })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.derivation.max_plausible_age <= 0 {
            return Err(ConfigError::Invalid {
                message: format!(
                    "max_plausible_age must be positive, got {}",
                    self.derivation.max_plausible_age
                ),
            });
        }
        let required = self.columns.required();
        for (idx, name) in required.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(ConfigError::Invalid {
                    message: "column names must not be empty".to_string(),
                });
            }
            if required[..idx].contains(name) {
                return Err(ConfigError::Invalid {
                    message: format!("column '{name}' is configured for two roles"),
                });
            }
        }
        self.selection.policy()?;
        Ok(())
    }
}
