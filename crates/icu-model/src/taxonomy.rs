//! Diagnosis taxonomy: category name to raw codes and benchmark eligibility.
//!
//! The document shape is the HCUP CCS 2015 definitions file: top-level keys are
//! category names, each entry carries a `codes` list and a `use_in_benchmark`
//! flag. Additional keys (e.g. `type`, `id`) are accepted and ignored.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// One diagnosis category of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxonomyCategory {
    #[serde(deserialize_with = "deserialize_codes")]
    pub codes: Vec<String>,
    pub use_in_benchmark: bool,
}

/// Read-only code taxonomy, keyed by category name (sorted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Taxonomy {
    categories: BTreeMap<String, TaxonomyCategory>,
}

impl Taxonomy {
    pub fn new(categories: BTreeMap<String, TaxonomyCategory>) -> Self {
        Self { categories }
    }

    /// Categories in name order.
    pub fn categories(&self) -> impl Iterator<Item = (&str, &TaxonomyCategory)> {
        self.categories
            .iter()
            .map(|(name, category)| (name.as_str(), category))
    }

    pub fn get(&self, name: &str) -> Option<&TaxonomyCategory> {
        self.categories.get(name)
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

/// What to do when two categories claim the same raw code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// The first category in name order keeps the code.
    #[default]
    FirstWins,
    /// Any collision fails the taxonomy load.
    Reject,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawCode {
    Text(String),
    Integer(i64),
    /// Unquoted decimal codes lose their trailing zeros, so they are rejected.
    Decimal(f64),
}

fn deserialize_codes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Vec<RawCode> = Vec::deserialize(deserializer)?;
    let mut codes = Vec::with_capacity(raw.len());
    for code in raw {
        let code = match code {
            RawCode::Text(text) => text.trim().to_string(),
            RawCode::Integer(value) => value.to_string(),
            RawCode::Decimal(value) => {
                return Err(D::Error::custom(format!(
                    "diagnosis code {value} is an unquoted decimal number; quote decimal codes (e.g. '428.0')"
                )));
            }
        };
        if !code.is_empty() {
            codes.push(code);
        }
    }
    Ok(codes)
}
