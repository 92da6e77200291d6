//! Diagnosis code to taxonomy category resolution.

use std::collections::{BTreeSet, HashMap};

use polars::prelude::DataFrame;
use tracing::{debug, info, warn};

use icu_common::string_values;
use icu_model::{CollisionPolicy, Taxonomy};

use crate::error::{Result, TransformError};

/// Category a raw code resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryAssignment {
    pub category: String,
    pub use_in_benchmark: bool,
}

/// A code listed under more than one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeCollision {
    pub code: String,
    /// Category that keeps the code.
    pub kept: String,
    /// Category whose claim was ignored.
    pub ignored: String,
}

/// Flat lookup from raw diagnosis code to category.
#[derive(Debug, Clone, Default)]
pub struct CodeLookup {
    codes: HashMap<String, CategoryAssignment>,
    collisions: Vec<CodeCollision>,
}

impl CodeLookup {
    /// Flattens the taxonomy, visiting categories in name order.
    ///
    /// Under [`CollisionPolicy::FirstWins`] the first category listing a code
    /// keeps it and later claims are recorded as collisions. Under
    /// [`CollisionPolicy::Reject`] the first collision is an error.
    pub fn build(taxonomy: &Taxonomy, policy: CollisionPolicy) -> Result<Self> {
        let mut lookup = Self::default();
        for (name, category) in taxonomy.categories() {
            for code in &category.codes {
                match lookup.codes.get(code) {
                    Some(existing) if existing.category == name => {}
                    Some(existing) => {
                        if policy == CollisionPolicy::Reject {
                            return Err(TransformError::CodeCollision {
                                code: code.clone(),
                                first: existing.category.clone(),
                                second: name.to_string(),
                            });
                        }
                        lookup.collisions.push(CodeCollision {
                            code: code.clone(),
                            kept: existing.category.clone(),
                            ignored: name.to_string(),
                        });
                    }
                    None => {
                        lookup.codes.insert(
                            code.clone(),
                            CategoryAssignment {
                                category: name.to_string(),
                                use_in_benchmark: category.use_in_benchmark,
                            },
                        );
                    }
                }
            }
        }
        if !lookup.collisions.is_empty() {
            warn!(
                collisions = lookup.collisions.len(),
                "taxonomy codes claimed by more than one category; first category in name order kept"
            );
            for collision in &lookup.collisions {
                debug!(
                    code = %collision.code,
                    kept = %collision.kept,
                    ignored = %collision.ignored,
                    "taxonomy code collision"
                );
            }
        }
        info!(codes = lookup.codes.len(), "diagnosis code lookup built");
        Ok(lookup)
    }

    /// Looks up a raw code. Surrounding whitespace is ignored.
    pub fn resolve(&self, code: &str) -> Option<&CategoryAssignment> {
        self.codes.get(code.trim())
    }

    pub fn collisions(&self) -> &[CodeCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Benchmark-eligible category names that own at least one code, sorted.
pub fn benchmark_categories(lookup: &CodeLookup) -> Vec<String> {
    lookup
        .codes
        .values()
        .filter(|assignment| assignment.use_in_benchmark)
        .map(|assignment| assignment.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// One diagnosis row of the encounter table after lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDiagnosis {
    pub encounter_id: String,
    pub category: Option<String>,
    pub use_in_benchmark: bool,
}

/// Resolves the diagnosis code of every row.
///
/// Codes that are missing or absent from the taxonomy resolve to no category.
/// Rows without an encounter identifier are skipped.
pub fn resolve_diagnoses(
    df: &DataFrame,
    encounter_id: &str,
    diagnosis_code: &str,
    lookup: &CodeLookup,
) -> Result<Vec<ResolvedDiagnosis>> {
    let missing = |column: &str| TransformError::MissingColumn {
        column: column.to_string(),
    };
    let ids = string_values(df, encounter_id).map_err(|_| missing(encounter_id))?;
    let codes = string_values(df, diagnosis_code).map_err(|_| missing(diagnosis_code))?;

    let mut unmatched = 0usize;
    let resolved: Vec<ResolvedDiagnosis> = ids
        .into_iter()
        .zip(codes)
        .filter_map(|(id, code)| {
            let id = id?;
            let assignment = code.as_deref().and_then(|code| lookup.resolve(code));
            if assignment.is_none() {
                unmatched += 1;
            }
            Some(ResolvedDiagnosis {
                encounter_id: id,
                category: assignment.map(|assignment| assignment.category.clone()),
                use_in_benchmark: assignment.is_some_and(|assignment| assignment.use_in_benchmark),
            })
        })
        .collect();
    info!(rows = resolved.len(), unmatched, "diagnosis codes resolved");
    Ok(resolved)
}
