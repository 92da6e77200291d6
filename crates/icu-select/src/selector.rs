//! Feature scoring against the outcome and policy-based selection.

use std::collections::BTreeMap;

use polars::prelude::*;
use tracing::{debug, info, warn};

use icu_common::{f64_values, format_numeric, parse_f64, string_values};
use icu_model::{
    DegenerateFeature, DegeneratePolicy, DegenerateReason, FeatureScore, FeatureScoreReport,
    Scorer, SelectionPolicy, validate_policy,
};

use crate::error::{Result, SelectionError};
use crate::scoring::{ClassLabels, chi2, mutual_information};

/// Outcome of a selection run.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Every scored feature, in report order.
    pub scores: FeatureScoreReport,
    /// Features kept by the policy, in report order.
    pub selected: FeatureScoreReport,
    /// Outcome column followed by the selected features.
    pub table: DataFrame,
}

/// Reads the outcome column into dense class indices.
///
/// Numeric labels are compared by value, so `1` and `1.0` are one class.
fn outcome_classes(df: &DataFrame, outcome: &str) -> Result<(ClassLabels, Vec<String>)> {
    let raw = string_values(df, outcome).map_err(|_| SelectionError::MissingColumn {
        column: outcome.to_string(),
    })?;
    let missing = raw.iter().filter(|value| value.is_none()).count();
    if missing > 0 {
        return Err(SelectionError::MissingOutcome { rows: missing });
    }
    let normalized: Vec<String> = raw
        .into_iter()
        .flatten()
        .map(|value| parse_f64(&value).map_or(value, format_numeric))
        .collect();

    let mut index: BTreeMap<&str, usize> = BTreeMap::new();
    for value in &normalized {
        index.entry(value.as_str()).or_insert(0);
    }
    for (position, slot) in index.values_mut().enumerate() {
        *slot = position;
    }
    if index.len() < 2 {
        return Err(SelectionError::SingleClassOutcome {
            classes: index.len(),
        });
    }
    let labels = normalized.iter().map(|value| index[value.as_str()]).collect();
    let names = index.keys().map(ToString::to_string).collect();
    Ok((ClassLabels::new(labels, index.len()), names))
}

fn feature_values(df: &DataFrame, feature: &str, scorer: Scorer) -> Result<Vec<f64>> {
    let column = df.column(feature).map_err(|_| SelectionError::MissingColumn {
        column: feature.to_string(),
    })?;
    let dtype = column.dtype();
    if !(dtype.is_float() || dtype.is_integer() || matches!(dtype, DataType::Boolean)) {
        return Err(SelectionError::NotNumeric {
            feature: feature.to_string(),
        });
    }
    let values = f64_values(df, feature)?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect::<Option<Vec<f64>>>()
        .ok_or_else(|| SelectionError::NonFinite {
            feature: feature.to_string(),
        })?;
    if scorer == Scorer::Chi2 && values.iter().any(|v| *v < 0.0) {
        return Err(SelectionError::NegativeValue {
            feature: feature.to_string(),
        });
    }
    Ok(values)
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|pair| pair[0] == pair[1])
}

/// Scores every column except `outcome` and `exclude` against the outcome.
///
/// Zero-variance features fail the run under [`DegeneratePolicy::Fail`] and
/// are listed in the report's degenerate section under
/// [`DegeneratePolicy::Skip`].
pub fn score_features(
    df: &DataFrame,
    outcome: &str,
    exclude: &[String],
    scorer: Scorer,
    on_degenerate: DegeneratePolicy,
) -> Result<FeatureScoreReport> {
    let (classes, class_names) = outcome_classes(df, outcome)?;
    debug!(classes = ?class_names, counts = ?classes.counts(), "outcome classes");

    let candidates: Vec<String> = df
        .get_column_names()
        .into_iter()
        .map(ToString::to_string)
        .filter(|name| name != outcome && !exclude.contains(name))
        .collect();
    if candidates.is_empty() {
        return Err(SelectionError::NoFeatures);
    }

    let mut scores = Vec::with_capacity(candidates.len());
    let mut degenerate = Vec::new();
    for feature in candidates {
        let values = feature_values(df, &feature, scorer)?;
        if is_constant(&values) {
            match on_degenerate {
                DegeneratePolicy::Fail => return Err(SelectionError::ZeroVariance { feature }),
                DegeneratePolicy::Skip => {
                    warn!(feature = %feature, "zero-variance feature skipped");
                    degenerate.push(DegenerateFeature {
                        feature,
                        reason: DegenerateReason::ZeroVariance,
                    });
                    continue;
                }
            }
        }
        let score = match scorer {
            Scorer::Chi2 => {
                let (statistic, p_value) = chi2(&values, &classes);
                FeatureScore {
                    feature,
                    score: statistic,
                    p_value: Some(p_value),
                }
            }
            Scorer::MutualInfo => FeatureScore {
                score: mutual_information(&values, &classes),
                feature,
                p_value: None,
            },
        };
        debug!(
            feature = %score.feature,
            score = score.score,
            p_value = ?score.p_value,
            "feature scored"
        );
        scores.push(score);
    }

    let report = FeatureScoreReport::new(scorer, scores, degenerate);
    info!(
        scorer = scorer.as_str(),
        scored = report.len(),
        degenerate = report.degenerate().len(),
        "features scored"
    );
    Ok(report)
}

/// Applies `policy` to a score report.
pub fn apply_policy(report: &FeatureScoreReport, policy: SelectionPolicy) -> FeatureScoreReport {
    match policy {
        SelectionPolicy::TopK(None) => report.clone(),
        SelectionPolicy::TopK(Some(k)) => report.retain(|rank, _| rank < k),
        SelectionPolicy::PValueBelow(threshold) => {
            report.retain(|_, score| score.p_value.is_some_and(|p| p < threshold))
        }
        SelectionPolicy::ScoreAtLeast(threshold) => {
            report.retain(|_, score| score.score >= threshold)
        }
    }
}

/// Scores the candidate features and keeps those accepted by `policy`.
///
/// The returned table holds the outcome column followed by the selected
/// features in report order.
pub fn select_features(
    df: &DataFrame,
    outcome: &str,
    exclude: &[String],
    scorer: Scorer,
    policy: SelectionPolicy,
    on_degenerate: DegeneratePolicy,
) -> Result<SelectionResult> {
    validate_policy(scorer, policy)?;
    let scores = score_features(df, outcome, exclude, scorer, on_degenerate)?;
    let selected = apply_policy(&scores, policy);

    let mut columns = Vec::with_capacity(selected.len() + 1);
    columns.push(outcome);
    columns.extend(selected.feature_names());
    let table = df.select(columns)?;

    info!(
        policy = %policy,
        candidates = scores.len(),
        selected = selected.len(),
        "features selected"
    );
    Ok(SelectionResult {
        scores,
        selected,
        table,
    })
}
