//! Feature selection policies and score reports.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Univariate statistic used to score a feature against the outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scorer {
    /// Chi-squared independence statistic with an upper-tail p-value.
    #[default]
    Chi2,
    /// Plug-in mutual information on discrete values (nats). No p-value.
    MutualInfo,
}

impl Scorer {
    pub fn has_p_values(self) -> bool {
        matches!(self, Self::Chi2)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Chi2 => "chi2",
            Self::MutualInfo => "mutual_info",
        }
    }
}

/// Decision rule applied to the ranked scores. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Keep the `k` highest-scoring features; `None` keeps all of them.
    TopK(Option<usize>),
    /// Keep features whose p-value is strictly below the threshold.
    PValueBelow(f64),
    /// Keep features whose score is at least the threshold.
    ScoreAtLeast(f64),
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self::PValueBelow(0.001)
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TopK(None) => write!(f, "top-k (all)"),
            Self::TopK(Some(k)) => write!(f, "top-k (k={k})"),
            Self::PValueBelow(threshold) => write!(f, "p-value < {threshold}"),
            Self::ScoreAtLeast(threshold) => write!(f, "score >= {threshold}"),
        }
    }
}

/// Handling of zero-variance features.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Fail the run on the first degenerate feature.
    #[default]
    Fail,
    /// Exclude degenerate features from scoring and list them in the report.
    Skip,
}

/// Score of a single feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureScore {
    pub feature: String,
    pub score: f64,
    /// Present for scorers with a reference distribution.
    pub p_value: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    ZeroVariance,
}

impl fmt::Display for DegenerateReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroVariance => write!(f, "zero variance"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegenerateFeature {
    pub feature: String,
    pub reason: DegenerateReason,
}

/// Ranked feature scores, ordered by descending score with ties broken by name.
///
/// Built once per selection run and not mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureScoreReport {
    pub scorer: Scorer,
    scores: Vec<FeatureScore>,
    degenerate: Vec<DegenerateFeature>,
}

impl FeatureScoreReport {
    /// Sorts the scores into report order.
    pub fn new(
        scorer: Scorer,
        mut scores: Vec<FeatureScore>,
        mut degenerate: Vec<DegenerateFeature>,
    ) -> Self {
        scores.sort_by(|left, right| {
            right
                .score
                .total_cmp(&left.score)
                .then_with(|| left.feature.cmp(&right.feature))
        });
        degenerate.sort_by(|left, right| left.feature.cmp(&right.feature));
        Self {
            scorer,
            scores,
            degenerate,
        }
    }

    pub fn scores(&self) -> &[FeatureScore] {
        &self.scores
    }

    pub fn degenerate(&self) -> &[DegenerateFeature] {
        &self.degenerate
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn feature_names(&self) -> Vec<&str> {
        self.scores
            .iter()
            .map(|score| score.feature.as_str())
            .collect()
    }

    /// Keeps the scores accepted by `keep`, preserving report order.
    pub fn retain<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(usize, &FeatureScore) -> bool,
    {
        let scores = self
            .scores
            .iter()
            .enumerate()
            .filter(|(rank, score)| keep(*rank, score))
            .map(|(_, score)| score.clone())
            .collect();
        Self {
            scorer: self.scorer,
            scores,
            degenerate: self.degenerate.clone(),
        }
    }
}
