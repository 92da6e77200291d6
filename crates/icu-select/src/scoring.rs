//! Univariate association scores between a feature and a class label.

use std::collections::HashMap;

use crate::stats::chi2_survival;

/// Class labels of the outcome, encoded as dense indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLabels {
    labels: Vec<usize>,
    counts: Vec<usize>,
}

impl ClassLabels {
    /// `labels[i]` is the class index of row `i`; indices are below `classes`.
    pub fn new(labels: Vec<usize>, classes: usize) -> Self {
        let mut counts = vec![0; classes];
        for &label in &labels {
            if let Some(count) = counts.get_mut(label) {
                *count += 1;
            }
        }
        Self { labels, counts }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn classes(&self) -> usize {
        self.counts.len()
    }

    pub fn counts(&self) -> &[usize] {
        &self.counts
    }
}

/// Chi-squared statistic and upper-tail p-value of a non-negative feature.
///
/// The observed value for class `c` is the sum of the feature over rows of
/// `c`; the expected value is that total spread by class frequency.
pub fn chi2(feature: &[f64], classes: &ClassLabels) -> (f64, f64) {
    let n = classes.len() as f64;
    let mut observed = vec![0.0; classes.classes()];
    for (value, &label) in feature.iter().zip(&classes.labels) {
        observed[label] += value;
    }
    let total: f64 = observed.iter().sum();
    let statistic: f64 = observed
        .iter()
        .zip(classes.counts())
        .map(|(observed, &count)| {
            let expected = total * count as f64 / n;
            (observed - expected).powi(2) / expected
        })
        .sum();
    let p_value = chi2_survival(statistic, classes.classes().saturating_sub(1));
    (statistic, p_value)
}

/// Plug-in mutual information (nats) between discrete feature values and classes.
pub fn mutual_information(feature: &[f64], classes: &ClassLabels) -> f64 {
    let n = classes.len() as f64;
    let mut joint: HashMap<(u64, usize), usize> = HashMap::new();
    let mut marginal: HashMap<u64, usize> = HashMap::new();
    for (value, &label) in feature.iter().zip(&classes.labels) {
        // 0.0 and -0.0 are the same level
        let key = if *value == 0.0 { 0 } else { value.to_bits() };
        *joint.entry((key, label)).or_default() += 1;
        *marginal.entry(key).or_default() += 1;
    }
    joint
        .iter()
        .map(|(&(key, label), &count)| {
            let p_joint = count as f64 / n;
            let p_value = marginal[&key] as f64 / n;
            let p_class = classes.counts()[label] as f64 / n;
            p_joint * (p_joint / (p_value * p_class)).ln()
        })
        .sum::<f64>()
        .max(0.0)
}
