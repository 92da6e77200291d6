//! Quartile binning of continuous columns.
//!
//! Boundaries are fitted once per column over every observed value and then
//! applied to each row. A value on a boundary belongs to the lower bin:
//!
//! | bin  | range            |
//! |------|------------------|
//! | `Q0` | `v <= q1`        |
//! | `Q1` | `q1 < v <= q2`   |
//! | `Q2` | `q2 < v <= q3`   |
//! | `Q3` | `v > q3`         |
//!
//! Missing values stay missing.

use polars::prelude::*;
use tracing::{debug, info, warn};

use crate::error::{Result, TransformError};

/// Labels of the four quartile bins, lowest first.
pub const BIN_LABELS: [&str; 4] = ["Q0", "Q1", "Q2", "Q3"];

/// Fitted quartile boundaries of one column.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuartileBoundaries {
    pub q1: f64,
    pub q2: f64,
    pub q3: f64,
}

impl QuartileBoundaries {
    /// Fits boundaries over the finite values of `values`.
    ///
    /// Quantiles use linear interpolation between the closest ranks at
    /// position `(n - 1) * p`. Returns `None` when no finite value exists.
    pub fn fit(values: &[f64]) -> Option<Self> {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(f64::total_cmp);
        Some(Self {
            q1: quantile(&sorted, 0.25),
            q2: quantile(&sorted, 0.5),
            q3: quantile(&sorted, 0.75),
        })
    }

    /// Zero-based bin index of `value`.
    pub fn bin(&self, value: f64) -> usize {
        if value <= self.q1 {
            0
        } else if value <= self.q2 {
            1
        } else if value <= self.q3 {
            2
        } else {
            3
        }
    }

    pub fn label(&self, value: f64) -> &'static str {
        BIN_LABELS[self.bin(value)]
    }
}

fn quantile(sorted: &[f64], p: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * p;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}

fn observed_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(column)
        .map_err(|_| TransformError::MissingColumn {
            column: column.to_string(),
        })?
        .as_materialized_series();
    let dtype = series.dtype();
    if matches!(dtype, DataType::String) {
        return Err(TransformError::AlreadyBinned {
            column: column.to_string(),
        });
    }
    if !(dtype.is_float() || dtype.is_integer()) {
        return Err(TransformError::NotContinuous {
            column: column.to_string(),
        });
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast
        .f64()?
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect())
}

/// Bins one numeric column, returning the label series and fitted boundaries.
pub fn quantize_column(df: &DataFrame, column: &str) -> Result<(Series, QuartileBoundaries)> {
    let values = observed_values(df, column)?;
    let observed: Vec<f64> = values.iter().flatten().copied().collect();
    let boundaries =
        QuartileBoundaries::fit(&observed).ok_or_else(|| TransformError::NoObservedValues {
            column: column.to_string(),
        })?;

    let (min, max) = observed
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(min, max), v| {
            (min.min(*v), max.max(*v))
        });
    info!(
        column,
        count = observed.len(),
        missing = values.len() - observed.len(),
        min,
        q1 = boundaries.q1,
        median = boundaries.q2,
        q3 = boundaries.q3,
        max,
        "quartile boundaries fitted"
    );

    let labels: Vec<Option<&str>> = values
        .iter()
        .map(|value| value.map(|v| boundaries.label(v)))
        .collect();
    Ok((Series::new(column.into(), labels), boundaries))
}

/// Replaces each listed column with its quartile labels.
///
/// All boundaries are fitted before any column is replaced. A column with no
/// observed values has nothing to fit: it becomes an all-missing label column,
/// gets no boundaries entry and is logged.
pub fn quantize_columns(
    df: &DataFrame,
    columns: &[String],
) -> Result<(DataFrame, Vec<(String, QuartileBoundaries)>)> {
    let mut binned = Vec::with_capacity(columns.len());
    let mut boundaries = Vec::with_capacity(columns.len());
    for column in columns {
        match quantize_column(df, column) {
            Ok((series, fitted)) => {
                binned.push(series);
                boundaries.push((column.clone(), fitted));
            }
            Err(TransformError::NoObservedValues { column }) => {
                warn!(column = %column, "no observed values; column left unbinned");
                binned.push(Series::full_null(
                    column.as_str().into(),
                    df.height(),
                    &DataType::String,
                ));
            }
            Err(error) => return Err(error),
        }
    }
    let mut quantized = df.clone();
    for series in binned {
        quantized.with_column(series)?;
    }
    debug!(columns = ?columns, "columns quantized");
    Ok((quantized, boundaries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_ranks() {
        let boundaries = QuartileBoundaries::fit(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(
            boundaries,
            QuartileBoundaries {
                q1: 1.75,
                q2: 2.5,
                q3: 3.25,
            }
        );
    }

    #[test]
    fn boundary_values_fall_in_lower_bin() {
        let boundaries = QuartileBoundaries::fit(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
        assert_eq!((boundaries.q1, boundaries.q2, boundaries.q3), (2.0, 3.0, 4.0));
        let bins: Vec<usize> = [1.0, 2.0, 2.5, 3.0, 4.0, 4.5]
            .iter()
            .map(|v| boundaries.bin(*v))
            .collect();
        assert_eq!(bins, vec![0, 0, 1, 1, 2, 3]);
    }

    #[test]
    fn empty_input_cannot_be_fitted() {
        assert!(QuartileBoundaries::fit(&[]).is_none());
        assert!(QuartileBoundaries::fit(&[f64::NAN]).is_none());
    }

    #[test]
    fn quantizes_with_missing_passthrough() {
        let df = DataFrame::new(vec![
            Series::new("age".into(), [Some(20.0), None, Some(40.0), Some(60.0), Some(80.0)])
                .into(),
        ])
        .unwrap();
        let (quantized, boundaries) = quantize_columns(&df, &["age".to_string()]).unwrap();
        assert_eq!(boundaries[0].1.q2, 50.0);
        let labels: Vec<Option<&str>> = quantized
            .column("age")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(
            labels,
            vec![Some("Q0"), None, Some("Q1"), Some("Q2"), Some("Q3")]
        );
    }

    #[test]
    fn unobserved_column_degrades_to_missing_labels() {
        let df = DataFrame::new(vec![
            Series::new("age".into(), [Some(20.0), Some(40.0), Some(60.0)]).into(),
            Series::new("icu_stay_duration".into(), [None::<f64>, None, None]).into(),
        ])
        .unwrap();
        let columns = ["age".to_string(), "icu_stay_duration".to_string()];
        let (quantized, boundaries) = quantize_columns(&df, &columns).unwrap();
        assert_eq!(boundaries.len(), 1);
        assert_eq!(boundaries[0].0, "age");
        let stay = quantized.column("icu_stay_duration").unwrap();
        assert_eq!(stay.dtype(), &DataType::String);
        assert_eq!(stay.null_count(), 3);
    }

    #[test]
    fn structural_errors() {
        let df = DataFrame::new(vec![
            Series::new("gender".into(), ["M"]).into(),
            Series::new("empty".into(), [None::<f64>]).into(),
        ])
        .unwrap();
        assert!(matches!(
            quantize_column(&df, "gender").unwrap_err(),
            TransformError::AlreadyBinned { .. }
        ));
        assert!(matches!(
            quantize_column(&df, "empty").unwrap_err(),
            TransformError::NoObservedValues { .. }
        ));
        assert!(matches!(
            quantize_column(&df, "absent").unwrap_err(),
            TransformError::MissingColumn { .. }
        ));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn boundaries_are_ordered(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)) {
                let b = QuartileBoundaries::fit(&values).unwrap();
                prop_assert!(b.q1 <= b.q2 && b.q2 <= b.q3);
            }

            #[test]
            fn fit_ignores_input_order(values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200)) {
                let mut reversed = values.clone();
                reversed.reverse();
                prop_assert_eq!(
                    QuartileBoundaries::fit(&values),
                    QuartileBoundaries::fit(&reversed)
                );
            }

            #[test]
            fn bins_are_monotone(
                values in prop::collection::vec(-1.0e6f64..1.0e6, 1..200),
                a in -1.0e6f64..1.0e6,
                b in -1.0e6f64..1.0e6,
            ) {
                let boundaries = QuartileBoundaries::fit(&values).unwrap();
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(boundaries.bin(low) <= boundaries.bin(high));
            }
        }
    }
}
