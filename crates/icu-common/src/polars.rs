//! Polars AnyValue and column utility functions.
//!
//! This module provides helper functions for working with Polars `AnyValue` types
//! and for extracting whole columns as missing-aware Rust vectors.

use polars::prelude::*;

/// Converts a Polars `AnyValue` to a `String` representation.
///
/// Returns an empty string for `Null`, properly formats numeric types without
/// unnecessary trailing zeros.
///
/// # Examples
///
/// ```
/// use polars::prelude::AnyValue;
/// use icu_common::any_to_string;
///
/// assert_eq!(any_to_string(AnyValue::Null), "");
/// assert_eq!(any_to_string(AnyValue::Int32(42)), "42");
/// assert_eq!(any_to_string(AnyValue::String("M")), "M");
/// ```
pub fn any_to_string(value: AnyValue<'_>) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::Int8(v) => v.to_string(),
        AnyValue::Int16(v) => v.to_string(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::Int64(v) => v.to_string(),
        AnyValue::UInt8(v) => v.to_string(),
        AnyValue::UInt16(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::UInt64(v) => v.to_string(),
        AnyValue::Float32(v) => format_numeric(f64::from(v)),
        AnyValue::Float64(v) => format_numeric(v),
        AnyValue::String(s) => s.to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Boolean(b) => if b { "true" } else { "false" }.to_string(),
        other => other.to_string(),
    }
}

/// Formats a floating-point number as a string without trailing zeros.
///
/// # Examples
///
/// ```
/// use icu_common::format_numeric;
///
/// assert_eq!(format_numeric(1.0), "1");
/// assert_eq!(format_numeric(1.5), "1.5");
/// assert_eq!(format_numeric(0.0), "0");
/// ```
pub fn format_numeric(v: f64) -> String {
    let s = format!("{v}");
    if !s.contains('.') {
        return s;
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Parses a string as `f64`, returning `None` for invalid or empty strings.
pub fn parse_f64(value: &str) -> Option<f64> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok()
}

/// Extracts a column as trimmed strings; null and blank cells become `None`.
///
/// Non-string columns are rendered with [`any_to_string`].
pub fn string_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let series = df.column(name)?.as_materialized_series();
    let normalize = |raw: &str| {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    };
    if series.dtype() == &DataType::String {
        return Ok(series
            .str()?
            .into_iter()
            .map(|value| value.and_then(normalize))
            .collect());
    }
    let mut values = Vec::with_capacity(series.len());
    for idx in 0..series.len() {
        let value = series.get(idx)?;
        values.push(normalize(&any_to_string(value)));
    }
    Ok(values)
}

/// Extracts a column as `f64` values; nulls and unparseable text become `None`.
pub fn f64_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let series = df.column(name)?.as_materialized_series();
    if series.dtype() == &DataType::String {
        return Ok(series
            .str()?
            .into_iter()
            .map(|value| value.and_then(parse_f64))
            .collect());
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> DataFrame {
        DataFrame::new(vec![
            Series::new("text".into(), [Some(" M "), None, Some("  ")]).into(),
            Series::new("num".into(), [Some(1i32), None, Some(3)]).into(),
            Series::new("raw".into(), [Some("2.5"), Some("x"), None]).into(),
        ])
        .expect("frame")
    }

    #[test]
    fn test_any_to_string_null() {
        assert_eq!(any_to_string(AnyValue::Null), "");
    }

    #[test]
    fn test_any_to_string_floats() {
        assert_eq!(any_to_string(AnyValue::Float64(1.5)), "1.5");
        assert_eq!(any_to_string(AnyValue::Float64(1.0)), "1");
    }

    #[test]
    fn test_any_to_string_boolean() {
        assert_eq!(any_to_string(AnyValue::Boolean(true)), "true");
        assert_eq!(any_to_string(AnyValue::Boolean(false)), "false");
    }

    #[test]
    fn test_format_numeric() {
        assert_eq!(format_numeric(10.0), "10");
        assert_eq!(format_numeric(100.0), "100");
        assert_eq!(format_numeric(1.50), "1.5");
        assert_eq!(format_numeric(0.25), "0.25");
    }

    #[test]
    fn test_parse_f64() {
        assert_eq!(parse_f64(""), None);
        assert_eq!(parse_f64("  3.5  "), Some(3.5));
        assert_eq!(parse_f64("invalid"), None);
    }

    #[test]
    fn test_string_values_trims_and_nulls_blanks() {
        let df = frame();
        let values = string_values(&df, "text").expect("text");
        assert_eq!(values, vec![Some("M".to_string()), None, None]);
    }

    #[test]
    fn test_string_values_renders_numbers() {
        let df = frame();
        let values = string_values(&df, "num").expect("num");
        assert_eq!(values, vec![Some("1".to_string()), None, Some("3".to_string())]);
    }

    #[test]
    fn test_f64_values() {
        let df = frame();
        assert_eq!(
            f64_values(&df, "num").expect("num"),
            vec![Some(1.0), None, Some(3.0)]
        );
        assert_eq!(
            f64_values(&df, "raw").expect("raw"),
            vec![Some(2.5), None, None]
        );
    }

    #[test]
    fn test_missing_column_is_error() {
        let df = frame();
        assert!(string_values(&df, "absent").is_err());
    }
}
