//! Temporal features derived from encounter timestamps.
//!
//! Three Float64 columns are added to the encounter table:
//! - `age`: whole years from date of birth to ICU admission
//! - `icu_stay_duration`: whole hours from ICU admission to ICU discharge
//! - `hosp_stay_duration`: whole hours from hospital admission to discharge
//!
//! Missing, unparseable or inconsistent inputs produce a missing value, never
//! an error. Ages above the plausibility ceiling are missing as well.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use tracing::{debug, info, warn};

use icu_common::string_values;
use icu_model::{AGE, ColumnNames, HOSP_STAY_DURATION, ICU_STAY_DURATION};

use crate::error::{Result, TransformError};

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Offset-carrying forms beyond RFC 3339, e.g. `2150-03-01 10:15:00+00`.
const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Parses an encounter timestamp. Date-only values resolve to midnight.
///
/// Timestamps carrying a `Z` or numeric offset are converted to UTC.
///
/// # Examples
///
/// ```
/// use icu_transform::temporal::parse_timestamp;
///
/// assert!(parse_timestamp("2150-03-01 10:15:00").is_some());
/// assert!(parse_timestamp("2150-03-01").is_some());
/// assert!(parse_timestamp("not a date").is_none());
/// ```
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(parsed);
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(trimmed, format) {
            return Some(parsed.naive_utc());
        }
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

/// Completed years between `birth` and `at`, counted by anniversary.
///
/// A 29 February birthday is celebrated on 1 March in non-leap years.
/// Returns `None` when `at` precedes `birth`.
pub fn age_in_years(birth: NaiveDate, at: NaiveDate) -> Option<i64> {
    let mut years = i64::from(at.year()) - i64::from(birth.year());
    let anniversary = if birth.month() == 2 && birth.day() == 29 && !is_leap_year(at.year()) {
        (3, 1)
    } else {
        (birth.month(), birth.day())
    };
    if (at.month(), at.day()) < anniversary {
        years -= 1;
    }
    (years >= 0).then_some(years)
}

fn is_leap_year(year: i32) -> bool {
    NaiveDate::from_ymd_opt(year, 2, 29).is_some()
}

/// Whole elapsed hours from `start` to `end`, truncated.
///
/// Returns `None` when `end` precedes `start`.
pub fn whole_hours_between(start: NaiveDateTime, end: NaiveDateTime) -> Option<i64> {
    if end < start {
        return None;
    }
    Some((end - start).num_hours())
}

#[derive(Debug, Default)]
struct DegradedCounts {
    unparseable: usize,
    implausible_age: usize,
    inverted_interval: usize,
}

fn timestamp_column(
    df: &DataFrame,
    name: &str,
    counts: &mut DegradedCounts,
) -> Result<Vec<Option<NaiveDateTime>>> {
    let raw = string_values(df, name).map_err(|_| TransformError::MissingColumn {
        column: name.to_string(),
    })?;
    Ok(raw
        .into_iter()
        .map(|value| {
            let text = value?;
            let parsed = parse_timestamp(&text);
            if parsed.is_none() {
                counts.unparseable += 1;
            }
            parsed
        })
        .collect())
}

fn interval_hours(
    starts: &[Option<NaiveDateTime>],
    ends: &[Option<NaiveDateTime>],
    counts: &mut DegradedCounts,
) -> Vec<Option<f64>> {
    starts
        .iter()
        .zip(ends)
        .map(|(start, end)| match (start, end) {
            (Some(start), Some(end)) => {
                let hours = whole_hours_between(*start, *end);
                if hours.is_none() {
                    counts.inverted_interval += 1;
                }
                hours.map(|hours| hours as f64)
            }
            _ => None,
        })
        .collect()
}

/// Adds `age`, `icu_stay_duration` and `hosp_stay_duration` to the table.
///
/// Age is measured at ICU admission. Ages strictly above `max_plausible_age`
/// are treated as missing.
pub fn derive_temporal_features(
    df: &DataFrame,
    columns: &ColumnNames,
    max_plausible_age: i64,
) -> Result<DataFrame> {
    let mut counts = DegradedCounts::default();
    let birth = timestamp_column(df, &columns.date_of_birth, &mut counts)?;
    let admit = timestamp_column(df, &columns.admit_time, &mut counts)?;
    let discharge = timestamp_column(df, &columns.discharge_time, &mut counts)?;
    let icu_in = timestamp_column(df, &columns.icu_in_time, &mut counts)?;
    let icu_out = timestamp_column(df, &columns.icu_out_time, &mut counts)?;

    let ages: Vec<Option<f64>> = birth
        .iter()
        .zip(&icu_in)
        .map(|(birth, icu_in)| {
            let age = age_in_years((*birth)?.date(), (*icu_in)?.date());
            match age {
                Some(age) if age > max_plausible_age => {
                    counts.implausible_age += 1;
                    None
                }
                Some(age) => Some(age as f64),
                None => {
                    counts.implausible_age += 1;
                    None
                }
            }
        })
        .collect();
    let icu_hours = interval_hours(&icu_in, &icu_out, &mut counts);
    let hosp_hours = interval_hours(&admit, &discharge, &mut counts);

    let mut derived = df.clone();
    derived.with_column(Series::new(AGE.into(), ages))?;
    derived.with_column(Series::new(ICU_STAY_DURATION.into(), icu_hours))?;
    derived.with_column(Series::new(HOSP_STAY_DURATION.into(), hosp_hours))?;

    if counts.unparseable > 0 || counts.implausible_age > 0 || counts.inverted_interval > 0 {
        warn!(
            unparseable_timestamps = counts.unparseable,
            implausible_ages = counts.implausible_age,
            inverted_intervals = counts.inverted_interval,
            "temporal values degraded to missing"
        );
    }
    debug!(max_plausible_age, "temporal features derived");
    info!(rows = derived.height(), "temporal features added");
    Ok(derived)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn at(text: &str) -> NaiveDateTime {
        parse_timestamp(text).unwrap()
    }

    #[test]
    fn parses_supported_formats() {
        let expected = date(2150, 3, 1).and_hms_opt(10, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2150-03-01 10:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2150-03-01T10:15:00"), Some(expected));
        assert_eq!(parse_timestamp("2150-03-01 10:15"), Some(expected));
        assert_eq!(parse_timestamp(" 2150-03-01 10:15:00.000 "), Some(expected));
        assert_eq!(
            parse_timestamp("2150-03-01"),
            Some(date(2150, 3, 1).and_time(NaiveTime::MIN))
        );
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("2150-13-01"), None);
    }

    #[test]
    fn offset_timestamps_convert_to_utc() {
        let expected = date(2150, 3, 1).and_hms_opt(10, 15, 0).unwrap();
        assert_eq!(parse_timestamp("2150-03-01T10:15:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2150-03-01T10:15:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2150-03-01 10:15:00+00"), Some(expected));
        let shifted = date(2150, 3, 1).and_hms_milli_opt(10, 15, 0, 500).unwrap();
        assert_eq!(parse_timestamp("2150-03-01T12:15:00.5+02:00"), Some(shifted));
    }

    #[test]
    fn age_counts_completed_years() {
        assert_eq!(age_in_years(date(2100, 6, 15), date(2145, 6, 15)), Some(45));
        assert_eq!(age_in_years(date(2100, 6, 15), date(2145, 6, 14)), Some(44));
        assert_eq!(age_in_years(date(2100, 6, 15), date(2100, 6, 15)), Some(0));
        assert_eq!(age_in_years(date(2100, 6, 15), date(2099, 1, 1)), None);
    }

    #[test]
    fn leap_day_birthday_rolls_to_march() {
        let birth = date(2000, 2, 29);
        assert_eq!(age_in_years(birth, date(2001, 2, 28)), Some(0));
        assert_eq!(age_in_years(birth, date(2001, 3, 1)), Some(1));
        assert_eq!(age_in_years(birth, date(2004, 2, 29)), Some(4));
    }

    #[test]
    fn hours_are_truncated() {
        assert_eq!(
            whole_hours_between(at("2150-03-01 10:00:00"), at("2150-03-02 11:59:59")),
            Some(25)
        );
        assert_eq!(
            whole_hours_between(at("2150-03-01 10:00:00"), at("2150-03-01 10:00:00")),
            Some(0)
        );
        assert_eq!(
            whole_hours_between(at("2150-03-02 10:00:00"), at("2150-03-01 10:00:00")),
            None
        );
    }

    fn encounters(
        dob: &[Option<&str>],
        intime: &[Option<&str>],
        outtime: &[Option<&str>],
    ) -> DataFrame {
        let n = dob.len();
        DataFrame::new(vec![
            Series::new("icustay_id".into(), (0..n).map(|i| i.to_string()).collect::<Vec<_>>())
                .into(),
            Series::new("dob".into(), dob.to_vec()).into(),
            Series::new("admittime".into(), intime.to_vec()).into(),
            Series::new("dischtime".into(), outtime.to_vec()).into(),
            Series::new("intime".into(), intime.to_vec()).into(),
            Series::new("outtime".into(), outtime.to_vec()).into(),
        ])
        .unwrap()
    }

    fn floats(df: &DataFrame, name: &str) -> Vec<Option<f64>> {
        df.column(name)
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn derives_ages_with_missing_and_implausible() {
        let df = encounters(
            &[Some("2100-01-01"), None, Some("1950-01-01")],
            &[
                Some("2145-06-01 12:00:00"),
                Some("2145-06-01 12:00:00"),
                Some("2100-06-01 12:00:00"),
            ],
            &[
                Some("2145-06-02 12:30:00"),
                Some("2145-06-01 11:00:00"),
                None,
            ],
        );
        let derived = derive_temporal_features(&df, &ColumnNames::default(), 110).unwrap();
        assert_eq!(floats(&derived, AGE), vec![Some(45.0), None, None]);
        assert_eq!(
            floats(&derived, ICU_STAY_DURATION),
            vec![Some(24.0), None, None]
        );
        assert_eq!(
            floats(&derived, HOSP_STAY_DURATION),
            floats(&derived, ICU_STAY_DURATION)
        );
        assert_eq!(derived.width(), df.width() + 3);
    }

    #[test]
    fn missing_timestamp_column_is_structural() {
        let df = DataFrame::new(vec![Series::new("dob".into(), ["2100-01-01"]).into()]).unwrap();
        let error = derive_temporal_features(&df, &ColumnNames::default(), 110).unwrap_err();
        assert!(matches!(error, TransformError::MissingColumn { .. }));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn timestamp() -> impl Strategy<Value = NaiveDateTime> {
            (0i64..4_000_000_000).prop_map(|seconds| {
                date(2100, 1, 1).and_time(NaiveTime::MIN) + chrono::Duration::seconds(seconds)
            })
        }

        proptest! {
            #[test]
            fn stay_duration_is_never_negative(start in timestamp(), end in timestamp()) {
                match whole_hours_between(start, end) {
                    Some(hours) => prop_assert!(hours >= 0 && end >= start),
                    None => prop_assert!(end < start),
                }
            }

            #[test]
            fn age_is_non_negative(birth in timestamp(), at in timestamp()) {
                if let Some(age) = age_in_years(birth.date(), at.date()) {
                    prop_assert!(age >= 0);
                    prop_assert!(birth.date() <= at.date());
                }
            }
        }
    }
}
