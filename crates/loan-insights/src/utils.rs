//! Shared utilities for reading loan columns.
//!
//! Row-wise analyses pull a column out as `Vec<Option<f64>>` or
//! `Vec<Option<String>>` with every missing marker (null, NaN, textual NA)
//! already mapped to `None`. Grouped counts go back through polars.

use crate::error::{InsightsError, Result};
use crate::types::ValueCount;
use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Category of a polars data type for profiling purposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date, datetime, time or duration
    Temporal,
    /// Boolean type
    Boolean,
    /// String or categorical text
    Text,
    /// Nested or otherwise unsupported types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a temporal type.
#[inline]
pub fn is_temporal_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time | DataType::Duration(_)
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_temporal_dtype(dtype) {
        DtypeCategory::Temporal
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::Text
    } else {
        DtypeCategory::Other
    }
}

// =============================================================================
// Missing Markers
// =============================================================================

/// Text values treated as missing, compared case-insensitively after trimming.
pub const MISSING_MARKERS: [&str; 8] = ["", "na", "n/a", "nan", "null", "none", "#n/a", "<na>"];

/// Check if a string is a missing-value marker.
///
/// # Example
///
/// ```rust,ignore
/// use loan_insights::utils::is_missing_marker;
///
/// assert!(is_missing_marker("N/A"));
/// assert!(is_missing_marker("  "));
/// assert!(!is_missing_marker("RENT"));
/// ```
pub fn is_missing_marker(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    MISSING_MARKERS.iter().any(|&marker| lower == marker)
}

/// Try to parse a string as a real number.
///
/// Unlike spreadsheet-style parsing, formatting characters are not stripped:
/// `"$1,000"` is text, not a number.
pub fn parse_real(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Round to two decimal places, half away from zero.
#[inline]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// Column Extraction
// =============================================================================

/// Look up a column, mapping absence to [`InsightsError::ColumnNotFound`].
pub fn require_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Series> {
    df.column(name)
        .map(|c| c.as_materialized_series())
        .map_err(|_| InsightsError::ColumnNotFound(name.to_string()))
}

/// Check whether every named column is present.
pub fn has_columns(df: &DataFrame, names: &[&str]) -> bool {
    names.iter().all(|name| df.column(name).is_ok())
}

/// Read a series as optional floats.
///
/// Native numeric columns are cast; text columns are parsed value by value and
/// any non-missing text that is not a number is a [`InsightsError::MalformedValue`].
/// NaN becomes `None`.
pub fn numeric_values(series: &Series) -> Result<Vec<Option<f64>>> {
    match get_dtype_category(series.dtype()) {
        DtypeCategory::Numeric | DtypeCategory::Boolean => {
            let cast = series.cast(&DataType::Float64)?;
            Ok(cast
                .f64()?
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect())
        }
        DtypeCategory::Text => {
            let mut values = Vec::with_capacity(series.len());
            for value in text_values(series)? {
                match value {
                    None => values.push(None),
                    Some(text) => match parse_real(&text) {
                        Some(v) => values.push(Some(v)),
                        None => {
                            return Err(InsightsError::malformed(
                                series.name().as_str(),
                                format!("'{text}' is not a number"),
                            ));
                        }
                    },
                }
            }
            Ok(values)
        }
        DtypeCategory::Temporal | DtypeCategory::Other => Err(InsightsError::malformed(
            series.name().as_str(),
            format!("{} cannot be read as numbers", series.dtype()),
        )),
    }
}

/// Read a series as optional strings, with missing markers mapped to `None`.
pub fn text_values(series: &Series) -> Result<Vec<Option<String>>> {
    if matches!(get_dtype_category(series.dtype()), DtypeCategory::Other) {
        return Err(InsightsError::malformed(
            series.name().as_str(),
            format!("{} cannot be read as text", series.dtype()),
        ));
    }

    if series.dtype().is_float() {
        let floats = numeric_values(series)?;
        return Ok(floats
            .into_iter()
            .map(|v| v.map(|x| x.to_string()))
            .collect());
    }

    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.filter(|s| !is_missing_marker(s)).map(str::to_string))
        .collect())
}

/// Stringify every non-null value regardless of type.
///
/// Used by the text-only fallback, so it must not fail on nested types.
pub fn display_values(series: &Series) -> Vec<String> {
    let mut values = Vec::new();
    for i in 0..series.len() {
        match series.get(i) {
            Ok(AnyValue::Null) | Err(_) => {}
            Ok(AnyValue::String(s)) => values.push(s.to_string()),
            Ok(AnyValue::StringOwned(s)) => values.push(s.to_string()),
            Ok(other) => values.push(other.to_string()),
        }
    }
    values
}

/// Read a column by name as optional floats.
pub fn numeric_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    numeric_values(require_column(df, name)?)
}

/// Read a column by name as optional strings.
pub fn text_column(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>> {
    text_values(require_column(df, name)?)
}

// =============================================================================
// Grouped Counts
// =============================================================================

/// Occurrences of each present value, in order of first appearance.
pub fn count_values(values: Vec<Option<String>>) -> Result<Vec<ValueCount>> {
    let counted = df!("value" => values)?
        .lazy()
        .filter(col("value").is_not_null())
        .group_by_stable([col("value")])
        .agg([len().cast(DataType::UInt64).alias("count")])
        .collect()?;

    let labels = counted.column("value")?.str()?;
    let counts = counted.column("count")?.u64()?;
    Ok(labels
        .into_iter()
        .zip(counts)
        .filter_map(|(value, count)| {
            Some(ValueCount {
                value: value?.to_string(),
                count: count? as usize,
            })
        })
        .collect())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::Int64), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Temporal);
        assert_eq!(get_dtype_category(&DataType::Boolean), DtypeCategory::Boolean);
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::Text);
        assert_eq!(
            get_dtype_category(&DataType::List(Box::new(DataType::Int64))),
            DtypeCategory::Other
        );
    }

    #[test]
    fn test_is_missing_marker() {
        assert!(is_missing_marker(""));
        assert!(is_missing_marker("NA"));
        assert!(is_missing_marker("n/a"));
        assert!(is_missing_marker("  NaN "));
        assert!(is_missing_marker("None"));
        assert!(!is_missing_marker("RENT"));
        assert!(!is_missing_marker("0"));
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("42"), Some(42.0));
        assert_eq!(parse_real(" -3.5 "), Some(-3.5));
        assert_eq!(parse_real("$1,000"), None);
        assert_eq!(parse_real("inf"), None);
        assert_eq!(parse_real("MORTGAGE"), None);
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.004), 10.0);
        assert_eq!(round2(2.345_678), 2.35);
        assert_eq!(round2(-1.005_1), -1.01);
    }

    #[test]
    fn test_numeric_values_maps_nan_to_none() {
        let series = Series::new("rate".into(), &[Some(5.0f64), Some(f64::NAN), None]);
        let values = numeric_values(&series).unwrap();
        assert_eq!(values, vec![Some(5.0), None, None]);
    }

    #[test]
    fn test_numeric_values_parses_text() {
        let series = Series::new("term".into(), &[Some("36"), Some(" 60 "), Some("NA"), None]);
        let values = numeric_values(&series).unwrap();
        assert_eq!(values, vec![Some(36.0), Some(60.0), None, None]);
    }

    #[test]
    fn test_numeric_values_rejects_text() {
        let series = Series::new("grade".into(), &["A", "B"]);
        let err = numeric_values(&series).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_VALUE");
    }

    #[test]
    fn test_text_values_drops_markers() {
        let series = Series::new("state".into(), &[Some("CA"), Some("n/a"), None, Some("NY")]);
        let values = text_values(&series).unwrap();
        assert_eq!(
            values,
            vec![Some("CA".to_string()), None, None, Some("NY".to_string())]
        );
    }

    #[test]
    fn test_require_column_missing() {
        let df = df!("grade" => ["A"]).unwrap();
        assert!(require_column(&df, "grade").is_ok());
        assert!(matches!(
            require_column(&df, "loan_status"),
            Err(InsightsError::ColumnNotFound(name)) if name == "loan_status"
        ));
    }

    #[test]
    fn test_count_values_first_seen_order() {
        let values = vec![
            Some("B".to_string()),
            None,
            Some("A".to_string()),
            Some("B".to_string()),
        ];
        let counts = count_values(values).unwrap();
        assert_eq!(
            counts,
            vec![
                ValueCount { value: "B".to_string(), count: 2 },
                ValueCount { value: "A".to_string(), count: 1 },
            ]
        );
        assert!(count_values(vec![None, None]).unwrap().is_empty());
    }
}
