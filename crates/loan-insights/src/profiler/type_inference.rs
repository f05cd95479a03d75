//! Type inference for column summarization.

use crate::error::{InsightsError, Result};
use crate::types::ColumnKind;
use crate::utils::{DtypeCategory, get_dtype_category, numeric_values, parse_real, text_values};
use polars::prelude::*;
use std::collections::HashSet;

/// Column values read in the representation their kind is summarized with.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ColumnValues {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

/// Classify a column and read its values.
///
/// - native numeric dtypes are numeric
/// - text whose every non-missing value parses as a real number is numeric
/// - native booleans, and text with exactly two observed values, are boolean
/// - temporal dtypes are `other` and read as text
/// - nested dtypes cannot be classified and return `MalformedValue`
pub(crate) fn infer_column_kind(series: &Series) -> Result<(ColumnKind, ColumnValues)> {
    match get_dtype_category(series.dtype()) {
        DtypeCategory::Numeric => Ok((
            ColumnKind::Numeric,
            ColumnValues::Numeric(numeric_values(series)?),
        )),
        DtypeCategory::Boolean => Ok((
            ColumnKind::Boolean,
            ColumnValues::Text(text_values(series)?),
        )),
        DtypeCategory::Temporal => Ok((ColumnKind::Other, ColumnValues::Text(text_values(series)?))),
        DtypeCategory::Text => {
            let values = text_values(series)?;
            if let Some(parsed) = parse_all_numeric(&values) {
                return Ok((ColumnKind::Numeric, ColumnValues::Numeric(parsed)));
            }
            let kind = if observed_distinct(&values) == 2 {
                ColumnKind::Boolean
            } else {
                ColumnKind::Categorical
            };
            Ok((kind, ColumnValues::Text(values)))
        }
        DtypeCategory::Other => Err(InsightsError::malformed(
            series.name().as_str(),
            format!("unsupported dtype {}", series.dtype()),
        )),
    }
}

/// Parse every present value as a number, or give up on the first failure.
///
/// A column with no present values is not numeric by content.
fn parse_all_numeric(values: &[Option<String>]) -> Option<Vec<Option<f64>>> {
    if values.iter().all(Option::is_none) {
        return None;
    }
    values
        .iter()
        .map(|v| match v {
            None => Some(None),
            Some(text) => parse_real(text).map(Some),
        })
        .collect()
}

fn observed_distinct(values: &[Option<String>]) -> usize {
    values
        .iter()
        .flatten()
        .map(String::as_str)
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_native_numeric() {
        let series = Series::new("loan_amount".into(), &[Some(1000i64), None, Some(2500)]);
        let (kind, values) = infer_column_kind(&series).unwrap();
        assert_eq!(kind, ColumnKind::Numeric);
        assert_eq!(
            values,
            ColumnValues::Numeric(vec![Some(1000.0), None, Some(2500.0)])
        );
    }

    #[test]
    fn test_numeric_text() {
        let series = Series::new("term".into(), &["36", "60", "NA"]);
        let (kind, values) = infer_column_kind(&series).unwrap();
        assert_eq!(kind, ColumnKind::Numeric);
        assert_eq!(values, ColumnValues::Numeric(vec![Some(36.0), Some(60.0), None]));
    }

    #[test]
    fn test_categorical_text() {
        let series = Series::new("grade".into(), &["A", "B", "A", "C"]);
        let (kind, _) = infer_column_kind(&series).unwrap();
        assert_eq!(kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_two_valued_text_is_boolean() {
        let series = Series::new(
            "verified_income".into(),
            &[Some("Verified"), Some("Not Verified"), None, Some("Verified")],
        );
        let (kind, _) = infer_column_kind(&series).unwrap();
        assert_eq!(kind, ColumnKind::Boolean);
    }

    #[test]
    fn test_native_boolean() {
        let series = Series::new("has_tax_lien".into(), &[true, false, false]);
        let (kind, values) = infer_column_kind(&series).unwrap();
        assert_eq!(kind, ColumnKind::Boolean);
        assert_eq!(
            values,
            ColumnValues::Text(vec![
                Some("true".to_string()),
                Some("false".to_string()),
                Some("false".to_string()),
            ])
        );
    }

    #[test]
    fn test_all_missing_text_is_categorical() {
        let series = Series::new("emp_title".into(), &[None::<&str>, None]);
        let (kind, _) = infer_column_kind(&series).unwrap();
        assert_eq!(kind, ColumnKind::Categorical);
    }

    #[test]
    fn test_nested_dtype_is_malformed() {
        let inner = Series::new("".into(), &[1i64, 2]);
        let series = Series::new("tags".into(), &[inner]);
        let err = infer_column_kind(&series).unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_VALUE");
    }
}
