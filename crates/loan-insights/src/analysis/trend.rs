//! Monthly trends keyed on the loan issue month.

use crate::error::{InsightsError, Result};
use crate::utils::{numeric_column, round2, text_column};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Mean of a value column for one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    /// First day of the month.
    pub month: NaiveDate,
    pub label: String,
    pub value: f64,
    pub row_count: usize,
}

/// Parse an issue month such as `Mar-2018`.
pub fn parse_issue_month(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(&format!("01-{}", text.trim()), "%d-%b-%Y").ok()
}

/// Monthly mean of `value_column`, oldest month first.
///
/// Rows whose month does not parse or whose value is missing are skipped.
pub fn monthly_mean(
    df: &DataFrame,
    month_column: &str,
    value_column: &str,
) -> Result<Vec<TrendPoint>> {
    let months = text_column(df, month_column)?;
    let values = numeric_column(df, value_column)?;

    let mut groups: BTreeMap<NaiveDate, (f64, usize)> = BTreeMap::new();
    let mut unparsed = 0usize;
    for (month, value) in months.iter().zip(values) {
        let (Some(month), Some(value)) = (month, value) else {
            continue;
        };
        let Some(date) = parse_issue_month(month) else {
            unparsed += 1;
            continue;
        };
        let entry = groups.entry(date).or_insert((0.0, 0));
        entry.0 += value;
        entry.1 += 1;
    }
    if unparsed > 0 {
        debug!("{} '{}' values did not parse as Mon-YYYY", unparsed, month_column);
    }

    if groups.is_empty() {
        return Err(InsightsError::InsufficientData(format!(
            "no rows with both {month_column} and {value_column}"
        )));
    }

    Ok(groups
        .into_iter()
        .map(|(month, (sum, count))| TrendPoint {
            label: month.format("%b-%Y").to_string(),
            month,
            value: round2(sum / count as f64),
            row_count: count,
        })
        .collect())
}
