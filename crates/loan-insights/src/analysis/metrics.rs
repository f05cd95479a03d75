//! Headline portfolio metrics.
//!
//! Every metric is computed on its own; one that cannot be computed (absent
//! column, no values) is reported without a value instead of failing the set.

use crate::analysis::derived::{credit_utilization_pct, payment_burden_pct};
use crate::config::RiskThresholds;
use crate::error::{InsightsError, Result};
use crate::profiler::{mean, median};
use crate::utils::{numeric_column, text_column};
use polars::prelude::*;
use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a metric value is displayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Count,
    Currency,
    Percent,
}

/// A labelled value; `None` when not available.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub label: String,
    pub unit: MetricUnit,
    pub value: Option<f64>,
}

impl Metric {
    fn compute(label: &str, unit: MetricUnit, value: impl FnOnce() -> Result<f64>) -> Self {
        let value = match value() {
            Ok(v) => Some(v),
            Err(e) => {
                debug!("Metric '{}' not available: {}", label, e);
                None
            }
        };
        Self {
            label: label.to_string(),
            unit,
            value,
        }
    }
}

/// The portfolio metric cards.
pub fn key_metrics(df: &DataFrame, thresholds: &RiskThresholds) -> Vec<Metric> {
    use MetricUnit::*;

    vec![
        Metric::compute("Total loans", Count, || Ok(df.height() as f64)),
        Metric::compute("Avg loan amount", Currency, || {
            column_mean(df, "loan_amount")
        }),
        Metric::compute("Median loan amount", Currency, || {
            column_median(df, "loan_amount")
        }),
        Metric::compute("Avg interest rate", Percent, || {
            column_mean(df, "interest_rate")
        }),
        Metric::compute("Median installment", Currency, || {
            column_median(df, "installment")
        }),
        Metric::compute("% charged-off/default", Percent, || {
            status_share(df, "loan_status", &thresholds.status_pattern)
        }),
        Metric::compute("Avg DTI", Percent, || column_mean(df, "debt_to_income")),
        Metric::compute("Avg credit utilization", Percent, || {
            present_mean(&credit_utilization_pct(df)?)
        }),
        Metric::compute("Avg payment burden", Percent, || {
            present_mean(&payment_burden_pct(df)?)
        }),
        Metric::compute("Share with tax liens", Percent, || {
            share_above(df, "tax_liens", 0.0)
        }),
        Metric::compute("Share with bankruptcies", Percent, || {
            share_above(df, "public_record_bankrupt", 0.0)
        }),
        Metric::compute("Share with delinquencies", Percent, || {
            share_above(df, "delinq_2y", thresholds.max_delinquencies)
        }),
        Metric::compute("Share with high DTI", Percent, || {
            share_above(df, "debt_to_income", thresholds.max_debt_to_income)
        }),
    ]
}

fn present_mean(values: &[Option<f64>]) -> Result<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    mean(&present).ok_or_else(|| InsightsError::InsufficientData("no values".to_string()))
}

fn column_mean(df: &DataFrame, column: &str) -> Result<f64> {
    present_mean(&numeric_column(df, column)?)
}

fn column_median(df: &DataFrame, column: &str) -> Result<f64> {
    let present: Vec<f64> = numeric_column(df, column)?.into_iter().flatten().collect();
    median(&present).ok_or_else(|| InsightsError::InsufficientData("no values".to_string()))
}

/// Percentage of all rows whose value is above `threshold`; missing counts
/// as not above.
fn share_above(df: &DataFrame, column: &str, threshold: f64) -> Result<f64> {
    let values = numeric_column(df, column)?;
    let hits = values
        .iter()
        .filter(|v| v.is_some_and(|x| x > threshold))
        .count();
    percent_of(hits, values.len())
}

/// Percentage of all rows whose status matches the pattern.
pub fn status_share(df: &DataFrame, column: &str, pattern: &str) -> Result<f64> {
    let regex = RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| InsightsError::InvalidConfig(e.to_string()))?;
    let values = text_column(df, column)?;
    let hits = values
        .iter()
        .filter(|v| v.as_deref().is_some_and(|s| regex.is_match(s)))
        .count();
    percent_of(hits, values.len())
}

fn percent_of(hits: usize, total: usize) -> Result<f64> {
    if total == 0 {
        return Err(InsightsError::InsufficientData("no rows".to_string()));
    }
    Ok(hits as f64 / total as f64 * 100.0)
}
