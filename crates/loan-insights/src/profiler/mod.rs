//! Column profiling.
//!
//! [`ColumnSummarizer`] turns one column into a [`ColumnSummary`]: its
//! logical type, missingness, exact cardinality, and either numeric moments
//! or its most frequent values, plus a bounded set of sample values.

mod statistics;
mod type_inference;

use crate::config::InsightsConfig;
use crate::error::Result;
use crate::types::{ColumnKind, ColumnSummary, NumericStats, SampleValue};
use crate::utils::{count_values, display_values, round2};
use polars::prelude::*;
use std::collections::HashSet;
use tracing::{debug, warn};

pub(crate) use statistics::{float_chunked, mean, median, pearson, quantile};
use type_inference::{ColumnValues, infer_column_kind};

/// Computes per-column summaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSummarizer {
    max_top_values: usize,
    max_sample_values: usize,
}

impl Default for ColumnSummarizer {
    fn default() -> Self {
        Self {
            max_top_values: 10,
            max_sample_values: 10,
        }
    }
}

impl ColumnSummarizer {
    pub fn new(max_top_values: usize, max_sample_values: usize) -> Self {
        Self {
            max_top_values,
            max_sample_values,
        }
    }

    pub fn from_config(config: &InsightsConfig) -> Self {
        Self::new(config.max_top_values, config.max_sample_values)
    }

    /// Summarize one column.
    ///
    /// Never fails: a column whose values cannot be read degrades to a
    /// text-only summary instead of being dropped.
    pub fn summarize(&self, series: &Series) -> ColumnSummary {
        match self.try_summarize(series) {
            Ok(summary) => summary,
            Err(e) => {
                warn!(
                    "Column '{}' falls back to text-only summary: {}",
                    series.name(),
                    e
                );
                self.text_fallback(series)
            }
        }
    }

    fn try_summarize(&self, series: &Series) -> Result<ColumnSummary> {
        let (dtype, values) = infer_column_kind(series)?;
        debug!("Summarizing column '{}' as {}", series.name(), dtype);

        let summary = match values {
            ColumnValues::Numeric(values) => self.summarize_numeric(dtype, &values),
            ColumnValues::Text(values) => self.summarize_text(dtype, values)?,
        };
        Ok(summary)
    }

    fn summarize_numeric(&self, dtype: ColumnKind, values: &[Option<f64>]) -> ColumnSummary {
        let present: Vec<f64> = values.iter().flatten().copied().collect();
        let missing_count = values.len() - present.len();

        let mut seen = HashSet::new();
        let mut distinct: Vec<f64> = present
            .iter()
            .copied()
            // +0.0 folds -0.0 into 0.0 so both count once
            .filter(|v| seen.insert((v + 0.0).to_bits()))
            .collect();
        let unique_count = distinct.len();

        distinct.sort_by(f64::total_cmp);
        let sample_values = distinct
            .into_iter()
            .take(self.max_sample_values)
            .map(|v| SampleValue::Number(round2(v)))
            .collect();

        ColumnSummary {
            dtype,
            missing_count,
            missing_pct: missing_pct(missing_count, values.len()),
            unique_count,
            numeric_stats: numeric_stats(&present),
            top_values: None,
            sample_values,
            text_fallback: false,
        }
    }

    fn summarize_text(
        &self,
        dtype: ColumnKind,
        values: Vec<Option<String>>,
    ) -> Result<ColumnSummary> {
        let total = values.len();
        let missing_count = values.iter().filter(|v| v.is_none()).count();

        // first-seen order, so the stable sort below breaks ties by it
        let counts = count_values(values)?;

        let sample_values = counts
            .iter()
            .take(self.max_sample_values)
            .map(|c| SampleValue::Text(c.value.clone()))
            .collect();
        let unique_count = counts.len();

        let mut ranked = counts;
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked.truncate(self.max_top_values);

        Ok(ColumnSummary {
            dtype,
            missing_count,
            missing_pct: missing_pct(missing_count, total),
            unique_count,
            numeric_stats: None,
            top_values: Some(ranked),
            sample_values,
            text_fallback: false,
        })
    }

    fn text_fallback(&self, series: &Series) -> ColumnSummary {
        let missing_count = series.null_count();
        let mut seen = HashSet::new();
        let distinct: Vec<String> = display_values(series)
            .into_iter()
            .filter(|v| seen.insert(v.clone()))
            .collect();

        ColumnSummary {
            dtype: ColumnKind::Other,
            missing_count,
            missing_pct: missing_pct(missing_count, series.len()),
            unique_count: distinct.len(),
            numeric_stats: None,
            top_values: None,
            sample_values: distinct
                .into_iter()
                .take(self.max_sample_values)
                .map(SampleValue::Text)
                .collect(),
            text_fallback: true,
        }
    }
}

fn missing_pct(missing: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(missing as f64 / total as f64 * 100.0)
}

fn numeric_stats(present: &[f64]) -> Option<NumericStats> {
    let values = float_chunked(present);
    Some(NumericStats {
        min: round2(values.min()?),
        max: round2(values.max()?),
        mean: round2(values.mean()?),
        median: round2(values.median()?),
        std: values.std(1).map(round2),
    })
}
