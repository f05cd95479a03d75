//! Distribution tables: equal-width histograms and category counts.

use crate::error::{InsightsError, Result};
use crate::types::{Bucket, ValueCount};
use crate::utils::{count_values, numeric_column, round2, text_column};
use polars::prelude::*;

/// Equal-width histogram over the present values.
///
/// Bins span `[min, max]`; each is half-open except the last, which also
/// holds the maximum. A constant column is centred in a unit-wide range.
/// Empty bins are kept so the table reads as a continuous axis.
pub fn histogram(values: &[Option<f64>], bins: usize) -> Result<Vec<Bucket>> {
    if bins == 0 {
        return Err(InsightsError::InvalidConfig(
            "histogram needs at least one bin".to_string(),
        ));
    }
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    let Some((mut lo, mut hi)) = bounds(&present) else {
        return Err(InsightsError::InsufficientData(
            "no values to plot".to_string(),
        ));
    };
    if lo == hi {
        lo -= 0.5;
        hi += 0.5;
    }

    let width = (hi - lo) / bins as f64;
    let mut counts = vec![0usize; bins];
    for v in &present {
        let i = (((v - lo) / width).floor() as usize).min(bins - 1);
        counts[i] += 1;
    }

    Ok(counts
        .into_iter()
        .enumerate()
        .map(|(i, row_count)| {
            let lower = lo + width * i as f64;
            let upper = if i + 1 == bins {
                hi
            } else {
                lo + width * (i + 1) as f64
            };
            Bucket {
                label: format!("{} to {}", round2(lower), round2(upper)),
                lower: Some(lower),
                upper: Some(upper),
                row_count,
            }
        })
        .collect())
}

/// Histogram of a named column.
pub fn histogram_column(df: &DataFrame, column: &str, bins: usize) -> Result<Vec<Bucket>> {
    histogram(&numeric_column(df, column)?, bins)
}

fn bounds(values: &[f64]) -> Option<(f64, f64)> {
    let first = *values.first()?;
    Some(
        values
            .iter()
            .fold((first, first), |(lo, hi), v| (lo.min(*v), hi.max(*v))),
    )
}

/// Order of a category count table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CountOrder {
    /// Most frequent first, ties by first appearance.
    #[default]
    Count,
    /// Ascending by value.
    Label,
}

/// Options for [`value_counts`].
#[derive(Debug, Clone, Default)]
pub struct ValueCountOptions {
    /// Count missing values under this label instead of dropping them.
    pub missing_label: Option<String>,
    /// Trim and lowercase values before counting.
    pub normalize: bool,
    pub order: CountOrder,
    pub limit: Option<usize>,
}

impl ValueCountOptions {
    /// Most frequent values with missing shown as `(missing)`.
    pub fn top(limit: usize) -> Self {
        Self {
            missing_label: Some("(missing)".to_string()),
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Every value in label order with missing shown as `(missing)`.
    pub fn by_label() -> Self {
        Self {
            missing_label: Some("(missing)".to_string()),
            order: CountOrder::Label,
            ..Self::default()
        }
    }

    pub fn normalized(mut self) -> Self {
        self.normalize = true;
        self
    }
}

/// Count occurrences of each value of a column.
pub fn value_counts(
    df: &DataFrame,
    column: &str,
    options: &ValueCountOptions,
) -> Result<Vec<ValueCount>> {
    let values = text_column(df, column)?
        .into_iter()
        .map(|value| match value {
            Some(v) if options.normalize => Some(v.trim().to_lowercase()),
            Some(v) => Some(v),
            None => options.missing_label.clone(),
        })
        .collect();
    let mut table = count_values(values)?;

    match options.order {
        CountOrder::Count => table.sort_by(|a, b| b.count.cmp(&a.count)),
        CountOrder::Label => table.sort_by(|a, b| a.value.cmp(&b.value)),
    }
    if let Some(limit) = options.limit {
        table.truncate(limit);
    }
    Ok(table)
}
