//! Pairwise Pearson correlation and strongest-pair ranking.

use crate::config::InsightsConfig;
use crate::error::{InsightsError, Result};
use crate::profiler::pearson;
use crate::types::{CorrelationMatrix, CorrelationPair, CorrelationReport};
use crate::utils::{is_numeric_dtype, numeric_values, round2};
use polars::prelude::*;
use tracing::debug;

/// Numeric columns considered by the risk correlation view, in display order.
pub const RISK_FACTOR_COLUMNS: [&str; 8] = [
    "interest_rate",
    "debt_to_income",
    "delinq_2y",
    "inquiries_last_12m",
    "num_open_cc_accounts",
    "credit_utilization_pct",
    "loan_amount",
    "installment",
];

/// Builds a correlation matrix and ranks its strongest pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CorrelationRanker {
    top_n: usize,
}

impl Default for CorrelationRanker {
    fn default() -> Self {
        Self { top_n: 5 }
    }
}

impl CorrelationRanker {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn from_config(config: &InsightsConfig) -> Self {
        Self::new(config.top_correlations)
    }

    /// Correlate every natively numeric column of `df`.
    pub fn rank(&self, df: &DataFrame) -> Result<CorrelationReport> {
        let columns: Vec<&Series> = df
            .get_columns()
            .iter()
            .map(|c| c.as_materialized_series())
            .filter(|s| is_numeric_dtype(s.dtype()))
            .collect();
        self.rank_series(&columns)
    }

    /// Correlate the named columns that are present, in the given order.
    ///
    /// Absent names are skipped; numeric-looking text columns are parsed.
    pub fn rank_columns(&self, df: &DataFrame, names: &[&str]) -> Result<CorrelationReport> {
        let mut columns = Vec::with_capacity(names.len());
        for name in names {
            match df.column(name) {
                Ok(column) => columns.push(column.as_materialized_series()),
                Err(_) => debug!("Correlation column '{}' not present, skipping", name),
            }
        }
        self.rank_series(&columns)
    }

    fn rank_series(&self, columns: &[&Series]) -> Result<CorrelationReport> {
        if columns.len() < 2 {
            return Err(InsightsError::InsufficientData(format!(
                "correlation needs at least 2 numeric columns, found {}",
                columns.len()
            )));
        }

        let names: Vec<String> = columns.iter().map(|s| s.name().to_string()).collect();
        let data = columns
            .iter()
            .map(|s| numeric_values(s))
            .collect::<Result<Vec<_>>>()?;

        let n = data.len();
        let mut values = vec![vec![None; n]; n];
        for i in 0..n {
            for j in i..n {
                let r = pairwise_pearson(&data[i], &data[j]);
                values[i][j] = r;
                values[j][i] = r;
            }
        }
        let matrix = CorrelationMatrix {
            columns: names,
            values,
        };
        debug!("Computed {}x{} correlation matrix", n, n);

        let top_pairs = self.top_pairs(&matrix);
        Ok(CorrelationReport { matrix, top_pairs })
    }

    /// Strongest distinct pairs, at most `top_n`.
    ///
    /// Pairs are taken from the upper triangle in row-major order, stably
    /// sorted by magnitude, and a magnitude already reported is skipped.
    pub fn top_pairs(&self, matrix: &CorrelationMatrix) -> Vec<CorrelationPair> {
        let n = matrix.columns.len();
        let mut pairs = Vec::new();
        for i in 0..n {
            for j in (i + 1)..n {
                if let Some(coefficient) = matrix.values[i][j] {
                    pairs.push(CorrelationPair {
                        column_a: matrix.columns[i].clone(),
                        column_b: matrix.columns[j].clone(),
                        coefficient,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| b.strength().total_cmp(&a.strength()));
        pairs.dedup_by(|later, earlier| later.strength() == earlier.strength());
        pairs.truncate(self.top_n);
        pairs
    }
}

/// Pearson over rows where both values are present, rounded to 2 decimals.
fn pairwise_pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let (xs, ys): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b.iter())
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .unzip();
    pearson(&xs, &ys).map(round2)
}
