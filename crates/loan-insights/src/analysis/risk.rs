//! Rule-based high-risk flags.
//!
//! A row is high risk when any predicate of a [`RiskPredicateSet`] holds.
//! Missing values never make a row risky. A predicate whose columns are
//! absent or unreadable is treated as never holding; the others still apply.

use crate::analysis::derived::ratio_pct;
use crate::config::RiskThresholds;
use crate::error::{InsightsError, Result};
use crate::utils::{has_columns, numeric_column, text_column};
use polars::prelude::*;
use regex::{Regex, RegexBuilder};
use std::fmt;
use tracing::{debug, info, warn};

/// Columns shown for high-risk rows, in display order.
pub const HIGH_RISK_DISPLAY_COLUMNS: [&str; 8] = [
    "emp_title",
    "state",
    "grade",
    "loan_purpose",
    "loan_amount",
    "interest_rate",
    "debt_to_income",
    "delinq_2y",
];

/// One risk rule.
#[derive(Debug, Clone)]
pub enum RiskPredicate {
    /// Status text matches a case-insensitive pattern.
    StatusMatches { column: String, pattern: Regex },
    /// Value strictly above a threshold.
    Exceeds { column: String, threshold: f64 },
    /// `numerator / denominator * 100` strictly above a threshold. A zero
    /// denominator gives a missing ratio.
    RatioExceeds {
        numerator: String,
        denominator: String,
        threshold: f64,
    },
}

impl RiskPredicate {
    pub fn status_matches(column: impl Into<String>, pattern: &str) -> Result<Self> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| InsightsError::InvalidConfig(format!("invalid status pattern: {e}")))?;
        Ok(Self::StatusMatches {
            column: column.into(),
            pattern,
        })
    }

    pub fn exceeds(column: impl Into<String>, threshold: f64) -> Self {
        Self::Exceeds {
            column: column.into(),
            threshold,
        }
    }

    pub fn ratio_exceeds(
        numerator: impl Into<String>,
        denominator: impl Into<String>,
        threshold: f64,
    ) -> Self {
        Self::RatioExceeds {
            numerator: numerator.into(),
            denominator: denominator.into(),
            threshold,
        }
    }

    /// Columns the predicate reads.
    pub fn columns(&self) -> Vec<&str> {
        match self {
            Self::StatusMatches { column, .. } | Self::Exceeds { column, .. } => {
                vec![column.as_str()]
            }
            Self::RatioExceeds {
                numerator,
                denominator,
                ..
            } => vec![numerator.as_str(), denominator.as_str()],
        }
    }

    /// Evaluate against every row of `df`.
    pub fn evaluate(&self, df: &DataFrame) -> Result<Vec<bool>> {
        if !has_columns(df, &self.columns()) {
            debug!("Risk predicate '{}' skipped: column absent", self);
            return Ok(vec![false; df.height()]);
        }

        let flags = match self {
            Self::StatusMatches { column, pattern } => text_column(df, column)?
                .into_iter()
                .map(|v| v.is_some_and(|s| pattern.is_match(&s)))
                .collect(),
            Self::Exceeds { column, threshold } => numeric_column(df, column)?
                .into_iter()
                .map(|v| v.is_some_and(|x| x > *threshold))
                .collect(),
            Self::RatioExceeds {
                numerator,
                denominator,
                threshold,
            } => ratio_pct(
                &numeric_column(df, numerator)?,
                &numeric_column(df, denominator)?,
            )
            .into_iter()
            .map(|v| v.is_some_and(|x| x > *threshold))
            .collect(),
        };
        Ok(flags)
    }
}

impl fmt::Display for RiskPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StatusMatches { column, pattern } => {
                write!(f, "{column} matches /{}/i", pattern.as_str())
            }
            Self::Exceeds { column, threshold } => write!(f, "{column} > {threshold}"),
            Self::RatioExceeds {
                numerator,
                denominator,
                threshold,
            } => write!(f, "{numerator} / {denominator} > {threshold}%"),
        }
    }
}

/// Ordered predicates combined by OR.
#[derive(Debug, Clone, Default)]
pub struct RiskPredicateSet {
    predicates: Vec<RiskPredicate>,
}

impl RiskPredicateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The loan heuristic: charged-off or defaulted status, high DTI, high
    /// credit utilization, or any recent delinquency.
    pub fn loan_defaults(thresholds: &RiskThresholds) -> Result<Self> {
        Ok(Self::new()
            .with(RiskPredicate::status_matches(
                "loan_status",
                &thresholds.status_pattern,
            )?)
            .with(RiskPredicate::exceeds(
                "debt_to_income",
                thresholds.max_debt_to_income,
            ))
            .with(RiskPredicate::ratio_exceeds(
                "total_credit_utilized",
                "total_credit_limit",
                thresholds.max_utilization,
            ))
            .with(RiskPredicate::exceeds(
                "delinq_2y",
                thresholds.max_delinquencies,
            )))
    }

    pub fn with(mut self, predicate: RiskPredicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn predicates(&self) -> &[RiskPredicate] {
        &self.predicates
    }

    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

/// Flags rows and extracts the high-risk subset.
#[derive(Debug, Clone)]
pub struct RiskFlagger {
    predicates: RiskPredicateSet,
}

impl RiskFlagger {
    pub fn new(predicates: RiskPredicateSet) -> Self {
        Self { predicates }
    }

    pub fn from_thresholds(thresholds: &RiskThresholds) -> Result<Self> {
        Ok(Self::new(RiskPredicateSet::loan_defaults(thresholds)?))
    }

    pub fn predicates(&self) -> &RiskPredicateSet {
        &self.predicates
    }

    /// One flag per row; `true` when any predicate holds.
    pub fn flag(&self, df: &DataFrame) -> Result<Vec<bool>> {
        let mut flags = vec![false; df.height()];
        for predicate in self.predicates.predicates() {
            let hits = match predicate.evaluate(df) {
                Ok(hits) => hits,
                Err(e) if e.is_recoverable() => {
                    warn!("Risk predicate '{}' skipped: {}", predicate, e);
                    continue;
                }
                Err(e) => return Err(e),
            };
            for (flag, hit) in flags.iter_mut().zip(hits) {
                *flag |= hit;
            }
        }
        debug!(
            "{} of {} rows flagged high risk",
            flags.iter().filter(|f| **f).count(),
            flags.len()
        );
        Ok(flags)
    }

    /// Flagged rows, sorted and projected for display.
    ///
    /// Rows are ordered by `sort_by` descending with missing values last when
    /// that column exists. `columns` keeps the listed columns that exist, in
    /// order; an empty list keeps every column. At most `limit` rows remain.
    pub fn high_risk_rows(
        &self,
        df: &DataFrame,
        flags: &[bool],
        sort_by: Option<&str>,
        columns: &[&str],
        limit: usize,
    ) -> Result<DataFrame> {
        if flags.len() != df.height() {
            return Err(InsightsError::InvalidConfig(format!(
                "{} flags for {} rows",
                flags.len(),
                df.height()
            )));
        }

        let mask = BooleanChunked::from_slice("high_risk".into(), flags);
        let mut subset = df.filter(&mask)?;

        if let Some(key) = sort_by.filter(|key| subset.column(key).is_ok()) {
            subset = subset.sort(
                [key],
                SortMultipleOptions::default()
                    .with_order_descending(true)
                    .with_nulls_last(true)
                    .with_maintain_order(true),
            )?;
        }

        if !columns.is_empty() {
            let present: Vec<&str> = columns
                .iter()
                .copied()
                .filter(|c| subset.column(c).is_ok())
                .collect();
            subset = subset.select(present)?;
        }

        info!("Selected {} high-risk rows", subset.height().min(limit));
        Ok(subset.head(Some(limit)))
    }
}
