//! Bucketed aggregation.
//!
//! A numeric binning column is cut into buckets, either equal-population
//! quantile buckets or explicit right-closed intervals with an open-ended
//! overflow bucket. A statistic of a target column is then computed per
//! bucket. [`CategoryAggregator`] does the same over the distinct values of a
//! categorical column.

use crate::error::{InsightsError, Result};
use crate::profiler::{float_chunked, mean, median, quantile};
use crate::types::{Bucket, BucketStat};
use crate::utils::{numeric_column, require_column, round2, text_column, text_values};
use polars::prelude::*;
use regex::{Regex, RegexBuilder};
use tracing::debug;

// =============================================================================
// Aggregations
// =============================================================================

/// A per-row test whose positive share is reported by [`Aggregation::Rate`].
#[derive(Debug, Clone)]
pub enum RowTest {
    /// Target text matches the pattern.
    Matches(Regex),
    /// Target number is strictly above the threshold.
    Exceeds(f64),
}

impl RowTest {
    /// Case-insensitive pattern test.
    pub fn matches(pattern: &str) -> Result<Self> {
        let regex = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| InsightsError::InvalidConfig(format!("invalid pattern: {e}")))?;
        Ok(Self::Matches(regex))
    }
}

/// Statistic computed per bucket.
#[derive(Debug, Clone)]
pub enum Aggregation {
    Mean,
    Median,
    /// Percentage (0-100) of rows passing the test.
    Rate(RowTest),
}

impl Aggregation {
    /// Per-row target values, `None` where the target is missing.
    ///
    /// Rate targets become 1.0 or 0.0 so that every aggregation is a plain
    /// reduction over the present outcomes.
    fn outcomes(&self, df: &DataFrame, target: &str) -> Result<Vec<Option<f64>>> {
        match self {
            Self::Mean | Self::Median => numeric_column(df, target),
            Self::Rate(RowTest::Matches(regex)) => Ok(text_column(df, target)?
                .into_iter()
                .map(|v| v.map(|s| indicator(regex.is_match(&s))))
                .collect()),
            Self::Rate(RowTest::Exceeds(threshold)) => Ok(numeric_column(df, target)?
                .into_iter()
                .map(|v| v.map(|x| indicator(x > *threshold)))
                .collect()),
        }
    }

    /// The same reduction as a polars expression over `outcome`.
    fn expr(&self, outcome: Expr) -> Expr {
        match self {
            Self::Mean => outcome.mean(),
            Self::Median => outcome.median(),
            Self::Rate(_) => outcome.mean() * lit(100.0),
        }
    }

    fn reduce(&self, values: &[f64]) -> Option<f64> {
        let value = match self {
            Self::Mean => mean(values)?,
            Self::Median => median(values)?,
            Self::Rate(_) => mean(values)? * 100.0,
        };
        Some(round2(value))
    }
}

fn indicator(hit: bool) -> f64 {
    if hit { 1.0 } else { 0.0 }
}

// =============================================================================
// Numeric Binning
// =============================================================================

/// How a numeric column is cut into buckets.
#[derive(Debug, Clone, PartialEq)]
pub enum BinningMode {
    /// Up to `k` equal-population buckets; duplicate edges collapse.
    Quantile(usize),
    /// Right-closed intervals `(e[i], e[i+1]]` plus an overflow bucket above
    /// the last edge. Values at or below the first edge are dropped.
    ///
    /// `labels`, when given, needs one entry per interval plus one for the
    /// overflow bucket.
    Fixed {
        edges: Vec<f64>,
        labels: Option<Vec<String>>,
    },
}

impl BinningMode {
    fn validate(&self) -> Result<()> {
        match self {
            Self::Quantile(0) => Err(InsightsError::InvalidConfig(
                "quantile bucket count must be at least 1".to_string(),
            )),
            Self::Quantile(_) => Ok(()),
            Self::Fixed { edges, labels } => {
                if edges.len() < 2 {
                    return Err(InsightsError::InvalidConfig(
                        "fixed binning needs at least two edges".to_string(),
                    ));
                }
                if edges.iter().any(|e| !e.is_finite()) {
                    return Err(InsightsError::InvalidConfig(
                        "bin edges must be finite".to_string(),
                    ));
                }
                if edges.windows(2).any(|w| w[0] >= w[1]) {
                    return Err(InsightsError::InvalidConfig(
                        "bin edges must be strictly increasing".to_string(),
                    ));
                }
                if let Some(labels) = labels
                    && labels.len() != edges.len()
                {
                    return Err(InsightsError::InvalidConfig(format!(
                        "{} labels given for {} buckets",
                        labels.len(),
                        edges.len()
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Cuts a binning column into buckets and aggregates a target per bucket.
///
/// # Example
///
/// ```rust,ignore
/// use loan_insights::analysis::{Aggregation, BinnedAggregator};
///
/// // Median interest rate per income sextile
/// let stats = BinnedAggregator::quantile(6, Aggregation::Median)?
///     .aggregate(&df, "annual_income", "interest_rate")?;
/// ```
#[derive(Debug, Clone)]
pub struct BinnedAggregator {
    mode: BinningMode,
    aggregation: Aggregation,
}

impl BinnedAggregator {
    pub fn new(mode: BinningMode, aggregation: Aggregation) -> Result<Self> {
        mode.validate()?;
        Ok(Self { mode, aggregation })
    }

    pub fn quantile(k: usize, aggregation: Aggregation) -> Result<Self> {
        Self::new(BinningMode::Quantile(k), aggregation)
    }

    pub fn fixed(
        edges: Vec<f64>,
        labels: Option<Vec<String>>,
        aggregation: Aggregation,
    ) -> Result<Self> {
        Self::new(BinningMode::Fixed { edges, labels }, aggregation)
    }

    /// Credit utilization bands used by the risk views.
    pub fn utilization_bands(aggregation: Aggregation) -> Result<Self> {
        Self::fixed(
            vec![-1.0, 10.0, 30.0, 50.0, 70.0, 100.0],
            Some(
                ["0-10%", "10-30%", "30-50%", "50-70%", "70-100%", "100%+"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
            ),
            aggregation,
        )
    }

    pub fn mode(&self) -> &BinningMode {
        &self.mode
    }

    /// Aggregate `target` per bucket of `bin_column`.
    ///
    /// Rows missing the binning value or the target are excluded. Empty
    /// buckets are omitted; the rest come back ordered by lower bound.
    pub fn aggregate(
        &self,
        df: &DataFrame,
        bin_column: &str,
        target: &str,
    ) -> Result<Vec<BucketStat>> {
        let bins = numeric_column(df, bin_column)?;
        let outcomes = self.aggregation.outcomes(df, target)?;
        self.aggregate_values(&bins, &outcomes)
    }

    /// Same as [`BinnedAggregator::aggregate`] over already extracted
    /// columns, for derived series that are not part of the frame.
    pub fn aggregate_values(
        &self,
        bins: &[Option<f64>],
        outcomes: &[Option<f64>],
    ) -> Result<Vec<BucketStat>> {
        let pairs: Vec<(f64, f64)> = bins
            .iter()
            .zip(outcomes.iter())
            .filter_map(|(b, t)| Some(((*b)?, (*t)?)))
            .collect();

        let slots = match &self.mode {
            BinningMode::Quantile(k) => quantile_slots(&pairs, *k),
            BinningMode::Fixed { edges, labels } => fixed_slots(edges, labels.as_deref()),
        };
        debug!(
            "Binning {} complete rows into {} candidate buckets",
            pairs.len(),
            slots.len()
        );

        let mut members: Vec<Vec<f64>> = vec![Vec::new(); slots.len()];
        for (value, target) in &pairs {
            if let Some(i) = slots.iter().position(|slot| slot.contains(*value)) {
                members[i].push(*target);
            }
        }

        Ok(slots
            .into_iter()
            .zip(members)
            .filter_map(|(slot, targets)| {
                let value = self.aggregation.reduce(&targets)?;
                let mut bucket = slot.bucket;
                bucket.row_count = targets.len();
                Some(BucketStat { bucket, value })
            })
            .collect())
    }
}

/// A candidate bucket and its interval semantics.
#[derive(Debug, Clone)]
struct Slot {
    bucket: Bucket,
    closed_left: bool,
}

impl Slot {
    fn interval(lower: f64, upper: f64, closed_left: bool, label: Option<String>) -> Self {
        let open = if closed_left { '[' } else { '(' };
        Self {
            bucket: Bucket {
                label: label.unwrap_or_else(|| {
                    format!("{open}{}, {}]", edge_text(lower), edge_text(upper))
                }),
                lower: Some(lower),
                upper: Some(upper),
                row_count: 0,
            },
            closed_left,
        }
    }

    fn overflow(lower: f64, label: Option<String>) -> Self {
        Self {
            bucket: Bucket {
                label: label.unwrap_or_else(|| format!("> {}", edge_text(lower))),
                lower: Some(lower),
                upper: None,
                row_count: 0,
            },
            closed_left: false,
        }
    }

    fn contains(&self, value: f64) -> bool {
        let lower = self.bucket.lower.unwrap_or(f64::NEG_INFINITY);
        let above_lower = value > lower || (self.closed_left && value == lower);
        match self.bucket.upper {
            Some(upper) => above_lower && value <= upper,
            None => above_lower,
        }
    }
}

/// Equal-population edges by linear interpolation, duplicates dropped.
///
/// The first bucket is closed on the left so the minimum is kept. Skewed
/// data can collapse interpolated edges; when that leaves fewer than `k`
/// occupied buckets although `k` distinct values exist, the edges are taken
/// from the ranks of the distinct values instead.
fn quantile_slots(pairs: &[(f64, f64)], k: usize) -> Vec<Slot> {
    let values: Vec<f64> = pairs.iter().map(|(v, _)| *v).collect();
    let population = float_chunked(&values);

    let mut edges: Vec<f64> = (0..=k)
        .filter_map(|i| quantile(&population, i as f64 / k as f64))
        .collect();
    edges.dedup();

    let slots = match edges.as_slice() {
        [] => return Vec::new(),
        [only] => vec![Slot::interval(*only, *only, true, None)],
        _ => slots_between(&edges),
    };

    let mut distinct = values;
    distinct.sort_by(f64::total_cmp);
    distinct.dedup();

    let occupied = slots
        .iter()
        .filter(|slot| distinct.iter().any(|v| slot.contains(*v)))
        .count();
    if occupied < k && distinct.len() >= k {
        debug!(
            "Quantile edges collapsed to {} buckets, using distinct-value ranks",
            occupied
        );
        return rank_slots(&distinct, k);
    }
    slots
}

/// `k` buckets over sorted distinct values, each ending on a distinct value.
///
/// The first bucket may be the single point `[d0, d0]`.
fn rank_slots(distinct: &[f64], k: usize) -> Vec<Slot> {
    let m = distinct.len();
    let mut edges = vec![distinct[0]];
    edges.extend((1..=k).map(|i| distinct[i * m / k - 1]));
    slots_between(&edges)
}

fn slots_between(edges: &[f64]) -> Vec<Slot> {
    edges
        .windows(2)
        .enumerate()
        .map(|(i, w)| Slot::interval(w[0], w[1], i == 0, None))
        .collect()
}

fn fixed_slots(edges: &[f64], labels: Option<&[String]>) -> Vec<Slot> {
    let label_at = |i: usize| labels.and_then(|l| l.get(i)).cloned();
    let mut slots: Vec<Slot> = edges
        .windows(2)
        .enumerate()
        .map(|(i, w)| Slot::interval(w[0], w[1], false, label_at(i)))
        .collect();
    slots.push(Slot::overflow(edges[edges.len() - 1], label_at(edges.len() - 1)));
    slots
}

fn edge_text(edge: f64) -> String {
    format!("{}", round2(edge))
}

// =============================================================================
// Categorical Grouping
// =============================================================================

/// Order of grouped results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryOrder {
    /// Ascending by category label.
    #[default]
    Label,
    /// Descending by aggregate, ties by label.
    ValueDescending,
}

/// Aggregates a target per distinct value of a categorical column.
///
/// Buckets carry no bounds. Rows with a missing category are dropped unless
/// a `missing_label` is set, in which case they form their own group.
#[derive(Debug, Clone)]
pub struct CategoryAggregator {
    aggregation: Aggregation,
    order: CategoryOrder,
    limit: Option<usize>,
    missing_label: Option<String>,
}

impl CategoryAggregator {
    pub fn new(aggregation: Aggregation) -> Self {
        Self {
            aggregation,
            order: CategoryOrder::default(),
            limit: None,
            missing_label: None,
        }
    }

    pub fn order(mut self, order: CategoryOrder) -> Self {
        self.order = order;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn missing_label(mut self, label: impl Into<String>) -> Self {
        self.missing_label = Some(label.into());
        self
    }

    pub fn aggregate(
        &self,
        df: &DataFrame,
        category: &str,
        target: &str,
    ) -> Result<Vec<BucketStat>> {
        let categories: Vec<Option<String>> = text_values(require_column(df, category)?)?
            .into_iter()
            .map(|label| label.or_else(|| self.missing_label.clone()))
            .collect();
        let outcomes = self.aggregation.outcomes(df, target)?;

        let grouped = df!("category" => categories, "outcome" => outcomes)?
            .lazy()
            .filter(col("category").is_not_null().and(col("outcome").is_not_null()))
            .group_by_stable([col("category")])
            .agg([
                self.aggregation.expr(col("outcome")).alias("value"),
                len().cast(DataType::UInt64).alias("row_count"),
            ])
            .collect()?;
        debug!("Grouped '{}' into {} categories", category, grouped.height());

        let labels = grouped.column("category")?.str()?;
        let values = grouped.column("value")?.cast(&DataType::Float64)?;
        let row_counts = grouped.column("row_count")?.u64()?;

        let mut stats: Vec<BucketStat> = labels
            .into_iter()
            .zip(values.f64()?.into_iter())
            .zip(row_counts.into_iter())
            .filter_map(|((label, value), row_count)| {
                Some(BucketStat {
                    bucket: Bucket {
                        label: label?.to_string(),
                        lower: None,
                        upper: None,
                        row_count: row_count? as usize,
                    },
                    value: round2(value?),
                })
            })
            .collect();

        stats.sort_by(|a, b| a.bucket.label.cmp(&b.bucket.label));
        if self.order == CategoryOrder::ValueDescending {
            stats.sort_by(|a, b| b.value.total_cmp(&a.value));
        }
        if let Some(limit) = self.limit {
            stats.truncate(limit);
        }
        Ok(stats)
    }
}
