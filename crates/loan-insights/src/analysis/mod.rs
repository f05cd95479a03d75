//! Analyses over a loaded loan table.
//!
//! Each analysis reads the columns it needs and returns a plain record type.
//! A missing column surfaces as [`crate::InsightsError::ColumnNotFound`] so
//! the caller can skip that one view.
//!
//! - [`binning`]: quantile and fixed-edge bucketing, category grouping
//! - [`correlation`]: Pearson matrix and strongest pairs
//! - [`risk`]: rule-based high-risk flags
//! - [`derived`]: utilization and payment burden ratios
//! - [`metrics`]: headline portfolio numbers
//! - [`histogram`]: equal-width bins and category counts
//! - [`trend`]: monthly means by issue month
//! - [`sampling`]: seeded scatter samples

pub mod binning;
pub mod correlation;
pub mod derived;
pub mod histogram;
pub mod metrics;
pub mod risk;
pub mod sampling;
pub mod trend;

pub use binning::{
    Aggregation, BinnedAggregator, BinningMode, CategoryAggregator, CategoryOrder, RowTest,
};
pub use correlation::{CorrelationRanker, RISK_FACTOR_COLUMNS};
pub use derived::{CREDIT_UTILIZATION, PAYMENT_BURDEN, with_derived_columns};
pub use histogram::{CountOrder, ValueCountOptions, histogram, histogram_column, value_counts};
pub use metrics::{Metric, MetricUnit, key_metrics};
pub use risk::{HIGH_RISK_DISPLAY_COLUMNS, RiskFlagger, RiskPredicate, RiskPredicateSet};
pub use sampling::ScatterSampler;
pub use trend::{TrendPoint, monthly_mean};
