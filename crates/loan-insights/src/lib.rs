//! Loan Dataset Insights Library
//!
//! The data core of a loan-portfolio dashboard, built on Polars.
//!
//! # Overview
//!
//! Given a cleaned loan table, this library produces:
//!
//! - **Column Profiling**: inferred kind, missingness, cardinality, numeric
//!   statistics and frequent values for every column
//! - **Metadata Tables**: one record per column with a human-friendly
//!   description, persisted as `column_metadata.csv` + `dataset_metadata.json`
//! - **Binned Aggregation**: quantile or fixed-edge buckets of one column,
//!   with the mean, median or rate of another column per bucket
//! - **Correlation Ranking**: Pearson matrix over risk factors and the
//!   strongest pairs
//! - **Risk Flagging**: rule-based high-risk rows (default status, high DTI,
//!   high utilization, delinquencies)
//!
//! plus headline metrics, histograms, value counts, monthly trends, scatter
//! sampling and CSV exports.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use loan_insights::{Dataset, InsightsConfig, MetadataTableBuilder, DescriptionCatalog};
//! use loan_insights::analysis::{Aggregation, BinnedAggregator, CorrelationRanker, RiskFlagger};
//!
//! let config = InsightsConfig::builder()
//!     .data_path("cleaned_df.csv")
//!     .quantile_buckets(6)
//!     .build()?;
//!
//! let dataset = Dataset::load(&config.data_path)?;
//! let df = dataset.frame();
//!
//! // Column metadata
//! let records = MetadataTableBuilder::default().build(df, &DescriptionCatalog::loan_defaults());
//!
//! // Mean interest rate per annual income bucket
//! let stats = BinnedAggregator::quantile(config.quantile_buckets, Aggregation::Mean)?
//!     .aggregate(df, "annual_income", "interest_rate")?;
//!
//! // Strongest correlations among the risk factors
//! let report = CorrelationRanker::from_config(&config)
//!     .rank_columns(df, &loan_insights::analysis::RISK_FACTOR_COLUMNS)?;
//!
//! // High-risk rows
//! let flags = RiskFlagger::from_thresholds(&config.risk)?.flag(df)?;
//! ```
//!
//! # Degradation
//!
//! Analyses fail independently. A missing column is a recoverable
//! [`InsightsError::ColumnNotFound`]; hosts wrap each view in
//! [`presentation::Section`] so one unavailable chart never hides the rest.

pub mod analysis;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod metadata;
pub mod presentation;
pub mod profiler;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use analysis::{
    Aggregation, BinnedAggregator, BinningMode, CategoryAggregator, CorrelationRanker, RiskFlagger,
    RiskPredicate, RiskPredicateSet,
};
pub use config::{ConfigValidationError, InsightsConfig, InsightsConfigBuilder, RiskThresholds};
pub use dataset::Dataset;
pub use error::{InsightsError, Result as InsightsResult, ResultExt};
pub use metadata::{DescriptionCatalog, DescriptionStore, MetadataTableBuilder, MetadataWriter};
pub use presentation::Section;
pub use profiler::ColumnSummarizer;
pub use types::{
    Bucket, BucketStat, ColumnKind, ColumnSummary, CorrelationMatrix, CorrelationPair,
    CorrelationReport, DatasetMetadata, MetadataRecord, NumericStats, SampleValue, ValueCount,
};
pub use utils::{DtypeCategory, get_dtype_category, is_missing_marker, is_numeric_dtype};

static_assertions::assert_impl_all!(Dataset: Send, Sync);
static_assertions::assert_impl_all!(InsightsConfig: Send, Sync);
static_assertions::assert_impl_all!(RiskFlagger: Send, Sync);
static_assertions::assert_impl_all!(InsightsError: Send, Sync);
