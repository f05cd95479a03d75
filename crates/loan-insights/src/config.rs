//! Configuration types for loan dataset analysis.
//!
//! This module provides configuration options using the builder pattern.
//! The risk thresholds are example defaults, not calibrated business rules.

use regex::RegexBuilder;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default pattern marking a loan status as charged-off or defaulted.
pub const DEFAULT_STATUS_PATTERN: &str = "charged|default";

/// Default dataset description used to prefill the editable text.
pub const DEFAULT_DATASET_DESCRIPTION: &str = "Cleaned loan dataset containing borrower, credit, and loan-related fields. \
     Derived from original loan records and cleaned for analysis (missing columns removed, \
     basic imputation and outlier handling applied).";

/// Thresholds used by the default high-risk predicate set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Rows whose `loan_status` matches this pattern (case-insensitive) are risky.
    /// Default: "charged|default"
    pub status_pattern: String,

    /// Debt-to-income ratio (percent) above which a row is risky.
    /// Default: 40.0
    pub max_debt_to_income: f64,

    /// Credit utilization (percent) above which a row is risky.
    /// Default: 80.0
    pub max_utilization: f64,

    /// Delinquency count above which a row is risky.
    /// Default: 0.0
    pub max_delinquencies: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            status_pattern: DEFAULT_STATUS_PATTERN.to_string(),
            max_debt_to_income: 40.0,
            max_utilization: 80.0,
            max_delinquencies: 0.0,
        }
    }
}

/// Configuration for loading and analysing a loan dataset.
///
/// Use [`InsightsConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use loan_insights::config::InsightsConfig;
///
/// let config = InsightsConfig::builder()
///     .data_path("cleaned_df.csv")
///     .quantile_buckets(6)
///     .top_correlations(5)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightsConfig {
    /// Path of the cleaned loan CSV.
    /// Default: "cleaned_df.csv"
    pub data_path: PathBuf,

    /// Directory receiving persisted metadata files.
    /// Default: "."
    pub output_dir: PathBuf,

    /// Dataset-level description written to the metadata sidecar.
    pub dataset_description: String,

    /// Maximum number of entries in a column's top values.
    /// Default: 10
    pub max_top_values: usize,

    /// Maximum number of sample values kept per column.
    /// Default: 10
    pub max_sample_values: usize,

    /// Number of buckets for quantile binning.
    /// Default: 6
    pub quantile_buckets: usize,

    /// Number of equal-width histogram bins.
    /// Default: 40
    pub histogram_bins: usize,

    /// Number of correlation pairs to report.
    /// Default: 5
    pub top_correlations: usize,

    /// Thresholds for the default high-risk heuristic.
    pub risk: RiskThresholds,

    /// Number of high-risk rows shown.
    /// Default: 20
    pub high_risk_display_limit: usize,

    /// Number of high-risk rows exported.
    /// Default: 100
    pub high_risk_export_limit: usize,

    /// Fraction of rows kept for scatter samples (0.0 exclusive - 1.0).
    /// Default: 0.5
    pub sample_fraction: f64,

    /// Seed for scatter sampling.
    /// Default: 1
    pub sample_seed: u64,
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("cleaned_df.csv"),
            output_dir: PathBuf::from("."),
            dataset_description: DEFAULT_DATASET_DESCRIPTION.to_string(),
            max_top_values: 10,
            max_sample_values: 10,
            quantile_buckets: 6,
            histogram_bins: 40,
            top_correlations: 5,
            risk: RiskThresholds::default(),
            high_risk_display_limit: 20,
            high_risk_export_limit: 100,
            sample_fraction: 0.5,
            sample_seed: 1,
        }
    }
}

impl InsightsConfig {
    /// Create a new configuration builder.
    pub fn builder() -> InsightsConfigBuilder {
        InsightsConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let counts = [
            ("max_top_values", self.max_top_values),
            ("max_sample_values", self.max_sample_values),
            ("quantile_buckets", self.quantile_buckets),
            ("histogram_bins", self.histogram_bins),
            ("top_correlations", self.top_correlations),
        ];
        for (field, value) in counts {
            if value == 0 {
                return Err(ConfigValidationError::ZeroCount(field.to_string()));
            }
        }

        if !(self.sample_fraction > 0.0 && self.sample_fraction <= 1.0) {
            return Err(ConfigValidationError::InvalidFraction(self.sample_fraction));
        }

        let thresholds = [
            ("max_debt_to_income", self.risk.max_debt_to_income),
            ("max_utilization", self.risk.max_utilization),
            ("max_delinquencies", self.risk.max_delinquencies),
        ];
        for (field, value) in thresholds {
            if !value.is_finite() {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        RegexBuilder::new(&self.risk.status_pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigValidationError::InvalidPattern(e.to_string()))?;

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}': must be at least 1")]
    ZeroCount(String),

    #[error("Invalid sample fraction: {0} (must be in (0.0, 1.0])")]
    InvalidFraction(f64),

    #[error("Invalid threshold for '{field}': {value} (must be finite)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid status pattern: {0}")]
    InvalidPattern(String),
}

/// Builder for [`InsightsConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct InsightsConfigBuilder {
    data_path: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    dataset_description: Option<String>,
    max_top_values: Option<usize>,
    max_sample_values: Option<usize>,
    quantile_buckets: Option<usize>,
    histogram_bins: Option<usize>,
    top_correlations: Option<usize>,
    risk: Option<RiskThresholds>,
    high_risk_display_limit: Option<usize>,
    high_risk_export_limit: Option<usize>,
    sample_fraction: Option<f64>,
    sample_seed: Option<u64>,
}

impl InsightsConfigBuilder {
    /// Set the path of the loan CSV.
    pub fn data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_path = Some(path.into());
        self
    }

    /// Set the directory for persisted metadata files.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(path.into());
        self
    }

    /// Set the dataset-level description.
    pub fn dataset_description(mut self, description: impl Into<String>) -> Self {
        self.dataset_description = Some(description.into());
        self
    }

    /// Set the maximum number of top values per categorical column.
    pub fn max_top_values(mut self, n: usize) -> Self {
        self.max_top_values = Some(n);
        self
    }

    /// Set the maximum number of sample values per column.
    pub fn max_sample_values(mut self, n: usize) -> Self {
        self.max_sample_values = Some(n);
        self
    }

    /// Set the number of quantile buckets.
    pub fn quantile_buckets(mut self, k: usize) -> Self {
        self.quantile_buckets = Some(k);
        self
    }

    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set the number of correlation pairs reported.
    pub fn top_correlations(mut self, n: usize) -> Self {
        self.top_correlations = Some(n);
        self
    }

    /// Replace the high-risk thresholds.
    pub fn risk(mut self, thresholds: RiskThresholds) -> Self {
        self.risk = Some(thresholds);
        self
    }

    /// Set the number of high-risk rows shown.
    pub fn high_risk_display_limit(mut self, limit: usize) -> Self {
        self.high_risk_display_limit = Some(limit);
        self
    }

    /// Set the number of high-risk rows exported.
    pub fn high_risk_export_limit(mut self, limit: usize) -> Self {
        self.high_risk_export_limit = Some(limit);
        self
    }

    /// Set the scatter sample fraction.
    pub fn sample_fraction(mut self, fraction: f64) -> Self {
        self.sample_fraction = Some(fraction);
        self
    }

    /// Set the scatter sample seed.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `InsightsConfig` or an error if validation fails.
    pub fn build(self) -> Result<InsightsConfig, ConfigValidationError> {
        let defaults = InsightsConfig::default();
        let config = InsightsConfig {
            data_path: self.data_path.unwrap_or(defaults.data_path),
            output_dir: self.output_dir.unwrap_or(defaults.output_dir),
            dataset_description: self
                .dataset_description
                .unwrap_or(defaults.dataset_description),
            max_top_values: self.max_top_values.unwrap_or(defaults.max_top_values),
            max_sample_values: self.max_sample_values.unwrap_or(defaults.max_sample_values),
            quantile_buckets: self.quantile_buckets.unwrap_or(defaults.quantile_buckets),
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            top_correlations: self.top_correlations.unwrap_or(defaults.top_correlations),
            risk: self.risk.unwrap_or(defaults.risk),
            high_risk_display_limit: self
                .high_risk_display_limit
                .unwrap_or(defaults.high_risk_display_limit),
            high_risk_export_limit: self
                .high_risk_export_limit
                .unwrap_or(defaults.high_risk_export_limit),
            sample_fraction: self.sample_fraction.unwrap_or(defaults.sample_fraction),
            sample_seed: self.sample_seed.unwrap_or(defaults.sample_seed),
        };

        config.validate()?;
        Ok(config)
    }
}
