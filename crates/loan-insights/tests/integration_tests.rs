//! Integration tests for the loan insights library.
//!
//! These tests load a small loan fixture from disk and check the analyses
//! end to end.

use loan_insights::analysis::{
    Aggregation, BinnedAggregator, CREDIT_UTILIZATION, CategoryAggregator, CorrelationRanker,
    HIGH_RISK_DISPLAY_COLUMNS, RISK_FACTOR_COLUMNS, RiskFlagger, RowTest, ValueCountOptions,
    key_metrics, monthly_mean, value_counts, with_derived_columns,
};
use loan_insights::export;
use loan_insights::metadata::{COLUMN_METADATA_FILE, DATASET_METADATA_FILE, metadata_frame};
use loan_insights::presentation::{Section, format_metric};
use loan_insights::{
    ColumnKind, ColumnSummarizer, Dataset, DatasetMetadata, DescriptionCatalog, DescriptionStore,
    InsightsConfig, InsightsError, MetadataTableBuilder, MetadataWriter, RiskThresholds,
};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::collections::HashSet;
use std::path::PathBuf;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_loans() -> Dataset {
    Dataset::load(fixtures_path().join("loans.csv")).expect("Failed to load loans fixture")
}

fn status_rate() -> Aggregation {
    Aggregation::Rate(RowTest::matches("charged|default").unwrap())
}

fn metric_value(metrics: &[loan_insights::analysis::Metric], label: &str) -> Option<f64> {
    metrics
        .iter()
        .find(|m| m.label == label)
        .unwrap_or_else(|| panic!("no metric labelled {label}"))
        .value
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn test_load_fixture() {
    let ds = load_loans();

    assert_eq!(ds.id_column(), "loan_id");
    assert_eq!(ds.height(), 8);
    assert_eq!(ds.width(), 19);
    assert!(ds.frame().column("loan_id").is_err());
}

#[test]
fn test_fixture_reads_the_same_as_plain_polars() {
    let path = fixtures_path().join("loans.csv");
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path))
        .expect("Failed to create CSV reader")
        .finish()
        .expect("Failed to read CSV file");

    let ds = load_loans();
    assert!(ds.indexed_frame().unwrap().equals_missing(&df));
}

#[test]
fn test_filters_combine() {
    let ds = load_loans();
    let filtered = ds
        .filter_in("term", &["36".to_string()])
        .unwrap()
        .filter_in("grade", &["A".to_string(), "B".to_string()])
        .unwrap();

    let ids: Vec<i64> = filtered
        .row_ids()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(ids, vec![0, 1, 4, 5]);
}

// ============================================================================
// Column Summaries and Metadata
// ============================================================================

#[test]
fn test_metadata_records_for_fixture() {
    let ds = load_loans();
    let records =
        MetadataTableBuilder::default().build(ds.frame(), &DescriptionCatalog::loan_defaults());

    assert_eq!(records.len(), 19);
    let names: Vec<&str> = records.iter().map(|r| r.column.as_str()).collect();
    assert_eq!(names[0], "emp_title");
    assert_eq!(names[18], "interest_rate");

    let dti = records.iter().find(|r| r.column == "debt_to_income").unwrap();
    assert_eq!(dti.summary.dtype, ColumnKind::Numeric);
    assert_eq!(dti.summary.missing_count, 1);
    assert_eq!(dti.summary.missing_pct, 12.5);
    assert_eq!(dti.summary.unique_count, 7);

    let title = records.iter().find(|r| r.column == "emp_title").unwrap();
    assert_eq!(title.summary.dtype, ColumnKind::Categorical);
    assert_eq!(title.summary.missing_count, 1);
    let top = title.summary.top_values.as_ref().unwrap();
    assert_eq!(top[0].value, "teacher");
    assert_eq!(top[0].count, 2);

    let status = records.iter().find(|r| r.column == "loan_status").unwrap();
    assert!(!status.description.starts_with("No human-friendly description"));
}

#[test]
fn test_metadata_saved_to_disk() {
    let ds = load_loans();
    let records =
        MetadataTableBuilder::default().build(ds.frame(), &DescriptionCatalog::loan_defaults());
    let mut store = DescriptionStore::new(DescriptionCatalog::loan_defaults(), "Fixture loans");
    store.set("loan_status", "Current status of the loan.");

    let dir = tempfile::tempdir().unwrap();
    let mut frame = metadata_frame(&records, &store).unwrap();
    let (csv_path, json_path) = MetadataWriter::new(dir.path())
        .save(&mut frame, &ds.metadata(store.dataset_description()))
        .unwrap();

    assert_eq!(csv_path, dir.path().join(COLUMN_METADATA_FILE));
    assert_eq!(json_path, dir.path().join(DATASET_METADATA_FILE));

    let saved = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(csv_path))
        .unwrap()
        .finish()
        .unwrap();
    assert_eq!(saved.height(), 19);
    let descriptions: Vec<&str> = saved
        .column("description")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert!(descriptions.contains(&"Current status of the loan."));

    let meta: DatasetMetadata =
        serde_json::from_str(&std::fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(
        meta,
        DatasetMetadata {
            dataset_description: "Fixture loans".to_string(),
            row_count: 8,
            column_count: 19,
        }
    );
}

// ============================================================================
// Binned Aggregation
// ============================================================================

#[test]
fn test_income_quartiles_mean_rate() {
    let ds = load_loans();
    let stats = BinnedAggregator::quantile(4, Aggregation::Mean)
        .unwrap()
        .aggregate(ds.frame(), "annual_income", "interest_rate")
        .unwrap();

    let labels: Vec<&str> = stats.iter().map(|s| s.bucket.label.as_str()).collect();
    assert_eq!(
        labels,
        vec![
            "[40000, 53250]",
            "(53250, 72500]",
            "(72500, 101250]",
            "(101250, 150000]"
        ]
    );
    let values: Vec<f64> = stats.iter().map(|s| s.value).collect();
    assert_eq!(values, vec![22.5, 8.75, 12.25, 11.5]);
    assert!(stats.iter().all(|s| s.bucket.row_count == 2));
}

#[test]
fn test_default_rate_by_utilization_band() {
    let ds = load_loans();
    let df = with_derived_columns(ds.frame()).unwrap();
    let stats = BinnedAggregator::utilization_bands(status_rate())
        .unwrap()
        .aggregate(&df, CREDIT_UTILIZATION, "loan_status")
        .unwrap();

    let rows: Vec<(&str, usize, f64)> = stats
        .iter()
        .map(|s| (s.bucket.label.as_str(), s.bucket.row_count, s.value))
        .collect();
    assert_eq!(
        rows,
        vec![
            ("0-10%", 1, 0.0),
            ("10-30%", 4, 25.0),
            ("30-50%", 1, 0.0),
            ("70-100%", 2, 50.0),
        ]
    );
}

#[test]
fn test_default_rate_by_grade() {
    let ds = load_loans();
    let stats = CategoryAggregator::new(status_rate())
        .aggregate(ds.frame(), "grade", "loan_status")
        .unwrap();

    let rows: Vec<(&str, f64)> = stats
        .iter()
        .map(|s| (s.bucket.label.as_str(), s.value))
        .collect();
    assert_eq!(
        rows,
        vec![("A", 0.0), ("B", 0.0), ("C", 50.0), ("D", 0.0), ("E", 100.0)]
    );
}

#[test]
fn test_missing_bin_column_is_recoverable() {
    let ds = load_loans();
    let err = BinnedAggregator::quantile(6, Aggregation::Mean)
        .unwrap()
        .aggregate(ds.frame(), "fico_score", "interest_rate")
        .unwrap_err();

    assert!(matches!(err, InsightsError::ColumnNotFound(ref c) if c == "fico_score"));
    assert!(err.is_recoverable());
}

// ============================================================================
// Correlations
// ============================================================================

#[test]
fn test_risk_factor_correlations() {
    let ds = load_loans();
    let df = with_derived_columns(ds.frame()).unwrap();
    let report = CorrelationRanker::default()
        .rank_columns(&df, &RISK_FACTOR_COLUMNS)
        .unwrap();

    assert_eq!(report.matrix.columns.len(), RISK_FACTOR_COLUMNS.len());
    for name in RISK_FACTOR_COLUMNS {
        assert_eq!(report.matrix.get(name, name), Some(1.0));
    }
    assert_eq!(
        report.matrix.get("loan_amount", "installment"),
        report.matrix.get("installment", "loan_amount")
    );

    assert!(!report.top_pairs.is_empty());
    assert!(report.top_pairs.len() <= 5);
    assert!(
        report
            .top_pairs
            .windows(2)
            .all(|w| w[0].strength() >= w[1].strength())
    );
    assert!(report.top_pairs.iter().all(|p| p.column_a != p.column_b));
}

#[test]
fn test_correlations_need_two_columns() {
    let ds = load_loans();
    let section = Section::from_result(
        "Correlations",
        CorrelationRanker::default().rank_columns(ds.frame(), &["interest_rate", "fico_score"]),
    );
    assert!(!section.is_ready());
}

// ============================================================================
// Risk Flags and Exports
// ============================================================================

#[test]
fn test_default_risk_flags() {
    let ds = load_loans();
    let flagger = RiskFlagger::from_thresholds(&RiskThresholds::default()).unwrap();
    let flags = flagger.flag(ds.frame()).unwrap();

    assert_eq!(
        flags,
        vec![false, false, true, false, true, false, true, false]
    );

    let mut columns = vec![ds.id_column()];
    columns.extend(HIGH_RISK_DISPLAY_COLUMNS);
    let rows = flagger
        .high_risk_rows(
            &ds.indexed_frame().unwrap(),
            &flags,
            Some("interest_rate"),
            &columns,
            20,
        )
        .unwrap();

    assert_eq!(rows.width(), 9);
    let ids: Vec<i64> = rows
        .column("loan_id")
        .unwrap()
        .i64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(ids, vec![6, 2, 4]);
}

#[test]
fn test_high_risk_csv_export() {
    let ds = load_loans();
    let flagger = RiskFlagger::from_thresholds(&RiskThresholds::default()).unwrap();
    let csv = String::from_utf8(export::high_risk_csv(&ds, &flagger, 2).unwrap()).unwrap();
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(
        lines[0],
        "loan_id,emp_title,state,grade,loan_purpose,loan_amount,interest_rate,debt_to_income,delinq_2y"
    );
    assert_eq!(lines.len(), 3);
    assert!(lines[1].starts_with("6,teacher,TX,E,medical"));
}

// ============================================================================
// Metrics and Trends
// ============================================================================

#[test]
fn test_key_metrics_for_fixture() {
    let ds = load_loans();
    let metrics = key_metrics(ds.frame(), &RiskThresholds::default());

    assert_eq!(metric_value(&metrics, "Total loans"), Some(8.0));
    assert_eq!(metric_value(&metrics, "Avg loan amount"), Some(15625.0));
    assert_eq!(metric_value(&metrics, "Median loan amount"), Some(13500.0));
    assert_eq!(metric_value(&metrics, "% charged-off/default"), Some(25.0));
    assert_eq!(metric_value(&metrics, "Share with tax liens"), Some(12.5));
    assert_eq!(metric_value(&metrics, "Share with delinquencies"), Some(25.0));
    assert_eq!(metric_value(&metrics, "Share with high DTI"), Some(25.0));

    let avg = metrics.iter().find(|m| m.label == "Avg loan amount").unwrap();
    assert_eq!(format_metric(avg), "$15,625");
}

#[test]
fn test_metrics_degrade_per_card() {
    let ds = load_loans();
    let df = ds.frame().drop("loan_status").unwrap();
    let metrics = key_metrics(&df, &RiskThresholds::default());

    assert_eq!(metric_value(&metrics, "% charged-off/default"), None);
    assert_eq!(metric_value(&metrics, "Total loans"), Some(8.0));
}

#[test]
fn test_interest_rate_trend() {
    let ds = load_loans();
    let trend = monthly_mean(ds.frame(), "issue_month", "interest_rate").unwrap();

    let months: Vec<(&str, usize)> = trend
        .iter()
        .map(|p| (p.label.as_str(), p.row_count))
        .collect();
    assert_eq!(
        months,
        vec![("Jan-2018", 2), ("Feb-2018", 2), ("Mar-2018", 3), ("Apr-2018", 1)]
    );
    assert_eq!(trend[3].value, 14.3);
}

#[test]
fn test_grade_distribution() {
    let ds = load_loans();
    let counts = value_counts(ds.frame(), "grade", &ValueCountOptions::by_label()).unwrap();
    let pairs: Vec<(&str, usize)> = counts.iter().map(|c| (c.value.as_str(), c.count)).collect();
    assert_eq!(
        pairs,
        vec![("A", 2), ("B", 2), ("C", 2), ("D", 1), ("E", 1)]
    );
}

#[test]
fn test_config_drives_analyses() {
    let config = InsightsConfig::builder()
        .data_path(fixtures_path().join("loans.csv"))
        .max_top_values(1)
        .top_correlations(2)
        .build()
        .unwrap();

    let ds = Dataset::load(&config.data_path).unwrap();
    let summary = ColumnSummarizer::from_config(&config)
        .summarize(ds.frame().column("grade").unwrap().as_materialized_series());
    assert_eq!(summary.top_values.map(|t| t.len()), Some(1));

    let df = with_derived_columns(ds.frame()).unwrap();
    let report = CorrelationRanker::from_config(&config)
        .rank_columns(&df, &RISK_FACTOR_COLUMNS)
        .unwrap();
    assert_eq!(report.top_pairs.len(), 2);
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_numeric_unique_count_matches_distinct_values(
        values in proptest::collection::vec(proptest::option::of(-50i64..50), 0..60)
    ) {
        let series = Series::new("x".into(), values.clone());
        let summary = ColumnSummarizer::default().summarize(&series);

        let distinct: HashSet<i64> = values.iter().flatten().copied().collect();
        prop_assert_eq!(summary.unique_count, distinct.len());
        prop_assert_eq!(summary.missing_count, values.iter().filter(|v| v.is_none()).count());
        prop_assert!(summary.missing_pct >= 0.0 && summary.missing_pct <= 100.0);
    }

    #[test]
    fn prop_text_unique_count_matches_distinct_values(
        values in proptest::collection::vec(proptest::option::of("[a-c]{1,2}"), 1..40)
    ) {
        let series = Series::new("x".into(), values.clone());
        let summary = ColumnSummarizer::default().summarize(&series);

        let distinct: HashSet<&String> = values.iter().flatten().collect();
        prop_assert_eq!(summary.unique_count, distinct.len());
        if let Some(top) = summary.top_values {
            prop_assert!(top.len() <= 10);
            prop_assert!(top.windows(2).all(|w| w[0].count >= w[1].count));
        }
    }
}
