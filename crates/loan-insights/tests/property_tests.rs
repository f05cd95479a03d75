//! Property-based tests for the loan analyses.
//!
//! Each property generates small random columns and checks an invariant that
//! must hold for any input: ordered numeric statistics, quantile buckets that
//! tile the observed range, a well-formed correlation matrix, and one risk
//! flag per row.

use loan_insights::analysis::{Aggregation, BinnedAggregator, CorrelationRanker, RiskFlagger};
use loan_insights::{ColumnSummarizer, RiskThresholds};
use polars::prelude::*;
use proptest::prelude::*;
use std::collections::HashSet;

// ============================================================================
// Strategies
// ============================================================================

/// Whole-number amounts so interpolated medians stay exact.
fn amounts(max_len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
    proptest::collection::vec(
        proptest::option::weighted(0.9, (-10_000i32..10_000).prop_map(f64::from)),
        1..max_len,
    )
}

fn small_values(len: usize) -> impl Strategy<Value = Vec<Option<f64>>> {
    proptest::collection::vec(
        proptest::option::weighted(0.8, (0i32..12).prop_map(f64::from)),
        len,
    )
}

fn three_columns() -> impl Strategy<Value = (Vec<Option<f64>>, Vec<Option<f64>>, Vec<Option<f64>>)>
{
    (3usize..30).prop_flat_map(|n| (small_values(n), small_values(n), small_values(n)))
}

// ============================================================================
// Column Summaries
// ============================================================================

proptest! {
    #[test]
    fn prop_numeric_stats_are_ordered(values in amounts(60)) {
        let series = Series::new("loan_amount".into(), values.clone());
        let summary = ColumnSummarizer::default().summarize(&series);

        let present = values.iter().flatten().count();
        match summary.numeric_stats {
            Some(stats) => {
                prop_assert!(stats.min <= stats.median);
                prop_assert!(stats.median <= stats.max);
                prop_assert!(stats.min <= stats.mean && stats.mean <= stats.max);
                prop_assert_eq!(stats.std.is_some(), present >= 2);
            }
            None => prop_assert_eq!(present, 0),
        }
    }
}

// ============================================================================
// Quantile Buckets
// ============================================================================

proptest! {
    #[test]
    fn prop_quantile_buckets_tile_the_range(
        values in proptest::collection::vec((0i32..30).prop_map(f64::from), 1..80),
        k in 1usize..8,
    ) {
        let bins: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
        let outcomes = vec![Some(1.0); bins.len()];
        let stats = BinnedAggregator::quantile(k, Aggregation::Mean)
            .unwrap()
            .aggregate_values(&bins, &outcomes)
            .unwrap();

        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // every row lands in exactly one bucket
        let total: usize = stats.iter().map(|s| s.bucket.row_count).sum();
        prop_assert_eq!(total, values.len());
        prop_assert!(stats.iter().all(|s| s.bucket.row_count > 0));

        prop_assert_eq!(stats[0].bucket.lower, Some(min));
        prop_assert_eq!(stats[stats.len() - 1].bucket.upper, Some(max));
        for w in stats.windows(2) {
            prop_assert!(w[0].bucket.upper <= w[1].bucket.lower);
        }

        let distinct: HashSet<u64> = values.iter().map(|v| v.to_bits()).collect();
        if distinct.len() >= k {
            prop_assert_eq!(stats.len(), k);
        } else {
            prop_assert!(stats.len() <= k);
        }
    }
}

// ============================================================================
// Correlations
// ============================================================================

proptest! {
    #[test]
    fn prop_correlation_matrix_is_well_formed(
        (a, b, c) in three_columns(),
        top_n in 1usize..5,
    ) {
        let df = df!(
            "interest_rate" => a,
            "debt_to_income" => b,
            "loan_amount" => c,
        )
        .unwrap();

        let report = match CorrelationRanker::new(top_n).rank(&df) {
            Ok(report) => report,
            Err(e) => return Err(TestCaseError::fail(e.to_string())),
        };
        let matrix = &report.matrix;
        let n = matrix.columns.len();
        prop_assert_eq!(n, 3);
        prop_assert_eq!(matrix.values.len(), n);

        for i in 0..n {
            prop_assert_eq!(matrix.values[i].len(), n);
            let diagonal = matrix.values[i][i];
            prop_assert!(diagonal.is_none() || diagonal == Some(1.0));
            for j in 0..n {
                prop_assert_eq!(matrix.values[i][j], matrix.values[j][i]);
                if let Some(r) = matrix.values[i][j] {
                    prop_assert!((-1.0..=1.0).contains(&r));
                }
            }
        }

        prop_assert!(report.top_pairs.len() <= top_n);
        let mut seen = HashSet::new();
        for pair in &report.top_pairs {
            prop_assert_ne!(&pair.column_a, &pair.column_b);
            let key = if pair.column_a < pair.column_b {
                (pair.column_a.clone(), pair.column_b.clone())
            } else {
                (pair.column_b.clone(), pair.column_a.clone())
            };
            prop_assert!(seen.insert(key));
        }
    }
}

// ============================================================================
// Risk Flags
// ============================================================================

proptest! {
    #[test]
    fn prop_one_flag_per_row(
        rows in proptest::collection::vec(
            (
                proptest::option::of(0.0f64..80.0),
                proptest::option::of("(Current|Fully Paid|Charged Off|Default)"),
                proptest::option::of(0i64..4),
            ),
            0..40,
        )
    ) {
        let dti: Vec<Option<f64>> = rows.iter().map(|r| r.0).collect();
        let status: Vec<Option<String>> = rows.iter().map(|r| r.1.clone()).collect();
        let delinquencies: Vec<Option<i64>> = rows.iter().map(|r| r.2).collect();
        let df = df!(
            "debt_to_income" => dti.clone(),
            "loan_status" => status,
            "delinq_2y" => delinquencies.clone(),
        )
        .unwrap();

        let flags = RiskFlagger::from_thresholds(&RiskThresholds::default())
            .unwrap()
            .flag(&df)
            .unwrap();
        prop_assert_eq!(flags.len(), rows.len());

        for (i, flag) in flags.iter().enumerate() {
            if dti[i].is_some_and(|d| d > 40.0) || delinquencies[i].is_some_and(|d| d > 0) {
                prop_assert!(*flag);
            }
        }
    }
}
