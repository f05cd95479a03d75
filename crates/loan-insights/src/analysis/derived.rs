//! Per-row ratios computed from loan columns.

use crate::error::Result;
use crate::utils::{has_columns, numeric_column};
use polars::prelude::*;
use tracing::debug;

pub const CREDIT_UTILIZATION: &str = "credit_utilization_pct";
pub const PAYMENT_BURDEN: &str = "payment_burden_pct";

/// `numerator / denominator * 100` per row.
///
/// Division by zero and any other non-finite result is missing.
pub fn ratio_pct(numerators: &[Option<f64>], denominators: &[Option<f64>]) -> Vec<Option<f64>> {
    numerators
        .iter()
        .zip(denominators.iter())
        .map(|(n, d)| {
            let pct = (*n)? / (*d)? * 100.0;
            pct.is_finite().then_some(pct)
        })
        .collect()
}

/// Utilized credit as a percentage of the total credit limit.
pub fn credit_utilization_pct(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    Ok(ratio_pct(
        &numeric_column(df, "total_credit_utilized")?,
        &numeric_column(df, "total_credit_limit")?,
    ))
}

/// Monthly installment as a percentage of monthly income.
pub fn payment_burden_pct(df: &DataFrame) -> Result<Vec<Option<f64>>> {
    let monthly_income: Vec<Option<f64>> = numeric_column(df, "annual_income")?
        .into_iter()
        .map(|v| v.map(|income| income / 12.0))
        .collect();
    Ok(ratio_pct(&numeric_column(df, "installment")?, &monthly_income))
}

/// Copy of `df` with the derived columns appended where their inputs exist.
pub fn with_derived_columns(df: &DataFrame) -> Result<DataFrame> {
    let mut out = df.clone();
    if has_columns(df, &["total_credit_utilized", "total_credit_limit"]) {
        out.with_column(Series::new(
            CREDIT_UTILIZATION.into(),
            credit_utilization_pct(df)?,
        ))?;
    } else {
        debug!("Skipping {}: credit columns absent", CREDIT_UTILIZATION);
    }
    if has_columns(df, &["installment", "annual_income"]) {
        out.with_column(Series::new(PAYMENT_BURDEN.into(), payment_burden_pct(df)?))?;
    } else {
        debug!("Skipping {}: income or installment absent", PAYMENT_BURDEN);
    }
    Ok(out)
}
