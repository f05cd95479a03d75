//! Downloadable CSV payloads.
//!
//! Every export is UTF-8 CSV bytes with a header row, ready to hand to a
//! download button or write to disk.

use crate::analysis::{HIGH_RISK_DISPLAY_COLUMNS, RiskFlagger, ScatterSampler, with_derived_columns};
use crate::dataset::Dataset;
use crate::error::Result;
use crate::metadata::{DescriptionStore, metadata_frame};
use crate::types::MetadataRecord;
use crate::utils::require_column;
use polars::prelude::*;
use tracing::debug;

/// Serialize a frame as CSV.
pub fn to_csv_bytes(df: &DataFrame) -> Result<Vec<u8>> {
    let mut df = df.clone();
    let mut buf = Vec::new();
    CsvWriter::new(&mut buf)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(&mut df)?;
    debug!("Encoded {} rows as {} CSV bytes", df.height(), buf.len());
    Ok(buf)
}

/// The whole table without the id column.
pub fn full_table_csv(dataset: &Dataset) -> Result<Vec<u8>> {
    to_csv_bytes(dataset.frame())
}

/// Column metadata with the current descriptions.
pub fn metadata_csv(records: &[MetadataRecord], store: &DescriptionStore) -> Result<Vec<u8>> {
    to_csv_bytes(&metadata_frame(records, store)?)
}

/// A single row, id included.
pub fn row_csv(dataset: &Dataset, index: usize) -> Result<Vec<u8>> {
    to_csv_bytes(&dataset.row(index)?)
}

/// High-risk rows by descending interest rate, id included.
pub fn high_risk_csv(dataset: &Dataset, flagger: &RiskFlagger, limit: usize) -> Result<Vec<u8>> {
    let flags = flagger.flag(dataset.frame())?;
    let mut columns = vec![dataset.id_column()];
    columns.extend(HIGH_RISK_DISPLAY_COLUMNS);

    let rows = flagger.high_risk_rows(
        &dataset.indexed_frame()?,
        &flags,
        Some("interest_rate"),
        &columns,
        limit,
    )?;
    to_csv_bytes(&rows)
}

/// Two columns for a scatter plot, sampled once the table is large.
///
/// Derived ratio columns can be plotted as well.
pub fn scatter_csv(
    dataset: &Dataset,
    sampler: &ScatterSampler,
    x: &str,
    y: &str,
) -> Result<Vec<u8>> {
    let df = with_derived_columns(dataset.frame())?;
    require_column(&df, x)?;
    require_column(&df, y)?;
    to_csv_bytes(&sampler.sample(&df.select([x, y])?)?)
}
