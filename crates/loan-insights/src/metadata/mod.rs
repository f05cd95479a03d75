//! Column metadata table.
//!
//! [`MetadataTableBuilder`] runs the [`ColumnSummarizer`] over every column of
//! a frame and attaches a description from a [`DescriptionCatalog`]. The
//! result is rebuilt on each request; nothing is cached here.
//!
//! # Example
//!
//! ```rust,ignore
//! use loan_insights::metadata::{DescriptionCatalog, MetadataTableBuilder};
//!
//! let records = MetadataTableBuilder::default()
//!     .build(dataset.frame(), &DescriptionCatalog::loan_defaults());
//! for record in &records {
//!     println!("{}: {}", record.column, record.description);
//! }
//! ```

mod catalog;
mod persist;
mod store;

pub use catalog::{DescriptionCatalog, placeholder};
pub use persist::{COLUMN_METADATA_FILE, DATASET_METADATA_FILE, MetadataWriter};
pub use store::DescriptionStore;

use crate::error::Result;
use crate::profiler::ColumnSummarizer;
use crate::types::MetadataRecord;
use polars::prelude::*;
use tracing::debug;

/// Builds one [`MetadataRecord`] per column.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataTableBuilder {
    summarizer: ColumnSummarizer,
}

impl MetadataTableBuilder {
    pub fn new(summarizer: ColumnSummarizer) -> Self {
        Self { summarizer }
    }

    /// Summarize every column of `df`, in frame order.
    ///
    /// Never fails: unreadable columns come back as text-only summaries.
    pub fn build(&self, df: &DataFrame, catalog: &DescriptionCatalog) -> Vec<MetadataRecord> {
        debug!(
            "Building metadata for {} columns x {} rows",
            df.width(),
            df.height()
        );
        df.get_columns()
            .iter()
            .map(|column| {
                let series = column.as_materialized_series();
                let name = series.name().to_string();
                MetadataRecord {
                    description: catalog.describe(&name),
                    summary: self.summarizer.summarize(series),
                    column: name,
                }
            })
            .collect()
    }
}

/// Flatten metadata records into the downloadable table layout.
///
/// Descriptions come from `store`, so edits are reflected. `sample_values`
/// and `top_values` are JSON-encoded cells; a column without top values gets
/// an empty list.
pub fn metadata_frame(records: &[MetadataRecord], store: &DescriptionStore) -> Result<DataFrame> {
    let mut columns = Vec::with_capacity(records.len());
    let mut dtypes = Vec::with_capacity(records.len());
    let mut missing_counts = Vec::with_capacity(records.len());
    let mut missing_pcts = Vec::with_capacity(records.len());
    let mut unique_counts = Vec::with_capacity(records.len());
    let mut sample_values = Vec::with_capacity(records.len());
    let mut top_values = Vec::with_capacity(records.len());
    let mut descriptions = Vec::with_capacity(records.len());

    for record in records {
        let summary = &record.summary;
        columns.push(record.column.clone());
        dtypes.push(summary.dtype.to_string());
        missing_counts.push(summary.missing_count as u64);
        missing_pcts.push(summary.missing_pct);
        unique_counts.push(summary.unique_count as u64);
        sample_values.push(serde_json::to_string(&summary.sample_values)?);
        top_values.push(serde_json::to_string(
            summary.top_values.as_deref().unwrap_or_default(),
        )?);
        descriptions.push(store.get(&record.column));
    }

    let df = df!(
        "column" => columns,
        "dtype" => dtypes,
        "missing_count" => missing_counts,
        "missing_pct" => missing_pcts,
        "unique_count" => unique_counts,
        "sample_values" => sample_values,
        "top_values" => top_values,
        "description" => descriptions,
    )?;
    Ok(df)
}
