//! Loading the cleaned loan table.
//!
//! The first CSV column is the row identifier written by the cleaning step.
//! It is kept aside as [`Dataset::row_ids`] and never profiled; the remaining
//! columns form [`Dataset::frame`].

use crate::error::{InsightsError, Result, ResultExt};
use crate::types::DatasetMetadata;
use crate::utils::text_column;
use polars::prelude::*;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rows scanned to infer column types.
const SCHEMA_INFERENCE_ROWS: usize = 10_000;

/// An immutable loaded table.
#[derive(Debug, Clone)]
pub struct Dataset {
    source: Option<PathBuf>,
    row_ids: Series,
    frame: DataFrame,
}

impl Dataset {
    /// Read a CSV file.
    ///
    /// A path that does not exist is [`InsightsError::MissingFile`].
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(InsightsError::MissingFile(path.to_path_buf()));
        }

        let df = read_csv_with_fallbacks(path)
            .context(format!("Failed to read {}", path.display()))?;
        let mut dataset = Self::from_frame(df)?;
        dataset.source = Some(path.to_path_buf());

        info!(
            "Loaded {}: {} rows x {} columns",
            path.display(),
            dataset.height(),
            dataset.width()
        );
        Ok(dataset)
    }

    /// Split an in-memory frame whose first column holds row ids.
    pub fn from_frame(df: DataFrame) -> Result<Self> {
        let Some(first) = df.get_columns().first() else {
            return Err(InsightsError::InsufficientData(
                "table has no columns".to_string(),
            ));
        };
        let row_ids = first.as_materialized_series().clone();
        let frame = df.drop(row_ids.name().as_str())?;
        Ok(Self {
            source: None,
            row_ids,
            frame,
        })
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Data columns, without the id column.
    pub fn frame(&self) -> &DataFrame {
        &self.frame
    }

    pub fn row_ids(&self) -> &Series {
        &self.row_ids
    }

    pub fn id_column(&self) -> &str {
        self.row_ids.name().as_str()
    }

    pub fn height(&self) -> usize {
        self.frame.height()
    }

    /// Number of data columns.
    pub fn width(&self) -> usize {
        self.frame.width()
    }

    /// Data columns with the id column in front.
    pub fn indexed_frame(&self) -> Result<DataFrame> {
        let mut df = self.frame.clone();
        df.insert_column(0, self.row_ids.clone())?;
        Ok(df)
    }

    /// One row, id included.
    pub fn row(&self, index: usize) -> Result<DataFrame> {
        if index >= self.height() {
            return Err(InsightsError::InvalidConfig(format!(
                "row {index} is out of range for {} rows",
                self.height()
            )));
        }
        Ok(self.indexed_frame()?.slice(index as i64, 1))
    }

    /// Rows whose `column` value is one of `values`.
    ///
    /// An empty selection keeps every row. Values compare as text, so a
    /// numeric `term` is selected with `"36"`.
    pub fn filter_in(&self, column: &str, values: &[String]) -> Result<Self> {
        if values.is_empty() {
            return Ok(self.clone());
        }
        let keep: Vec<bool> = text_column(&self.frame, column)?
            .into_iter()
            .map(|v| v.is_some_and(|s| values.contains(&s)))
            .collect();
        let mask = BooleanChunked::from_slice("keep".into(), &keep);
        debug!(
            "Filter {} in {:?} keeps {} of {} rows",
            column,
            values,
            keep.iter().filter(|k| **k).count(),
            keep.len()
        );

        Ok(Self {
            source: self.source.clone(),
            row_ids: self.row_ids.filter(&mask)?,
            frame: self.frame.filter(&mask)?,
        })
    }

    /// Like [`Dataset::filter_in`], but a table without `column` is kept
    /// whole instead of failing.
    pub fn filter_in_if_present(&self, column: &str, values: &[String]) -> Result<Self> {
        if !values.is_empty() && self.frame.column(column).is_err() {
            warn!("No '{}' column, ignoring its filter", column);
            return Ok(self.clone());
        }
        self.filter_in(column, values)
    }

    /// Dataset-level sidecar record.
    pub fn metadata(&self, description: impl Into<String>) -> DatasetMetadata {
        DatasetMetadata {
            dataset_description: description.into(),
            row_count: self.height(),
            column_count: self.width(),
        }
    }
}

/// Read a CSV, retrying with looser settings when the standard read fails.
fn read_csv_with_fallbacks(path: &Path) -> Result<DataFrame> {
    // Strategy 1: standard loading with quote handling
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
        .with_has_header(true)
        .with_parse_options(CsvParseOptions::default().with_quote_char(Some(b'"')))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Standard loading failed: {}", e),
    }

    // Strategy 2: read every column as text and let the analyses parse
    match CsvReadOptions::default()
        .with_infer_schema_length(Some(0))
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()
    {
        Ok(df) => return Ok(df),
        Err(e) => debug!("Loading as text failed: {}", e),
    }

    // Strategy 3: collapse doubled quotes and blank lines first
    let content = std::fs::read_to_string(path)?;
    let cleaned = clean_csv_content(&content);
    Ok(CsvReadOptions::default()
        .with_infer_schema_length(Some(SCHEMA_INFERENCE_ROWS))
        .with_has_header(true)
        .into_reader_with_file_handle(Cursor::new(cleaned))
        .finish()?)
}

fn clean_csv_content(content: &str) -> String {
    content
        .replace("\"\"\"", "\"")
        .replace("\"\"", "\"")
        .lines()
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
