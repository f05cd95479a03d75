//! Saving column metadata next to the dataset.

use crate::error::{InsightsError, Result};
use crate::types::DatasetMetadata;
use polars::prelude::*;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const COLUMN_METADATA_FILE: &str = "column_metadata.csv";
pub const DATASET_METADATA_FILE: &str = "dataset_metadata.json";

/// Writes `column_metadata.csv` and `dataset_metadata.json`.
///
/// The two files are written in that order and never rolled back: if the
/// JSON sidecar fails, the CSV stays on disk and the error says so.
#[derive(Debug, Clone)]
pub struct MetadataWriter {
    output_dir: PathBuf,
}

impl MetadataWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Write both files, returning their paths.
    pub fn save(
        &self,
        metadata_frame: &mut DataFrame,
        dataset: &DatasetMetadata,
    ) -> Result<(PathBuf, PathBuf)> {
        fs::create_dir_all(&self.output_dir).map_err(|e| InsightsError::WriteFailed {
            path: self.output_dir.clone(),
            reason: e.to_string(),
        })?;

        let csv_path = self.output_dir.join(COLUMN_METADATA_FILE);
        write_csv(&csv_path, metadata_frame).map_err(|reason| InsightsError::WriteFailed {
            path: csv_path.clone(),
            reason,
        })?;
        info!("Column metadata saved: {}", csv_path.display());

        let json_path = self.output_dir.join(DATASET_METADATA_FILE);
        if let Err(reason) = write_json(&json_path, dataset) {
            warn!(
                "{} was written but {} failed",
                csv_path.display(),
                json_path.display()
            );
            return Err(InsightsError::WriteFailed {
                path: json_path,
                reason: format!("{reason} ({COLUMN_METADATA_FILE} was already written)"),
            });
        }
        info!("Dataset metadata saved: {}", json_path.display());

        Ok((csv_path, json_path))
    }
}

fn write_csv(path: &Path, df: &mut DataFrame) -> std::result::Result<(), String> {
    let mut file = File::create(path).map_err(|e| e.to_string())?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .finish(df)
        .map_err(|e| e.to_string())
}

fn write_json(path: &Path, dataset: &DatasetMetadata) -> std::result::Result<(), String> {
    let body = serde_json::to_string_pretty(dataset).map_err(|e| e.to_string())?;
    let mut file = File::create(path).map_err(|e| e.to_string())?;
    file.write_all(body.as_bytes()).map_err(|e| e.to_string())
}
