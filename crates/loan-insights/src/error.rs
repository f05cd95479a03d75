//! Error types for loan dataset analysis.
//!
//! Errors follow the dashboard's degradation policy: most variants are
//! recoverable and get converted into a "not available" message at the
//! smallest scope (one metric, one chart) instead of aborting a whole report.
//!
//! Errors are serializable so a host can forward them as `{code, message}`.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for loan analysis.
#[derive(Error, Debug)]
pub enum InsightsError {
    /// Input CSV does not exist.
    #[error("Could not find {}. Make sure the file exists.", .0.display())]
    MissingFile(PathBuf),

    /// An expected column is absent from the loaded table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// A value could not be coerced to the type an analysis expects.
    #[error("Malformed value in column '{column}': {reason}")]
    MalformedValue { column: String, reason: String },

    /// Not enough rows or columns to compute an aggregate.
    #[error("Not enough data: {0}")]
    InsufficientData(String),

    /// Invalid parameters passed to an analysis.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing an export or metadata file failed part-way.
    #[error("Failed to write {}: {reason}", .path.display())]
    WriteFailed { path: PathBuf, reason: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<InsightsError>,
    },
}

impl InsightsError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        InsightsError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Shorthand for a [`InsightsError::MalformedValue`].
    pub fn malformed(column: impl Into<String>, reason: impl Into<String>) -> Self {
        InsightsError::MalformedValue {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Get error code for host handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFile(_) => "MISSING_FILE",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::MalformedValue { .. } => "MALFORMED_VALUE",
            Self::InsufficientData(_) => "INSUFFICIENT_DATA",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::WriteFailed { .. } => "WRITE_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error only disables a single analysis block.
    ///
    /// Missing columns, malformed values and degenerate inputs are reported
    /// in place; the rest of a report keeps rendering.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ColumnNotFound(_)
            | Self::MalformedValue { .. }
            | Self::InsufficientData(_)
            | Self::Polars(_) => true,
            Self::WithContext { source, .. } => source.is_recoverable(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for InsightsError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("InsightsError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, InsightsError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| InsightsError::Polars(e).with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code() {
        assert_eq!(
            InsightsError::MissingFile(PathBuf::from("cleaned_df.csv")).error_code(),
            "MISSING_FILE"
        );
        assert_eq!(
            InsightsError::ColumnNotFound("grade".to_string()).error_code(),
            "COLUMN_NOT_FOUND"
        );
    }

    #[test]
    fn test_missing_file_message_names_path() {
        let error = InsightsError::MissingFile(PathBuf::from("cleaned_df.csv"));
        assert!(error.to_string().contains("cleaned_df.csv"));
    }

    #[test]
    fn test_is_recoverable() {
        assert!(InsightsError::ColumnNotFound("x".to_string()).is_recoverable());
        assert!(InsightsError::InsufficientData("x".to_string()).is_recoverable());
        assert!(InsightsError::malformed("x", "bad").is_recoverable());
        assert!(!InsightsError::MissingFile(PathBuf::from("x")).is_recoverable());
        assert!(!InsightsError::InvalidConfig("x".to_string()).is_recoverable());
    }

    #[test]
    fn test_error_serialization() {
        let error = InsightsError::ColumnNotFound("loan_status".to_string());
        let json = serde_json::to_string(&error).unwrap();
        assert!(json.contains("COLUMN_NOT_FOUND"));
        assert!(json.contains("loan_status"));
    }

    #[test]
    fn test_with_context() {
        let error = InsightsError::InsufficientData("one numeric column".to_string())
            .with_context("Risk factor correlation");
        assert!(error.to_string().contains("Risk factor correlation"));
        assert_eq!(error.error_code(), "INSUFFICIENT_DATA");
        assert!(error.is_recoverable());
    }
}
