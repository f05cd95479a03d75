//! Turning analysis results into display text.
//!
//! A report is made of independent sections. [`Section`] wraps one analysis
//! result so that a failure shows up as a short message in that section only.

use crate::analysis::{Metric, MetricUnit};
use crate::error::{InsightsError, Result};
use serde::Serialize;
use tracing::warn;

/// Placeholder for a value that could not be computed.
pub const NOT_AVAILABLE: &str = "N/A";

/// Outcome of one report section.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "content", rename_all = "snake_case")]
pub enum Section<T> {
    Ready(T),
    Unavailable(String),
}

impl<T> Section<T> {
    /// Wrap an analysis result, converting its error into a message.
    pub fn from_result(title: &str, result: Result<T>) -> Self {
        match result {
            Ok(value) => Self::Ready(value),
            Err(e) => {
                if !e.is_recoverable() {
                    warn!("Section '{}' failed: {}", title, e);
                }
                Self::Unavailable(unavailable_message(&e))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Self::Ready(value) => Some(value),
            Self::Unavailable(_) => None,
        }
    }
}

/// User-facing text for an analysis error.
pub fn unavailable_message(error: &InsightsError) -> String {
    match error {
        InsightsError::ColumnNotFound(column) => {
            format!("No `{column}` column available.")
        }
        InsightsError::InsufficientData(reason) => format!("Not enough data: {reason}."),
        InsightsError::WithContext { source, .. } => unavailable_message(source),
        other => format!("Not available: {other}"),
    }
}

/// Whole dollars with thousands separators, e.g. `$12,345`.
pub fn format_currency(value: f64) -> String {
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{sign}${}", group_thousands(value.abs().round() as u64))
}

/// Two-decimal percentage, e.g. `12.34%`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.2}%")
}

pub fn format_count(value: f64) -> String {
    group_thousands(value.round().max(0.0) as u64)
}

/// A metric value in its display unit, or `N/A`.
pub fn format_metric(metric: &Metric) -> String {
    match metric.value {
        None => NOT_AVAILABLE.to_string(),
        Some(v) if !v.is_finite() => NOT_AVAILABLE.to_string(),
        Some(v) => match metric.unit {
            MetricUnit::Count => format_count(v),
            MetricUnit::Currency => format_currency(v),
            MetricUnit::Percent => format_percent(v),
        },
    }
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

/// Render rows as a left-aligned plain-text table.
pub fn render_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(i) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let line = |cells: Vec<&str>| -> String {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = Vec::with_capacity(rows.len() + 2);
    out.push(line(headers.to_vec()));
    out.push(line(rule.iter().map(String::as_str).collect()));
    for row in rows {
        out.push(line(row.iter().map(String::as_str).collect()));
    }
    out.join("\n")
}
