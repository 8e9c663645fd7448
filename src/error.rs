//! Error types for tabprep operations.
//!
//! Configuration and shape errors indicate caller misuse and are returned
//! immediately. Data-driven degeneracies (zero variance, zero IQR, ties) are
//! not errors; each operation resolves them to a documented default.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors returned by the preprocessing engine.
#[derive(Debug, Error)]
pub enum PrepError {
    /// Unknown method name, out-of-range threshold, `k == 0` and similar misuse.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Row counts disagree, or a named column is not present.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Too few rows or columns for the requested result.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// The column's kind does not support the requested operation.
    #[error("Unsupported column type for '{column}': {reason}")]
    UnsupportedColumnType { column: String, reason: String },

    /// A column that must be complete contains missing values.
    #[error("Missing data in column '{0}'")]
    MissingData(String),

    /// Wraps errors raised by the underlying frame library.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),
}

impl PrepError {
    pub(crate) fn unsupported(column: &str, reason: impl Into<String>) -> Self {
        PrepError::UnsupportedColumnType {
            column: column.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn column_not_found(column: &str) -> Self {
        PrepError::ShapeMismatch(format!("column '{}' not found in dataset", column))
    }
}

/// Result alias used throughout the crate.
pub type PrepResult<T> = std::result::Result<T, PrepError>;
