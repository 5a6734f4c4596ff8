//! Error types for loading, summarising and differencing measurement data.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced to callers of the data layer.
///
/// Row- and cell-level problems never show up here; they are logged and
/// skipped by the parsers.
#[derive(Debug, Error)]
pub enum DataError {
    /// The input path does not exist.
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// The file extension is not one this crate reads.
    #[error("Unsupported file extension: {0}")]
    UnsupportedFormat(String),

    /// The file (or an in-memory structure) does not have the expected shape.
    #[error("Invalid {format} format: {message}")]
    InvalidFormat {
        format: &'static str,
        message: String,
    },

    /// Nothing usable survived parsing.
    #[error("No valid data points found in {0}")]
    NoValidData(String),

    /// Two datasets do not share any part of the requested domain.
    #[error("No overlapping {field} range: [{a_min}, {a_max}] vs [{b_min}, {b_max}]")]
    NoOverlap {
        field: String,
        a_min: f64,
        a_max: f64,
        b_min: f64,
        b_max: f64,
    },

    /// A requested field is not present in a dataset.
    #[error("Field '{field}' not found in {dataset}")]
    FieldNotFound { field: String, dataset: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result type for the data layer.
pub type DataResult<T> = Result<T, DataError>;
