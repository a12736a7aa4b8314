//! Error types for OpenRES

use thiserror::Error;

/// Main error type for OpenRES operations.
///
/// Only configuration problems and missing inputs are surfaced through this
/// type during a pipeline run; per-segment failures are recorded in the
/// segment's own output row instead.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid raster dimensions: {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    #[error("Index out of bounds: ({row}, {col}) in raster of size ({rows}, {cols})")]
    IndexOutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    #[error("Raster size mismatch: expected ({er}, {ec}), got ({ar}, {ac})")]
    SizeMismatch { er: usize, ec: usize, ar: usize, ac: usize },

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Duplicate segment id t_ID={0}")]
    DuplicateSegmentId(u32),

    #[error("Field '{0}' not found in any feature of the layer")]
    UnknownField(String),

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),

    #[error("Run cancelled after {completed} of {total} segments")]
    Cancelled { completed: usize, total: usize },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for OpenRES operations
pub type Result<T> = std::result::Result<T, Error>;
