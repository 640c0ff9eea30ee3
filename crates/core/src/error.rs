//! Error types for urbdiff

use thiserror::Error;

/// Main error type for urbdiff operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

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

    #[error("Raster grids are not aligned: {0}")]
    GridMismatch(String),

    #[error("CRS mismatch: {0} vs {1}")]
    CrsMismatch(String, String),

    #[error("Empty composite for {label}: no valid pixels after filtering")]
    EmptyComposite { label: String },

    #[error("Region does not intersect the raster extent")]
    RegionOutsideRaster,

    #[error("Unsupported data type: {0}")]
    UnsupportedDataType(String),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("Export to {path} failed: {reason}")]
    Export { path: String, reason: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for urbdiff operations
pub type Result<T> = std::result::Result<T, Error>;
