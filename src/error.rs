//! Error types for gcmtools.
//!
//! This module defines a single error enum that covers every failure a
//! session, a reduction or an I/O adapter can report.

use thiserror::Error;

/// The main error type for gcmtools operations.
#[derive(Error, Debug)]
pub enum GcmError {
    /// NetCDF file operation errors
    #[cfg(feature = "netcdf")]
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// Zarr store errors
    #[error("Zarr error: {message}")]
    Zarr { message: String },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (also raised for units outside the allowed set)
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// A tag that cannot key the collection
    #[error("Invalid tag '{tag}': {message}")]
    InvalidTag { tag: String, message: String },

    /// Requested tag is not in the collection
    #[error("The provided tag does not exist in the collection: {tag}")]
    NotFound { tag: String },

    /// No tag given while the collection holds zero or several datasets
    #[error("Ambiguous selection: {count} datasets are available, please provide a tag")]
    AmbiguousSelection { count: usize },

    /// Dataset units differ from the session units
    #[error("Unit conversion is needed and not yet implemented: {quantity} unit is '{found}', session uses '{expected}'")]
    UnitConversionNotImplemented {
        quantity: String,
        found: String,
        expected: String,
    },

    /// Dataset is not a basic GCM dataset (strict mode only)
    #[error("Dataset '{tag}' is not a basic GCM dataset, missing: {missing}")]
    SchemaViolation { tag: String, missing: String },

    /// Invalid parameter errors
    #[error("Invalid parameter: {param} - {message}")]
    InvalidParameter { param: String, message: String },

    /// Variable, coordinate or attribute missing from a dataset
    #[error("Data not found: {message}")]
    DataNotFound { message: String },

    /// Array shapes or dimensions that do not line up
    #[error("Shape error: {message}")]
    Shape { message: String },

    /// ndarray reshape failures
    #[error("Array shape error: {0}")]
    NdShape(#[from] ndarray::ShapeError),

    /// Raw reader requested for a GCM family we cannot parse
    #[error("The selected GCM type '{gcm}' is not supported")]
    UnsupportedGcm { gcm: String },

    /// Raw output that does not follow the expected layout
    #[error("Raw GCM output error: {message}")]
    RawFormat { message: String },

    /// Image generation errors
    #[error("Image generation error: {message}")]
    ImageGeneration { message: String },

    /// Image encoding errors
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GcmError {
    pub(crate) fn zarr(err: impl std::fmt::Display) -> Self {
        GcmError::Zarr {
            message: err.to_string(),
        }
    }
}

/// Convenience type alias for Results with GcmError
pub type Result<T> = std::result::Result<T, GcmError>;
