//! Error types for NetCDF serialization.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for NetCDF writer operations.
pub type WriteResult<T> = Result<T, WriteError>;

/// Serialization failures. When one of these is returned no file exists at
/// the requested output path (unless it existed before the call).
#[derive(Error, Debug)]
pub enum WriteError {
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error reported by libnetcdf / HDF5
    #[error("NetCDF error: {0}")]
    NetCdf(#[from] netcdf::Error),

    /// The variable's data type cannot be stored
    #[error("variable '{name}' has unsupported data type {dtype}")]
    UnsupportedType { name: String, dtype: String },

    /// The table violates its own shape invariants
    #[error("invalid table: {0}")]
    InvalidTable(String),

    #[error("invalid encoding policy '{name}': {reason}")]
    InvalidPolicy { name: String, reason: String },

    #[error("unknown encoding policy '{0}'")]
    UnknownPolicy(String),

    #[error("output file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),
}
