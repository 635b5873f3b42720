//! Error types for the conversion crate.

use hypercube::CubeError;
use netcdf_writer::WriteError;
use thiserror::Error;

/// Errors that can occur while converting a file.
#[derive(Error, Debug)]
pub enum ConversionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse GRIB2 data: {0}")]
    Grib2Parse(#[from] grib2_parser::Grib2Error),

    /// Opening or normalizing a table failed
    #[error(transparent)]
    Cube(#[from] CubeError),

    /// Writing the table stored under `key` failed
    #[error("Failed to write '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: WriteError,
    },

    #[error("No tables could be opened from '{0}'")]
    EmptyCollection(String),

    #[error("Unknown file type: {0}")]
    UnknownFileType(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Decompression failed: {0}")]
    Decompression(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type for conversion operations.
pub type Result<T> = std::result::Result<T, ConversionError>;
