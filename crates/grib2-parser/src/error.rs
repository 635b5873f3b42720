//! Error types for GRIB2 decoding.

use thiserror::Error;

/// Errors that can occur while decoding a GRIB2 file into records.
#[derive(Error, Debug)]
pub enum Grib2Error {
    /// File I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The byte stream is not a readable GRIB2 file
    #[error("Invalid GRIB2 format: {0}")]
    InvalidFormat(String),

    /// A submessage lacks a section or field the record needs
    #[error("Submessage {index} is missing {what}")]
    MissingField { index: String, what: String },

    /// Unpacking the data section failed
    #[error("Failed to unpack submessage {index}: {reason}")]
    UnpackingError { index: String, reason: String },

    /// The forecast time unit has no fixed length in seconds
    #[error("Submessage {index} uses unsupported forecast time unit {unit} (Code Table 4.4)")]
    UnsupportedTimeUnit { index: String, unit: u8 },

    /// The decoded value count does not match the grid
    #[error("Submessage {index} has {values} values for a grid of {points} points")]
    GridMismatch {
        index: String,
        values: usize,
        points: usize,
    },
}

/// Result type for GRIB2 decoding.
pub type Result<T> = std::result::Result<T, Grib2Error>;
