//! Error types for opening and normalizing tables.

use grib2_parser::MetaValue;
use thiserror::Error;

/// Why a set of records could not be assembled into one consistent table.
///
/// `MultipleValues` is the only splittable failure: it names the key whose
/// values partition the records into candidate hypercubes.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OpenError {
    #[error("no records match filter {filter}")]
    NoMatchingRecords { filter: String },

    #[error("variable '{variable}' has multiple values for key '{key}': {}", format_values(.values))]
    MultipleValues {
        variable: String,
        key: String,
        values: Vec<MetaValue>,
    },

    #[error("variable '{variable}': key '{key}' is present on only some records")]
    MissingKey { variable: String, key: String },

    #[error("variable '{variable}' mixes different grid geometries")]
    GridMismatch { variable: String },

    #[error("variable '{variable}' has two fields at {position}")]
    DuplicateField { variable: String, position: String },

    #[error("extra coordinate '{coord}' takes several values along dimension '{dim}'")]
    ExtraCoordMismatch { coord: String, dim: String },

    #[error("'{name}' is defined differently by variable '{variable}'")]
    CoordinateConflict { name: String, variable: String },

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Structural errors on a [`crate::Table`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    #[error("'{0}' not found in table")]
    NotFound(String),

    #[error("'{0}' already exists in table")]
    AlreadyExists(String),

    #[error("dimension '{name}' has length {existing}, variable needs {requested}")]
    DimensionMismatch {
        name: String,
        existing: usize,
        requested: usize,
    },

    #[error("variable '{name}' holds {actual} values but its dimensions need {expected}")]
    ShapeMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("coordinate '{0}' is not scalar and cannot become a new dimension")]
    NotScalar(String),
}

/// Errors surfaced by the opener and the normalizer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CubeError {
    /// One descriptor's attempt failed
    #[error("descriptor '{descriptor}' failed to open: {source}")]
    OpenFailure {
        descriptor: String,
        #[source]
        source: OpenError,
    },

    /// The automatic splitter itself failed
    #[error("automatic split of '{base_name}' failed: {source}")]
    FallbackFailure {
        base_name: String,
        #[source]
        source: OpenError,
    },

    /// A rename would overwrite a field that is still in use
    #[error("cannot rename '{from}' to '{to}': '{to}' is still in use")]
    NamingConflict { from: String, to: String },

    #[error("invalid descriptor: {0}")]
    InvalidDescriptor(String),

    #[error("output name '{0}' produced twice")]
    DuplicateKey(String),

    #[error("table error: {0}")]
    Table(#[from] TableError),
}

/// Result type for opener and normalizer operations.
pub type Result<T> = std::result::Result<T, CubeError>;

fn format_values(values: &[MetaValue]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}
