//! NetCDF-4 serialization for hypercube tables.
//!
//! A [`NetcdfWriter`] writes one [`hypercube::Table`] per file, applying a
//! single named [`EncodingPolicy`] (deflate level plus shuffle) to every data
//! variable. Writes are atomic: the file appears at its final path only once
//! it is complete.
//!
//! # System Requirements
//!
//! Links against libnetcdf and libhdf5 (`libhdf5-dev libnetcdf-dev`).

pub mod error;
pub mod plan;
pub mod policy;
pub mod writer;

pub use error::{WriteError, WriteResult};
pub use plan::{VariablePlan, WritePlan};
pub use policy::{EncodingPolicy, PolicyRegistry, DEFAULT_POLICY};
pub use writer::{silence_hdf5_errors, NetcdfWriter, WriteReport};
