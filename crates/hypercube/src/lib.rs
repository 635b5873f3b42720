//! Hypercube assembly for decoded GRIB records.
//!
//! The [`HypercubeOpener`] turns the records of one file into a
//! [`TableCollection`], either one table per [`OpenDescriptor`] or one table
//! for the whole file with automatic splitting when the records do not form a
//! single hyper-rectangle. [`normalize`] then renames fields and promotes
//! scalar coordinates to dimensions before the tables are written out.

pub mod build;
pub mod descriptor;
pub mod error;
pub mod normalize;
pub mod opener;
pub mod split;
pub mod table;

pub use build::{build_table, coordinate_attributes, GRID_DIMS, UNIQUE_KEYS};
pub use descriptor::{FilterValue, OpenDescriptor, SUPPORTED_TIME_KEYS};
pub use error::{CubeError, OpenError, Result, TableError};
pub use normalize::{expand_dims, plan_renames, rename, NormalizeSpec, RenameMap};
pub use opener::{DescriptorOutcome, HypercubeOpener, OpenMode, OpenReport, TableCollection};
pub use split::split_records;
pub use table::{ArrayData, Attributes, Table, Variable};
