//! GRIB2 decoding (WMO FM 92 GRIB Edition 2) into field records.
//!
//! The heavy lifting (section parsing, unpacking) is delegated to the `grib`
//! crate; this crate flattens each submessage into a [`FieldRecord`] whose
//! metadata keys use ecCodes names, which is what the hypercube opener
//! groups and filters on.

pub mod error;
pub mod reader;
pub mod record;
pub mod tables;

pub use error::{Grib2Error, Result};
pub use reader::{Grib2Reader, GRID_HASH_KEY};
pub use record::{FieldRecord, GridGeometry, MetaValue};
pub use tables::{Grib2Tables, LevelEntry, ParamKey, ParameterEntry};
