//! GRIB to NetCDF conversion.
//!
//! Ties the workspace together: input files are decoded with
//! `grib2-parser`, opened as hypercube tables, normalized to the configured
//! schema, and written as one NetCDF-4 file per table with a single named
//! encoding policy.
//!
//! ```ignore
//! let config = ConversionConfig::from_yaml_file(Path::new("config/conversion.yaml"))?;
//! let result = Converter::new(config)?.convert_file(Path::new("era5.grib2"))?;
//! for file in &result.files {
//!     println!("{} -> {}", file.key, file.path.display());
//! }
//! ```

pub mod config;
pub mod converter;
pub mod error;
pub mod metadata;
pub mod source;

pub use config::ConversionConfig;
pub use converter::{
    BatchResult, ConversionResult, Converter, DescriptorFailure, FileFailure, WrittenFile,
};
pub use error::{ConversionError, Result};
pub use metadata::{base_name, detect_file_type, FileType};
pub use source::{decompress_gzip, read_file, read_records};
