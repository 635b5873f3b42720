//! Input classification from file names.

use std::path::Path;

/// Detected file type based on extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    /// Plain GRIB (edition 2)
    Grib2,
    /// Gzip-compressed GRIB2
    Grib2Gz,
    /// Anything else
    Unknown,
}

impl FileType {
    pub fn is_grib(self) -> bool {
        !matches!(self, FileType::Unknown)
    }
}

const GZ_SUFFIXES: [&str; 3] = [".grib2.gz", ".grb2.gz", ".grib.gz"];
const PLAIN_SUFFIXES: [&str; 3] = [".grib2", ".grb2", ".grib"];

/// Detect file type from path.
pub fn detect_file_type(path: &str) -> FileType {
    let lower = path.to_lowercase();

    if GZ_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        FileType::Grib2Gz
    } else if PLAIN_SUFFIXES.iter().any(|s| lower.ends_with(s)) {
        FileType::Grib2
    } else {
        FileType::Unknown
    }
}

/// Output base name for an input file: the file name without its GRIB
/// (and gzip) extension.
///
/// `era5_20240101.grib2.gz` → `era5_20240101`
pub fn base_name(path: &Path) -> Option<String> {
    let file_name = path.file_name().and_then(|s| s.to_str())?;
    let bytes = file_name.as_bytes();

    let suffix_len = GZ_SUFFIXES
        .iter()
        .chain(PLAIN_SUFFIXES.iter())
        .find(|s| bytes.len() >= s.len() && bytes[bytes.len() - s.len()..].eq_ignore_ascii_case(s.as_bytes()))
        .map(|s| s.len())
        .or_else(|| path.extension().map(|ext| ext.len() + 1))
        .unwrap_or(0);

    let stem = &file_name[..file_name.len() - suffix_len];
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}
