//! Reading input files into field records.

use bytes::Bytes;
use grib2_parser::{FieldRecord, Grib2Reader};
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{ConversionError, Result};
use crate::metadata::{detect_file_type, FileType};

/// Decompress gzip-compressed data.
pub fn decompress_gzip(data: &[u8]) -> Result<Bytes> {
    let mut decoder = flate2::read::GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| ConversionError::Decompression(e.to_string()))?;
    Ok(Bytes::from(decompressed))
}

/// Decode `data`, routing on the file type detected from `file_path`.
pub fn read_records(reader: &Grib2Reader, data: Bytes, file_path: &str) -> Result<Vec<FieldRecord>> {
    let data = match detect_file_type(file_path) {
        FileType::Grib2 => data,
        FileType::Grib2Gz => {
            let decompressed = decompress_gzip(&data)?;
            debug!(
                file_path = %file_path,
                compressed = data.len(),
                decompressed = decompressed.len(),
                "Decompressed input"
            );
            decompressed
        }
        FileType::Unknown => {
            warn!(file_path = %file_path, "Unknown file type, attempting GRIB2 parse");
            data
        }
    };

    Ok(reader.read_bytes(data)?)
}

/// Read and decode the file at `path`.
pub fn read_file(reader: &Grib2Reader, path: &Path) -> Result<Vec<FieldRecord>> {
    let data = Bytes::from(std::fs::read(path)?);
    read_records(reader, data, &path.to_string_lossy())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    #[test]
    fn test_decompress_gzip_valid() {
        let original = b"GRIB payload";
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(original).unwrap();
        let compressed = encoder.finish().unwrap();

        let result = decompress_gzip(&compressed).expect("Should decompress");
        assert_eq!(result.as_ref(), original);
    }

    #[test]
    fn test_decompress_gzip_invalid() {
        let result = decompress_gzip(b"not gzip data");
        assert!(matches!(result, Err(ConversionError::Decompression(_))));
    }

    #[test]
    fn test_garbage_is_a_parse_error() {
        let reader = Grib2Reader::default();
        let result = read_records(&reader, Bytes::from_static(b"nonsense"), "x.grib2");
        assert!(matches!(result, Err(ConversionError::Grib2Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let reader = Grib2Reader::default();
        let result = read_file(&reader, Path::new("/nonexistent/input.grib2"));
        assert!(matches!(result, Err(ConversionError::FileRead(_))));
    }
}
