//! Reading real GRIB2 input, plain and gzip-compressed.

use bytes::Bytes;
use conversion::{read_file, read_records};
use flate2::write::GzEncoder;
use flate2::Compression;
use grib2_parser::Grib2Reader;
use std::io::Write;
use test_utils::require_test_file;

#[test]
fn test_gzip_input_matches_plain() {
    let path = require_test_file!("gfs_sample.grib2");
    let reader = Grib2Reader::default();
    let plain = read_file(&reader, &path).unwrap();

    let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
    encoder.write_all(&std::fs::read(&path).unwrap()).unwrap();
    let compressed = Bytes::from(encoder.finish().unwrap());

    let unpacked = read_records(&reader, compressed, "gfs_sample.grib2.gz").unwrap();
    assert_eq!(unpacked.len(), plain.len());
    assert_eq!(unpacked[0].metadata, plain[0].metadata);
}
