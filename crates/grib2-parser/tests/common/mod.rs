//! Common test utilities for grib2-parser tests
//!
//! Real GRIB2 samples are not checked in; tests that need one are skipped
//! when it cannot be found.

use std::path::PathBuf;

/// Returns the path to the testdata directory
pub fn testdata_dir() -> PathBuf {
    let manifest_dir = env!("CARGO_MANIFEST_DIR");
    PathBuf::from(manifest_dir).join("testdata")
}

/// Returns the path to a test file, checking multiple locations
pub fn find_test_file(name: &str) -> Option<PathBuf> {
    let mut candidates = Vec::new();
    if let Ok(dir) = std::env::var("TEST_DATA_DIR") {
        candidates.push(PathBuf::from(dir).join(name));
    }
    candidates.push(testdata_dir().join(name));
    // Workspace root testdata/
    if let Some(root) = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
    {
        candidates.push(root.join("testdata").join(name));
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Macro to skip a test if the required file is not found
///
/// Usage:
/// ```ignore
/// #[test]
/// fn test_something() {
///     let path = require_test_file!("gfs_sample.grib2");
///     // ... test code
/// }
/// ```
#[macro_export]
macro_rules! require_test_file {
    ($name:expr) => {{
        match $crate::common::find_test_file($name) {
            Some(path) => path,
            None => {
                eprintln!(
                    "SKIPPED: Test file '{}' not found. Set TEST_DATA_DIR to a directory holding it.",
                    $name
                );
                return;
            }
        }
    }};
}
