//! The conversion pipeline: decode, open, normalize, write.

use bytes::Bytes;
use grib2_parser::{FieldRecord, Grib2Reader};
use hypercube::{DescriptorOutcome, HypercubeOpener, Table};
use netcdf_writer::{EncodingPolicy, NetcdfWriter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::config::ConversionConfig;
use crate::error::{ConversionError, Result};
use crate::metadata::{base_name, detect_file_type};
use crate::source;

/// One NetCDF file produced by a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WrittenFile {
    pub key: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub compressed_variables: Vec<String>,
}

/// A descriptor that did not produce a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DescriptorFailure {
    pub key: String,
    pub reason: String,
}

/// Result of converting one input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversionResult {
    pub base_name: String,
    pub input: Option<PathBuf>,
    pub files: Vec<WrittenFile>,
    pub failures: Vec<DescriptorFailure>,
    /// The records were split automatically
    pub fallback_used: bool,
    pub encoding_policy: String,
}

impl ConversionResult {
    pub fn bytes_written(&self) -> u64 {
        self.files.iter().map(|f| f.bytes).sum()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(|f| f.key.as_str())
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ConversionError::Other(e.into()))
    }
}

/// An input file that failed during a batch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Result of converting every GRIB file under a directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub converted: Vec<ConversionResult>,
    pub failed: Vec<FileFailure>,
}

impl BatchResult {
    pub fn bytes_written(&self) -> u64 {
        self.converted.iter().map(|r| r.bytes_written()).sum()
    }
}

/// Converts GRIB input into NetCDF files as configured.
pub struct Converter {
    config: ConversionConfig,
    policy: EncodingPolicy,
    reader: Grib2Reader,
}

impl Converter {
    /// Create a converter; the configuration is validated first.
    pub fn new(config: ConversionConfig) -> Result<Self> {
        config.validate()?;
        let policy = config.selected_policy()?;
        Ok(Self {
            config,
            policy,
            reader: Grib2Reader::default(),
        })
    }

    /// Decode with a reader using custom lookup tables.
    pub fn with_reader(mut self, reader: Grib2Reader) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    /// Convert the file at `path`; output names derive from its file name.
    pub fn convert_file(&self, path: &Path) -> Result<ConversionResult> {
        let base = base_name(path)
            .ok_or_else(|| ConversionError::UnknownFileType(path.display().to_string()))?;
        let records = source::read_file(&self.reader, path)?;

        let mut result = self.convert_records(&base, &records)?;
        result.input = Some(path.to_path_buf());
        Ok(result)
    }

    /// Convert in-memory file contents; `file_path` decides gzip handling
    /// and the base name.
    pub fn convert_bytes(&self, data: Bytes, file_path: &str) -> Result<ConversionResult> {
        let base = base_name(Path::new(file_path))
            .ok_or_else(|| ConversionError::UnknownFileType(file_path.to_string()))?;
        let records = source::read_records(&self.reader, data, file_path)?;
        self.convert_records(&base, &records)
    }

    /// Open `records` as tables keyed after `base`, normalize them and write
    /// one `{key}.nc` per table.
    ///
    /// Every table is normalized before any file is written, so a naming
    /// conflict leaves the output directory untouched.
    pub fn convert_records(&self, base: &str, records: &[FieldRecord]) -> Result<ConversionResult> {
        info!(
            base_name = %base,
            records = records.len(),
            policy = %self.policy.name,
            "Converting records"
        );

        let report = HypercubeOpener::new(base).open(records, &self.config.open)?;
        let failures: Vec<DescriptorFailure> = report
            .failures()
            .filter_map(|outcome| match outcome {
                DescriptorOutcome::Failed { key, error, .. } => Some(DescriptorFailure {
                    key: key.clone(),
                    reason: error.to_string(),
                }),
                DescriptorOutcome::Opened { .. } => None,
            })
            .collect();
        let fallback_used = report.fallback_used;

        let mut result = ConversionResult {
            base_name: base.to_string(),
            input: None,
            files: Vec::new(),
            failures,
            fallback_used,
            encoding_policy: self.policy.name.clone(),
        };

        if report.tables.is_empty() {
            if !self.config.allow_empty {
                return Err(ConversionError::EmptyCollection(base.to_string()));
            }
            warn!(base_name = %base, "No tables opened, nothing written");
            return Ok(result);
        }

        let mut tables: Vec<(String, Table)> = Vec::with_capacity(report.tables.len());
        for (key, mut table) in report.tables {
            self.config.normalize.apply(&mut table)?;
            debug!(key = %key, dims = ?table.dims(), "Normalized table");
            tables.push((key, table));
        }

        std::fs::create_dir_all(&self.config.output_dir)?;
        let writer = NetcdfWriter::new(self.policy.clone()).with_overwrite(self.config.overwrite);
        for (key, table) in tables {
            let path = self.config.output_dir.join(format!("{}.nc", key));
            let written = writer
                .write(&table, &path)
                .map_err(|source| ConversionError::Serialization {
                    key: key.clone(),
                    source,
                })?;
            result.files.push(WrittenFile {
                key,
                path: written.path,
                bytes: written.bytes,
                compressed_variables: written.compressed_variables,
            });
        }

        info!(
            base_name = %base,
            files = result.files.len(),
            bytes = result.bytes_written(),
            failures = result.failures.len(),
            fallback_used = result.fallback_used,
            "Conversion complete"
        );
        Ok(result)
    }

    /// Convert every GRIB file under `dir`, in file name order.
    ///
    /// A failing file is recorded and the run continues.
    pub fn convert_dir(&self, dir: &Path) -> Result<BatchResult> {
        let mut inputs = Vec::new();
        for entry in WalkDir::new(dir).sort_by_file_name() {
            let entry = entry.map_err(|e| ConversionError::Other(e.into()))?;
            if entry.file_type().is_file() && detect_file_type(&entry.path().to_string_lossy()).is_grib() {
                inputs.push(entry.into_path());
            }
        }
        info!(dir = %dir.display(), files = inputs.len(), "Converting directory");

        let mut batch = BatchResult::default();
        for path in inputs {
            match self.convert_file(&path) {
                Ok(result) => batch.converted.push(result),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Conversion failed, continuing");
                    batch.failed.push(FileFailure {
                        path,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_rejected() {
        let config = ConversionConfig {
            encoding_policy: "missing".to_string(),
            ..ConversionConfig::default()
        };
        assert!(matches!(
            Converter::new(config),
            Err(ConversionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_result_json() {
        let result = ConversionResult {
            base_name: "era5".into(),
            input: None,
            files: vec![WrittenFile {
                key: "era5".into(),
                path: PathBuf::from("/out/era5.nc"),
                bytes: 10,
                compressed_variables: vec!["t".into()],
            }],
            failures: Vec::new(),
            fallback_used: false,
            encoding_policy: "deflate1".into(),
        };
        let json: serde_json::Value = serde_json::from_str(&result.to_json().unwrap()).unwrap();
        assert_eq!(json["files"][0]["key"], "era5");
        assert_eq!(json["fallback_used"], false);
        assert_eq!(result.bytes_written(), 10);
    }
}
