//! Conversion configuration.
//!
//! Loaded from YAML, then optionally adjusted from environment variables:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `CONVERSION_OUTPUT_DIR` | output directory |
//! | `NETCDF_ENCODING_POLICY` | name of the policy to use |
//! | `NETCDF_COMPRESSION_LEVEL` | deflate level of the selected policy |
//! | `NETCDF_SHUFFLE` | shuffle flag of the selected policy |

use hypercube::{NormalizeSpec, OpenMode};
use netcdf_writer::{EncodingPolicy, PolicyRegistry, DEFAULT_POLICY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConversionError, Result};

/// Everything one conversion run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConversionConfig {
    /// How records are grouped into tables
    pub open: OpenMode,

    /// Renames and dimension expansion applied to every table
    pub normalize: NormalizeSpec,

    /// Policies in addition to the built-in `deflate1` and `none`
    pub encoding_policies: Vec<EncodingPolicy>,

    /// Name of the policy applied to every written file
    pub encoding_policy: String,

    /// Directory receiving `{key}.nc` files
    pub output_dir: PathBuf,

    /// Succeed with no output when no table can be opened
    pub allow_empty: bool,

    /// Replace existing output files
    pub overwrite: bool,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            open: OpenMode::default(),
            normalize: NormalizeSpec::cds_style(),
            encoding_policies: Vec::new(),
            encoding_policy: DEFAULT_POLICY.to_string(),
            output_dir: PathBuf::from("."),
            allow_empty: false,
            overwrite: false,
        }
    }
}

impl ConversionConfig {
    /// Load and validate a YAML configuration file.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConversionError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml_str(&contents)?;
        debug!(path = %path.display(), "Loaded conversion config");
        Ok(config)
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)
            .map_err(|e| ConversionError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("CONVERSION_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(dir);
        }

        if let Some(name) = lookup("NETCDF_ENCODING_POLICY") {
            self.encoding_policy = name;
        }

        let level = lookup("NETCDF_COMPRESSION_LEVEL")
            .map(|val| {
                val.trim().parse::<u8>().map_err(|_| {
                    ConversionError::InvalidConfig(format!(
                        "NETCDF_COMPRESSION_LEVEL must be an integer, got '{}'",
                        val
                    ))
                })
            })
            .transpose()?;
        let shuffle = lookup("NETCDF_SHUFFLE").map(|val| val.to_lowercase() == "true" || val == "1");

        if level.is_some() || shuffle.is_some() {
            let mut policy = self.selected_policy()?;
            if let Some(level) = level {
                policy.level = level;
                policy.deflate = level > 0;
            }
            if let Some(shuffle) = shuffle {
                policy.shuffle = shuffle;
            }
            self.encoding_policies.retain(|p| p.name != policy.name);
            self.encoding_policies.push(policy);
        }

        self.validate()
    }

    /// Check the configuration for errors.
    pub fn validate(&self) -> Result<()> {
        if let OpenMode::List { descriptors } = &self.open {
            if descriptors.is_empty() {
                return Err(ConversionError::InvalidConfig(
                    "list mode needs at least one descriptor".to_string(),
                ));
            }
        }
        self.open
            .validate()
            .map_err(|e| ConversionError::InvalidConfig(e.to_string()))?;
        self.selected_policy()?;
        Ok(())
    }

    /// Built-in policies plus the configured ones.
    pub fn policy_registry(&self) -> Result<PolicyRegistry> {
        let mut registry = PolicyRegistry::new();
        for policy in &self.encoding_policies {
            registry
                .register(policy.clone())
                .map_err(|e| ConversionError::InvalidConfig(e.to_string()))?;
        }
        Ok(registry)
    }

    /// The policy named by `encoding_policy`.
    pub fn selected_policy(&self) -> Result<EncodingPolicy> {
        self.policy_registry()?
            .get(&self.encoding_policy)
            .cloned()
            .map_err(|e| ConversionError::InvalidConfig(e.to_string()))
    }
}
