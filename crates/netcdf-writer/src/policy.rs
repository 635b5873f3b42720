//! Named encoding policies.
//!
//! One policy is applied uniformly to every data variable of every file, so
//! compression settings live in configuration rather than per field.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{WriteError, WriteResult};

/// Lossless compression settings for data variables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EncodingPolicy {
    pub name: String,

    /// Enable zlib deflate
    #[serde(default = "default_deflate")]
    pub deflate: bool,

    /// Deflate level, 0-9
    #[serde(default = "default_level")]
    pub level: u8,

    /// Byte-shuffle before compressing
    #[serde(default = "default_shuffle")]
    pub shuffle: bool,
}

fn default_deflate() -> bool {
    true
}

fn default_level() -> u8 {
    1
}

fn default_shuffle() -> bool {
    true
}

/// Name of the policy used when nothing is configured.
pub const DEFAULT_POLICY: &str = "deflate1";

impl EncodingPolicy {
    pub fn new(name: &str, deflate: bool, level: u8, shuffle: bool) -> Self {
        Self {
            name: name.to_string(),
            deflate,
            level,
            shuffle,
        }
    }

    /// Deflate level 1 with shuffle, as the Climate Data Store writes NetCDF.
    pub fn deflate1() -> Self {
        Self::new(DEFAULT_POLICY, true, 1, true)
    }

    pub fn uncompressed() -> Self {
        Self::new("none", false, 0, false)
    }

    pub fn validate(&self) -> WriteResult<()> {
        let invalid = |reason: &str| WriteError::InvalidPolicy {
            name: self.name.clone(),
            reason: reason.to_string(),
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty"));
        }
        if self.level > 9 {
            return Err(invalid("deflate level must be between 0 and 9"));
        }
        Ok(())
    }

    /// `(level, shuffle)` for variables that get compressed, `None` otherwise.
    pub fn compression(&self) -> Option<(i32, bool)> {
        self.deflate.then_some((self.level as i32, self.shuffle))
    }
}

impl Default for EncodingPolicy {
    fn default() -> Self {
        Self::deflate1()
    }
}

/// Policies addressable by name.
#[derive(Debug, Clone, PartialEq)]
pub struct PolicyRegistry {
    policies: BTreeMap<String, EncodingPolicy>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        let mut policies = BTreeMap::new();
        for policy in [EncodingPolicy::deflate1(), EncodingPolicy::uncompressed()] {
            policies.insert(policy.name.clone(), policy);
        }
        Self { policies }
    }
}

impl PolicyRegistry {
    /// Registry holding the built-in `deflate1` and `none` policies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a policy after validating it.
    pub fn register(&mut self, policy: EncodingPolicy) -> WriteResult<()> {
        policy.validate()?;
        self.policies.insert(policy.name.clone(), policy);
        Ok(())
    }

    pub fn get(&self, name: &str) -> WriteResult<&EncodingPolicy> {
        self.policies
            .get(name)
            .ok_or_else(|| WriteError::UnknownPolicy(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.policies.keys().map(|k| k.as_str())
    }
}
