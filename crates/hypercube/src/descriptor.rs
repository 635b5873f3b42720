//! Open descriptors: the typed configuration driving one attempt to build a table.

use grib2_parser::{FieldRecord, MetaValue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CubeError, Result};

/// Metadata keys that may serve as time axes.
pub const SUPPORTED_TIME_KEYS: [&str; 6] = [
    "time",
    "step",
    "valid_time",
    "indexing_time",
    "verifying_time",
    "forecastMonth",
];

/// Accepted value(s) for one filter key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    One(MetaValue),
    Many(Vec<MetaValue>),
}

impl FilterValue {
    pub fn accepts(&self, value: &MetaValue) -> bool {
        match self {
            FilterValue::One(expected) => expected == value,
            FilterValue::Many(options) => options.contains(value),
        }
    }
}

impl From<MetaValue> for FilterValue {
    fn from(value: MetaValue) -> Self {
        FilterValue::One(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::One(value.into())
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::One(value.into())
    }
}

/// Configuration for opening one table from a set of records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OpenDescriptor {
    /// Record selection: every key must be present with an accepted value
    pub filter: BTreeMap<String, FilterValue>,

    /// Metadata keys used as time axes, in axis order
    pub time_dims: Vec<String>,

    /// Keys excluded from the single-value consistency checks
    pub ignore_keys: Vec<String>,

    /// Auxiliary coordinate key → dimension it varies along
    pub extra_coords: BTreeMap<String, String>,

    /// Header keys stored as `GRIB_{key}` attributes instead of coordinates
    pub coords_as_attributes: Vec<String>,

    /// Label used in the output name
    pub tag: Option<String>,
}

impl Default for OpenDescriptor {
    fn default() -> Self {
        Self {
            filter: BTreeMap::new(),
            time_dims: vec!["time".to_string(), "step".to_string()],
            ignore_keys: Vec::new(),
            extra_coords: BTreeMap::new(),
            coords_as_attributes: Vec::new(),
            tag: None,
        }
    }
}

impl OpenDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, key: &str, value: impl Into<FilterValue>) -> Self {
        self.filter.insert(key.to_string(), value.into());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tag = Some(tag.to_string());
        self
    }

    pub fn with_time_dims(mut self, dims: &[&str]) -> Self {
        self.time_dims = dims.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn with_extra_coord(mut self, coord: &str, dim: &str) -> Self {
        self.extra_coords.insert(coord.to_string(), dim.to_string());
        self
    }

    pub fn with_coord_as_attribute(mut self, key: &str) -> Self {
        self.coords_as_attributes.push(key.to_string());
        self
    }

    pub fn with_ignored_key(mut self, key: &str) -> Self {
        self.ignore_keys.push(key.to_string());
        self
    }

    /// Check the descriptor before any record is read.
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(CubeError::InvalidDescriptor(msg));

        for (i, dim) in self.time_dims.iter().enumerate() {
            if !SUPPORTED_TIME_KEYS.contains(&dim.as_str()) {
                return invalid(format!(
                    "unsupported time dimension '{}' (expected one of {})",
                    dim,
                    SUPPORTED_TIME_KEYS.join(", ")
                ));
            }
            if self.time_dims[..i].contains(dim) {
                return invalid(format!("time dimension '{}' listed twice", dim));
            }
        }

        if let Some(tag) = &self.tag {
            if tag.trim().is_empty() {
                return invalid("tag must not be empty".to_string());
            }
            if tag.contains(['/', '\\']) || tag == "." || tag == ".." {
                return invalid(format!("tag '{}' is not usable in a file name", tag));
            }
        }

        for coord in self.extra_coords.keys() {
            if self.coords_as_attributes.contains(coord) {
                return invalid(format!(
                    "'{}' cannot be both an extra coordinate and an attribute",
                    coord
                ));
            }
        }

        for (key, value) in &self.filter {
            if matches!(value, FilterValue::Many(options) if options.is_empty()) {
                return invalid(format!("filter on '{}' accepts no values", key));
            }
        }

        Ok(())
    }

    /// True when the record passes every filter key.
    pub fn matches(&self, record: &FieldRecord) -> bool {
        self.filter.iter().all(|(key, accepted)| {
            record
                .get(key)
                .map(|value| accepted.accepts(value))
                .unwrap_or(false)
        })
    }

    /// Label used in output names: the tag, or the position in the list.
    pub fn label(&self, index: usize) -> String {
        self.tag.clone().unwrap_or_else(|| index.to_string())
    }

    /// Human-readable filter, e.g. `{stream=oper, typeOfLevel=[surface, meanSea]}`.
    pub fn describe_filter(&self) -> String {
        let parts: Vec<String> = self
            .filter
            .iter()
            .map(|(key, value)| match value {
                FilterValue::One(v) => format!("{}={}", key, v),
                FilterValue::Many(vs) => format!(
                    "{}=[{}]",
                    key,
                    vs.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
                ),
            })
            .collect();
        format!("{{{}}}", parts.join(", "))
    }

    pub(crate) fn is_ignored(&self, key: &str) -> bool {
        self.ignore_keys.iter().any(|k| k == key)
    }

    pub(crate) fn is_attribute(&self, key: &str) -> bool {
        self.coords_as_attributes.iter().any(|k| k == key)
    }
}
