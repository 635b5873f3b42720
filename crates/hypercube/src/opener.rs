//! Opening a decoded file as a collection of named tables.

use grib2_parser::FieldRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

use crate::build::build_table;
use crate::descriptor::OpenDescriptor;
use crate::error::{CubeError, Result};
use crate::split::split_records;
use crate::table::Table;

/// How a file is turned into tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OpenMode {
    /// One table per descriptor; failing descriptors are skipped
    List { descriptors: Vec<OpenDescriptor> },
    /// One table for the whole file, split automatically if that fails
    Single {
        #[serde(default)]
        descriptor: OpenDescriptor,
    },
}

impl Default for OpenMode {
    fn default() -> Self {
        OpenMode::Single {
            descriptor: OpenDescriptor::default(),
        }
    }
}

impl OpenMode {
    pub fn validate(&self) -> Result<()> {
        match self {
            OpenMode::List { descriptors } => {
                for (index, descriptor) in descriptors.iter().enumerate() {
                    descriptor.validate().map_err(|e| with_index(index, e))?;
                }
                Ok(())
            }
            OpenMode::Single { descriptor } => descriptor.validate(),
        }
    }
}

/// Ordered output name → table mapping with unique names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableCollection {
    entries: Vec<(String, Table)>,
}

impl TableCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: String, table: Table) -> Result<()> {
        if self.get(&key).is_some() {
            return Err(CubeError::DuplicateKey(key));
        }
        self.entries.push((key, table));
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Table> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Table)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&str, &mut Table)> {
        self.entries.iter_mut().map(|(k, t)| (k.as_str(), t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for TableCollection {
    type Item = (String, Table);
    type IntoIter = std::vec::IntoIter<(String, Table)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// What happened to one descriptor.
#[derive(Debug, Clone, PartialEq)]
pub enum DescriptorOutcome {
    Opened { index: usize, key: String },
    Failed { index: usize, key: String, error: CubeError },
}

impl DescriptorOutcome {
    pub fn key(&self) -> &str {
        match self {
            DescriptorOutcome::Opened { key, .. } | DescriptorOutcome::Failed { key, .. } => key,
        }
    }

    pub fn is_opened(&self) -> bool {
        matches!(self, DescriptorOutcome::Opened { .. })
    }
}

/// Tables produced from one file plus the outcome of every attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenReport {
    pub tables: TableCollection,
    pub outcomes: Vec<DescriptorOutcome>,
    /// The single-mode attempt failed and the splitter produced the tables
    pub fallback_used: bool,
}

impl OpenReport {
    pub fn failures(&self) -> impl Iterator<Item = &DescriptorOutcome> {
        self.outcomes.iter().filter(|o| !o.is_opened())
    }
}

/// Builds table collections named after a base name (usually the input file stem).
#[derive(Debug, Clone)]
pub struct HypercubeOpener {
    base_name: String,
}

impl HypercubeOpener {
    pub fn new(base_name: impl Into<String>) -> Self {
        Self {
            base_name: base_name.into(),
        }
    }

    pub fn base_name(&self) -> &str {
        &self.base_name
    }

    pub fn open(&self, records: &[FieldRecord], mode: &OpenMode) -> Result<OpenReport> {
        match mode {
            OpenMode::List { descriptors } => self.open_descriptors(records, descriptors),
            OpenMode::Single { descriptor } => self.open_single(records, descriptor),
        }
    }

    /// Build one table per descriptor, keyed `{base}_{tag or index}`.
    ///
    /// A descriptor that fails is recorded in the report and skipped.
    pub fn open_descriptors(
        &self,
        records: &[FieldRecord],
        descriptors: &[OpenDescriptor],
    ) -> Result<OpenReport> {
        let mut keys = BTreeSet::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            descriptor.validate().map_err(|e| with_index(index, e))?;
            let key = self.key_for(&descriptor.label(index));
            if !keys.insert(key.clone()) {
                return Err(CubeError::DuplicateKey(key));
            }
        }

        let mut tables = TableCollection::new();
        let mut outcomes = Vec::with_capacity(descriptors.len());
        for (index, descriptor) in descriptors.iter().enumerate() {
            let key = self.key_for(&descriptor.label(index));
            match build_table(records, descriptor) {
                Ok(table) => {
                    debug!(key = %key, variables = table.data_vars().len(), "Opened descriptor");
                    tables.insert(key.clone(), table)?;
                    outcomes.push(DescriptorOutcome::Opened { index, key });
                }
                Err(source) => {
                    warn!(key = %key, error = %source, "Descriptor failed to open, skipping");
                    outcomes.push(DescriptorOutcome::Failed {
                        index,
                        key: key.clone(),
                        error: CubeError::OpenFailure {
                            descriptor: key,
                            source,
                        },
                    });
                }
            }
        }

        if tables.is_empty() && !descriptors.is_empty() {
            warn!(
                base_name = %self.base_name,
                descriptors = descriptors.len(),
                "Every descriptor failed, no tables opened"
            );
        }

        Ok(OpenReport {
            tables,
            outcomes,
            fallback_used: false,
        })
    }

    /// Build the whole file as one table keyed `{base}`, falling back to the
    /// automatic splitter (keys `{base}_{i}`) when that fails.
    ///
    /// Fallback keys follow the splitter's return order and are labels only.
    pub fn open_single(&self, records: &[FieldRecord], descriptor: &OpenDescriptor) -> Result<OpenReport> {
        descriptor.validate()?;

        let first_attempt = match build_table(records, descriptor) {
            Ok(table) => {
                let mut tables = TableCollection::new();
                tables.insert(self.base_name.clone(), table)?;
                return Ok(OpenReport {
                    tables,
                    outcomes: vec![DescriptorOutcome::Opened {
                        index: 0,
                        key: self.base_name.clone(),
                    }],
                    fallback_used: false,
                });
            }
            Err(source) => source,
        };

        info!(
            base_name = %self.base_name,
            reason = %first_attempt,
            "Records do not form one hypercube, splitting"
        );
        let pieces = split_records(records, descriptor).map_err(|source| CubeError::FallbackFailure {
            base_name: self.base_name.clone(),
            source,
        })?;

        let mut tables = TableCollection::new();
        for (i, table) in pieces.into_iter().enumerate() {
            tables.insert(self.key_for(&i.to_string()), table)?;
        }
        info!(base_name = %self.base_name, tables = tables.len(), "Split into tables");

        Ok(OpenReport {
            tables,
            outcomes: vec![DescriptorOutcome::Failed {
                index: 0,
                key: self.base_name.clone(),
                error: CubeError::OpenFailure {
                    descriptor: self.base_name.clone(),
                    source: first_attempt,
                },
            }],
            fallback_used: true,
        })
    }

    fn key_for(&self, label: &str) -> String {
        format!("{}_{}", self.base_name, label)
    }
}

fn with_index(index: usize, error: CubeError) -> CubeError {
    match error {
        CubeError::InvalidDescriptor(msg) => {
            CubeError::InvalidDescriptor(format!("descriptor {}: {}", index, msg))
        }
        other => other,
    }
}
