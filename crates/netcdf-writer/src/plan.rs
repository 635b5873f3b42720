//! Write planning: every check that can fail before a file is created.

use hypercube::{ArrayData, Table};

use crate::error::{WriteError, WriteResult};
use crate::policy::EncodingPolicy;

/// How one variable will be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariablePlan {
    pub name: String,
    pub is_coordinate: bool,
    /// `(deflate level, shuffle)` when compressed
    pub compression: Option<(i32, bool)>,
}

/// Storage plan for one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritePlan {
    pub variables: Vec<VariablePlan>,
}

impl WritePlan {
    /// Validate `table` and decide the encoding of each variable.
    ///
    /// The policy applies to every data variable with at least one dimension
    /// (scalars cannot be chunked). Coordinates are stored uncompressed.
    pub fn new(table: &Table, policy: &EncodingPolicy) -> WriteResult<Self> {
        policy.validate()?;
        table
            .validate()
            .map_err(|e| WriteError::InvalidTable(e.to_string()))?;

        let mut variables = Vec::new();
        for (name, var) in table.coords() {
            if matches!(var.data, ArrayData::Str(_)) && var.dims.len() > 1 {
                return Err(WriteError::UnsupportedType {
                    name: name.clone(),
                    dtype: format!("{}-d string", var.dims.len()),
                });
            }
            variables.push(VariablePlan {
                name: name.clone(),
                is_coordinate: true,
                compression: None,
            });
        }
        for (name, var) in table.data_vars() {
            if matches!(var.data, ArrayData::Str(_)) {
                return Err(WriteError::UnsupportedType {
                    name: name.clone(),
                    dtype: var.data.dtype().to_string(),
                });
            }
            let compression = if var.dims.is_empty() {
                None
            } else {
                policy.compression()
            };
            variables.push(VariablePlan {
                name: name.clone(),
                is_coordinate: false,
                compression,
            });
        }

        Ok(Self { variables })
    }

    /// Names of the variables that will be compressed.
    pub fn compressed(&self) -> Vec<String> {
        self.variables
            .iter()
            .filter(|v| v.compression.is_some())
            .map(|v| v.name.clone())
            .collect()
    }

    pub fn data_variables(&self) -> impl Iterator<Item = &VariablePlan> {
        self.variables.iter().filter(|v| !v.is_coordinate)
    }
}
