//! In-memory labeled tables.
//!
//! A [`Table`] is an ordered set of named dimensions, coordinate variables,
//! data variables and global attributes. Data is stored flat, row-major in
//! the order of each variable's `dims`, so inserting or removing a length-1
//! axis never moves any value.

use grib2_parser::MetaValue;
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{OpenError, TableError};

/// Attribute map shared by variables and tables.
pub type Attributes = BTreeMap<String, MetaValue>;

/// Typed flat array storage.
///
/// Equality is bitwise for floats so NaN-filled arrays compare equal to
/// themselves.
#[derive(Debug, Clone)]
pub enum ArrayData {
    F32(Vec<f32>),
    F64(Vec<f64>),
    I64(Vec<i64>),
    Str(Vec<String>),
}

impl ArrayData {
    pub fn len(&self) -> usize {
        match self {
            ArrayData::F32(v) => v.len(),
            ArrayData::F64(v) => v.len(),
            ArrayData::I64(v) => v.len(),
            ArrayData::Str(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Type name as it appears in error messages.
    pub fn dtype(&self) -> &'static str {
        match self {
            ArrayData::F32(_) => "float32",
            ArrayData::F64(_) => "float64",
            ArrayData::I64(_) => "int64",
            ArrayData::Str(_) => "string",
        }
    }

    /// Pack metadata values into the narrowest array that holds them all:
    /// all-integer → `I64`, all-numeric → `F64`, otherwise `Str`.
    pub fn from_meta_values(values: &[MetaValue]) -> Self {
        if values.iter().all(|v| matches!(v, MetaValue::Int(_))) {
            ArrayData::I64(values.iter().filter_map(|v| v.as_i64()).collect())
        } else if values.iter().all(|v| v.is_numeric()) {
            ArrayData::F64(values.iter().filter_map(|v| v.as_f64()).collect())
        } else {
            ArrayData::Str(values.iter().map(|v| v.to_string()).collect())
        }
    }
}

impl PartialEq for ArrayData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ArrayData::F32(a), ArrayData::F32(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ArrayData::F64(a), ArrayData::F64(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
            }
            (ArrayData::I64(a), ArrayData::I64(b)) => a == b,
            (ArrayData::Str(a), ArrayData::Str(b)) => a == b,
            _ => false,
        }
    }
}

/// A named-dimension array with attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub dims: Vec<String>,
    pub data: ArrayData,
    pub attrs: Attributes,
}

impl Variable {
    pub fn new(dims: Vec<String>, data: ArrayData) -> Self {
        Self {
            dims,
            data,
            attrs: Attributes::new(),
        }
    }

    /// Zero-dimensional variable holding one value.
    pub fn scalar(value: &MetaValue) -> Self {
        Self::new(Vec::new(), ArrayData::from_meta_values(std::slice::from_ref(value)))
    }

    pub fn with_attr(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.attrs.insert(key.to_string(), value.into());
        self
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }
}

/// Ordered collection of dimensions, coordinates and data variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    dims: Vec<(String, usize)>,
    coords: Vec<(String, Variable)>,
    data_vars: Vec<(String, Variable)>,
    pub attrs: Attributes,
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dims(&self) -> &[(String, usize)] {
        &self.dims
    }

    pub fn dim_len(&self, name: &str) -> Option<usize> {
        self.dims.iter().find(|(n, _)| n == name).map(|(_, len)| *len)
    }

    pub fn is_dim(&self, name: &str) -> bool {
        self.dim_len(name).is_some()
    }

    pub fn coords(&self) -> &[(String, Variable)] {
        &self.coords
    }

    pub fn coord(&self, name: &str) -> Option<&Variable> {
        self.coords.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn data_vars(&self) -> &[(String, Variable)] {
        &self.data_vars
    }

    pub fn data_var(&self, name: &str) -> Option<&Variable> {
        self.data_vars.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Coordinate or data variable by name.
    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.coord(name).or_else(|| self.data_var(name))
    }

    /// True when `name` is used by a dimension, a coordinate or a data variable.
    pub fn contains(&self, name: &str) -> bool {
        self.is_dim(name) || self.variable(name).is_some()
    }

    /// Every name in use.
    pub fn names(&self) -> BTreeSet<String> {
        self.dims
            .iter()
            .map(|(n, _)| n)
            .chain(self.coords.iter().map(|(n, _)| n))
            .chain(self.data_vars.iter().map(|(n, _)| n))
            .cloned()
            .collect()
    }

    /// Register a dimension. Re-adding an existing one with the same length is a no-op.
    pub fn add_dim(&mut self, name: &str, len: usize) -> Result<(), TableError> {
        match self.dim_len(name) {
            Some(existing) if existing == len => Ok(()),
            Some(existing) => Err(TableError::DimensionMismatch {
                name: name.to_string(),
                existing,
                requested: len,
            }),
            None => {
                self.dims.push((name.to_string(), len));
                Ok(())
            }
        }
    }

    pub fn add_coord(&mut self, name: &str, var: Variable) -> Result<(), TableError> {
        self.check_new_variable(name, &var)?;
        self.coords.push((name.to_string(), var));
        Ok(())
    }

    pub fn add_data_var(&mut self, name: &str, var: Variable) -> Result<(), TableError> {
        self.check_new_variable(name, &var)?;
        self.data_vars.push((name.to_string(), var));
        Ok(())
    }

    fn check_new_variable(&self, name: &str, var: &Variable) -> Result<(), TableError> {
        if self.variable(name).is_some() {
            return Err(TableError::AlreadyExists(name.to_string()));
        }
        self.check_shape(name, var)
    }

    fn check_shape(&self, name: &str, var: &Variable) -> Result<(), TableError> {
        let mut expected = 1usize;
        for dim in &var.dims {
            expected *= self
                .dim_len(dim)
                .ok_or_else(|| TableError::NotFound(dim.clone()))?;
        }
        if expected != var.data.len() {
            return Err(TableError::ShapeMismatch {
                name: name.to_string(),
                expected,
                actual: var.data.len(),
            });
        }
        Ok(())
    }

    /// Check the hyper-rectangle invariant for every variable.
    pub fn validate(&self) -> Result<(), TableError> {
        for (name, var) in self.coords.iter().chain(&self.data_vars) {
            self.check_shape(name, var)?;
        }
        Ok(())
    }

    /// Rename one field atomically: the variable and the dimension called
    /// `old` both take the name `new`, and every dimension reference follows.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<(), TableError> {
        if !self.contains(old) {
            return Err(TableError::NotFound(old.to_string()));
        }
        if self.contains(new) {
            return Err(TableError::AlreadyExists(new.to_string()));
        }

        for (name, _) in self.dims.iter_mut() {
            if name == old {
                *name = new.to_string();
            }
        }
        for (name, var) in self.coords.iter_mut().chain(self.data_vars.iter_mut()) {
            if name == old {
                *name = new.to_string();
            }
            for dim in var.dims.iter_mut() {
                if dim == old {
                    *dim = new.to_string();
                }
            }
        }
        Ok(())
    }

    /// Promote the scalar coordinate `name` to a length-1 dimension at `axis`.
    ///
    /// The axis is clamped to the rank of each data variable.
    pub fn expand_dim(&mut self, name: &str, axis: usize) -> Result<(), TableError> {
        if self.is_dim(name) {
            return Err(TableError::AlreadyExists(name.to_string()));
        }
        let coord = self
            .coords
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;
        if !coord.is_scalar() {
            return Err(TableError::NotScalar(name.to_string()));
        }
        coord.dims = vec![name.to_string()];

        let pos = axis.min(self.dims.len());
        self.dims.insert(pos, (name.to_string(), 1));
        for (_, var) in self.data_vars.iter_mut() {
            let pos = axis.min(var.dims.len());
            var.dims.insert(pos, name.to_string());
        }
        Ok(())
    }

    /// Turn every length-1 dimension that carries a coordinate into a scalar
    /// coordinate, except the dimensions listed in `keep`.
    pub fn squeeze(&mut self, keep: &[&str]) {
        let squeezable: Vec<String> = self
            .dims
            .iter()
            .filter(|(name, len)| {
                *len == 1 && !keep.contains(&name.as_str()) && self.coord(name).is_some()
            })
            .map(|(name, _)| name.clone())
            .collect();

        for dim in &squeezable {
            self.dims.retain(|(name, _)| name != dim);
            for (_, var) in self.coords.iter_mut().chain(self.data_vars.iter_mut()) {
                var.dims.retain(|d| d != dim);
            }
        }
    }

    /// Check that `other` can be merged without redefining anything.
    pub fn check_merge(&self, other: &Table) -> Result<(), OpenError> {
        let culprit = other
            .data_vars
            .first()
            .map(|(name, _)| name.clone())
            .unwrap_or_default();
        let conflict = |name: &str| OpenError::CoordinateConflict {
            name: name.to_string(),
            variable: culprit.clone(),
        };

        for (name, len) in &other.dims {
            if matches!(self.dim_len(name), Some(existing) if existing != *len) {
                return Err(conflict(name));
            }
        }
        for (name, var) in &other.coords {
            if self.data_var(name).is_some() {
                return Err(conflict(name));
            }
            if matches!(self.coord(name), Some(existing) if existing.dims != var.dims || existing.data != var.data)
            {
                return Err(conflict(name));
            }
        }
        for (name, _) in &other.data_vars {
            if self.variable(name).is_some() {
                return Err(conflict(name));
            }
        }
        Ok(())
    }

    /// Merge `other` into this table. On conflict nothing is changed.
    ///
    /// Global attributes already present keep their value.
    pub fn merge(&mut self, other: Table) -> Result<(), OpenError> {
        self.check_merge(&other)?;

        for (name, len) in other.dims {
            self.add_dim(&name, len)?;
        }
        for (name, var) in other.coords {
            if self.coord(&name).is_none() {
                self.add_coord(&name, var)?;
            }
        }
        for (name, var) in other.data_vars {
            self.add_data_var(&name, var)?;
        }
        for (key, value) in other.attrs {
            self.attrs.entry(key).or_insert(value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> Table {
        let mut table = Table::new();
        table.add_dim("latitude", 2).unwrap();
        table.add_dim("longitude", 3).unwrap();
        table
            .add_coord("latitude", Variable::new(vec!["latitude".into()], ArrayData::F64(vec![10.0, 0.0])))
            .unwrap();
        table
            .add_coord(
                "longitude",
                Variable::new(vec!["longitude".into()], ArrayData::F64(vec![0.0, 1.0, 2.0])),
            )
            .unwrap();
        table.add_coord("time", Variable::scalar(&MetaValue::Int(0))).unwrap();
        table
            .add_data_var(
                "t",
                Variable::new(
                    vec!["latitude".into(), "longitude".into()],
                    ArrayData::F32(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]),
                ),
            )
            .unwrap();
        table
    }

    #[test]
    fn test_shape_is_checked() {
        let mut table = sample_table();
        let err = table
            .add_data_var("bad", Variable::new(vec!["latitude".into()], ArrayData::F32(vec![1.0])))
            .unwrap_err();
        assert!(matches!(err, TableError::ShapeMismatch { .. }));

        let err = table
            .add_data_var("orphan", Variable::new(vec!["level".into()], ArrayData::F32(vec![1.0])))
            .unwrap_err();
        assert_eq!(err, TableError::NotFound("level".into()));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_rename_updates_dims_and_references() {
        let mut table = sample_table();
        table.rename("latitude", "lat").unwrap();

        assert!(table.is_dim("lat"));
        assert!(!table.contains("latitude"));
        assert_eq!(table.coord("lat").unwrap().dims, vec!["lat".to_string()]);
        assert_eq!(
            table.data_var("t").unwrap().dims,
            vec!["lat".to_string(), "longitude".to_string()]
        );
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_rename_refuses_existing_target() {
        let mut table = sample_table();
        let before = table.clone();
        assert_eq!(
            table.rename("time", "t"),
            Err(TableError::AlreadyExists("t".into()))
        );
        assert_eq!(table, before);
        assert_eq!(table.rename("nope", "x"), Err(TableError::NotFound("nope".into())));
    }

    #[test]
    fn test_expand_dim_inserts_axis() {
        let mut table = sample_table();
        table.expand_dim("time", 0).unwrap();

        assert_eq!(table.dims()[0], ("time".to_string(), 1));
        assert_eq!(
            table.data_var("t").unwrap().dims,
            vec!["time".to_string(), "latitude".to_string(), "longitude".to_string()]
        );
        assert_eq!(table.coord("time").unwrap().dims, vec!["time".to_string()]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_expand_dim_requires_scalar() {
        let mut table = sample_table();
        assert_eq!(
            table.expand_dim("latitude", 0),
            Err(TableError::AlreadyExists("latitude".into()))
        );
        assert_eq!(table.expand_dim("missing", 0), Err(TableError::NotFound("missing".into())));
    }

    #[test]
    fn test_squeeze_round_trips_expand() {
        let mut table = sample_table();
        let original = table.clone();
        table.expand_dim("time", 0).unwrap();
        table.squeeze(&["latitude", "longitude"]);
        assert_eq!(table, original);
    }

    #[test]
    fn test_merge_conflict_leaves_table_unchanged() {
        let mut table = sample_table();
        let before = table.clone();

        let mut other = Table::new();
        other.add_coord("time", Variable::scalar(&MetaValue::Int(3600))).unwrap();
        other.add_data_var("u", Variable::scalar(&MetaValue::Float(1.0))).unwrap();

        let err = table.merge(other).unwrap_err();
        assert_eq!(
            err,
            OpenError::CoordinateConflict {
                name: "time".into(),
                variable: "u".into()
            }
        );
        assert_eq!(table, before);
    }

    #[test]
    fn test_merge_shares_identical_coords() {
        let mut table = sample_table();
        let mut other = Table::new();
        other.add_coord("time", Variable::scalar(&MetaValue::Int(0))).unwrap();
        other.add_data_var("u", Variable::scalar(&MetaValue::Float(1.0))).unwrap();

        table.merge(other).unwrap();
        assert_eq!(table.coords().len(), 3);
        assert!(table.data_var("u").is_some());
    }

    #[test]
    fn test_array_nan_equality() {
        assert_eq!(ArrayData::F32(vec![f32::NAN]), ArrayData::F32(vec![f32::NAN]));
        assert_ne!(ArrayData::F32(vec![1.0]), ArrayData::F64(vec![1.0]));
    }

    #[test]
    fn test_from_meta_values() {
        let ints = ArrayData::from_meta_values(&[MetaValue::Int(1), MetaValue::Int(2)]);
        assert_eq!(ints, ArrayData::I64(vec![1, 2]));
        let mixed = ArrayData::from_meta_values(&[MetaValue::Int(1), MetaValue::Float(2.5)]);
        assert_eq!(mixed, ArrayData::F64(vec![1.0, 2.5]));
        let strs = ArrayData::from_meta_values(&[MetaValue::Str("a".into()), MetaValue::Int(2)]);
        assert_eq!(strs, ArrayData::Str(vec!["a".into(), "2".into()]));
    }
}
