//! Decoded field records.
//!
//! A [`FieldRecord`] is one GRIB2 submessage flattened into three parts:
//! metadata keys named the way ecCodes names them (`shortName`,
//! `typeOfLevel`, `step`, ...), the horizontal grid, and the unpacked values.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar metadata value.
///
/// Numeric values order numerically across `Int` and `Float`; strings sort
/// after all numbers. `Float` equality is bitwise, so `NaN == NaN`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetaValue {
    Int(i64),
    Float(f64),
    Str(String),
}

impl MetaValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            MetaValue::Int(v) => Some(*v as f64),
            MetaValue::Float(v) => Some(*v),
            MetaValue::Str(_) => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            MetaValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            MetaValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        !matches!(self, MetaValue::Str(_))
    }

    fn variant_rank(&self) -> u8 {
        match self {
            MetaValue::Int(_) => 0,
            MetaValue::Float(_) => 1,
            MetaValue::Str(_) => 2,
        }
    }
}

impl PartialEq for MetaValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (MetaValue::Int(a), MetaValue::Int(b)) => a == b,
            (MetaValue::Float(a), MetaValue::Float(b)) => a.to_bits() == b.to_bits(),
            (MetaValue::Str(a), MetaValue::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for MetaValue {}

impl Hash for MetaValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.variant_rank().hash(state);
        match self {
            MetaValue::Int(v) => v.hash(state),
            MetaValue::Float(v) => v.to_bits().hash(state),
            MetaValue::Str(s) => s.hash(state),
        }
    }
}

impl Ord for MetaValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (MetaValue::Int(a), MetaValue::Int(b)) => a.cmp(b),
            (MetaValue::Str(a), MetaValue::Str(b)) => a.cmp(b),
            (MetaValue::Str(_), _) => Ordering::Greater,
            (_, MetaValue::Str(_)) => Ordering::Less,
            (a, b) => {
                // Mixed Int/Float: numeric first, variant breaks ties
                let (x, y) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
                x.total_cmp(&y)
                    .then_with(|| a.variant_rank().cmp(&b.variant_rank()))
            }
        }
    }
}

impl PartialOrd for MetaValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for MetaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaValue::Int(v) => write!(f, "{}", v),
            MetaValue::Float(v) => write!(f, "{}", v),
            MetaValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for MetaValue {
    fn from(v: i64) -> Self {
        MetaValue::Int(v)
    }
}

impl From<i32> for MetaValue {
    fn from(v: i32) -> Self {
        MetaValue::Int(v as i64)
    }
}

impl From<u32> for MetaValue {
    fn from(v: u32) -> Self {
        MetaValue::Int(v as i64)
    }
}

impl From<f64> for MetaValue {
    fn from(v: f64) -> Self {
        MetaValue::Float(v)
    }
}

impl From<&str> for MetaValue {
    fn from(v: &str) -> Self {
        MetaValue::Str(v.to_string())
    }
}

impl From<String> for MetaValue {
    fn from(v: String) -> Self {
        MetaValue::Str(v)
    }
}

/// Horizontal layout of a field.
#[derive(Debug, Clone, PartialEq)]
pub enum GridGeometry {
    /// Regular latitude/longitude grid, values stored row-major with
    /// latitude as the slow axis.
    Regular {
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    },
    /// Any other grid: one coordinate pair per point.
    Unstructured {
        latitudes: Vec<f64>,
        longitudes: Vec<f64>,
    },
}

impl GridGeometry {
    pub fn num_points(&self) -> usize {
        match self {
            GridGeometry::Regular {
                latitudes,
                longitudes,
            } => latitudes.len() * longitudes.len(),
            GridGeometry::Unstructured { latitudes, .. } => latitudes.len(),
        }
    }

    /// ecCodes-style `gridType` name.
    pub fn grid_type(&self) -> &'static str {
        match self {
            GridGeometry::Regular { .. } => "regular_ll",
            GridGeometry::Unstructured { .. } => "unstructured_grid",
        }
    }

    /// Identity of the geometry as 16 hex digits, in the spirit of ecCodes'
    /// `md5GridSection`. Equal geometries give equal fingerprints.
    pub fn fingerprint(&self) -> String {
        // 64-bit FNV-1a
        const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
        const PRIME: u64 = 0x0000_0100_0000_01b3;

        let (latitudes, longitudes) = match self {
            GridGeometry::Regular {
                latitudes,
                longitudes,
            }
            | GridGeometry::Unstructured {
                latitudes,
                longitudes,
            } => (latitudes, longitudes),
        };

        let mut hash = OFFSET;
        let mut feed = |bytes: &[u8]| {
            for byte in bytes {
                hash ^= u64::from(*byte);
                hash = hash.wrapping_mul(PRIME);
            }
        };
        feed(self.grid_type().as_bytes());
        for axis in [latitudes, longitudes] {
            feed(&(axis.len() as u64).to_le_bytes());
            for v in axis {
                feed(&v.to_bits().to_le_bytes());
            }
        }
        format!("{:016x}", hash)
    }

    /// Dimension names and lengths of the grid, slowest first.
    pub fn dims(&self) -> Vec<(&'static str, usize)> {
        match self {
            GridGeometry::Regular {
                latitudes,
                longitudes,
            } => vec![("latitude", latitudes.len()), ("longitude", longitudes.len())],
            GridGeometry::Unstructured { latitudes, .. } => vec![("values", latitudes.len())],
        }
    }
}

/// One decoded GRIB field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldRecord {
    pub metadata: BTreeMap<String, MetaValue>,
    pub grid: GridGeometry,
    /// Unpacked values, NaN where the bitmap marks a point missing
    pub values: Vec<f32>,
}

impl FieldRecord {
    pub fn new(grid: GridGeometry, values: Vec<f32>) -> Self {
        Self {
            metadata: BTreeMap::new(),
            grid,
            values,
        }
    }

    /// Builder-style metadata setter.
    pub fn with(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<MetaValue>) {
        self.metadata.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&MetaValue> {
        self.metadata.get(key)
    }

    pub fn short_name(&self) -> Option<&str> {
        self.get("shortName").and_then(|v| v.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_ordering_across_variants() {
        let mut values = vec![
            MetaValue::Float(2.5),
            MetaValue::Str("a".into()),
            MetaValue::Int(3),
            MetaValue::Int(1),
        ];
        values.sort();
        assert_eq!(
            values,
            vec![
                MetaValue::Int(1),
                MetaValue::Float(2.5),
                MetaValue::Int(3),
                MetaValue::Str("a".into()),
            ]
        );
    }

    #[test]
    fn test_int_and_float_are_distinct() {
        assert_ne!(MetaValue::Int(1), MetaValue::Float(1.0));
        assert_ne!(
            MetaValue::Int(1).cmp(&MetaValue::Float(1.0)),
            Ordering::Equal
        );
    }

    #[test]
    fn test_nan_equals_itself() {
        assert_eq!(MetaValue::Float(f64::NAN), MetaValue::Float(f64::NAN));
    }

    #[test]
    fn test_untagged_yaml() {
        let v: Vec<MetaValue> = serde_yaml::from_str("[oper, 130, 0.5]").unwrap();
        assert_eq!(
            v,
            vec![
                MetaValue::Str("oper".into()),
                MetaValue::Int(130),
                MetaValue::Float(0.5)
            ]
        );
    }

    #[test]
    fn test_grid_dims() {
        let grid = GridGeometry::Regular {
            latitudes: vec![10.0, 0.0],
            longitudes: vec![0.0, 1.0, 2.0],
        };
        assert_eq!(grid.num_points(), 6);
        assert_eq!(grid.dims(), vec![("latitude", 2), ("longitude", 3)]);
        assert_eq!(grid.grid_type(), "regular_ll");

        let points = GridGeometry::Unstructured {
            latitudes: vec![1.0, 2.0],
            longitudes: vec![3.0, 4.0],
        };
        assert_eq!(points.dims(), vec![("values", 2)]);
    }

    #[test]
    fn test_fingerprint_tells_grids_apart() {
        let north = GridGeometry::Regular {
            latitudes: vec![60.0, 59.0],
            longitudes: vec![0.0, 1.0],
        };
        let south = GridGeometry::Regular {
            latitudes: vec![-59.0, -60.0],
            longitudes: vec![0.0, 1.0],
        };
        let points = GridGeometry::Unstructured {
            latitudes: vec![60.0, 59.0],
            longitudes: vec![0.0, 1.0],
        };

        assert_eq!(north.fingerprint(), north.clone().fingerprint());
        assert_eq!(north.fingerprint().len(), 16);
        assert_ne!(north.fingerprint(), south.fingerprint());
        assert_ne!(north.fingerprint(), points.fingerprint());
    }

    #[test]
    fn test_record_builder() {
        let record = FieldRecord::new(
            GridGeometry::Unstructured {
                latitudes: vec![0.0],
                longitudes: vec![0.0],
            },
            vec![1.0],
        )
        .with("shortName", "2t")
        .with("step", 6);

        assert_eq!(record.short_name(), Some("2t"));
        assert_eq!(record.get("step"), Some(&MetaValue::Int(6)));
        assert_eq!(record.get("missing"), None);
    }
}
