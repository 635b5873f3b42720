//! Schema normalization: collision-safe renames and dimension expansion.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeSet, VecDeque};
use std::fmt;
use tracing::debug;

use crate::error::{CubeError, Result};
use crate::table::Table;

/// Ordered old name → new name mapping.
///
/// Serialized as a YAML/JSON mapping; entry order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameMap {
    entries: Vec<(String, String)>,
}

impl RenameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the entry for `old`, keeping its original position.
    pub fn insert(&mut self, old: &str, new: &str) {
        match self.entries.iter_mut().find(|(o, _)| o == old) {
            Some(entry) => entry.1 = new.to_string(),
            None => self.entries.push((old.to_string(), new.to_string())),
        }
    }

    pub fn with(mut self, old: &str, new: &str) -> Self {
        self.insert(old, new);
        self
    }

    pub fn get(&self, old: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(o, _)| o == old)
            .map(|(_, n)| n.as_str())
    }

    pub fn entries(&self) -> &[(String, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, &'a str)> for RenameMap {
    fn from_iter<I: IntoIterator<Item = (&'a str, &'a str)>>(iter: I) -> Self {
        let mut map = RenameMap::new();
        for (old, new) in iter {
            map.insert(old, new);
        }
        map
    }
}

impl Serialize for RenameMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (old, new) in &self.entries {
            map.serialize_entry(old, new)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RenameMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct RenameMapVisitor;

        impl<'de> Visitor<'de> for RenameMapVisitor {
            type Value = RenameMap;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a mapping of old names to new names")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<RenameMap, A::Error> {
                let mut map = RenameMap::new();
                while let Some((old, new)) = access.next_entry::<String, String>()? {
                    map.insert(&old, &new);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(RenameMapVisitor)
    }
}

/// Renames and dimension expansion applied to every table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizeSpec {
    pub rename: RenameMap,
    pub expand_dims: Vec<String>,
}

impl NormalizeSpec {
    /// Names used by the Climate Data Store NetCDF output.
    pub fn cds_style() -> Self {
        let rename = [
            ("time", "forecast_reference_time"),
            ("step", "forecast_period"),
            ("isobaricInhPa", "pressure_level"),
            ("hybrid", "model_level"),
            ("depthBelowLandLayer", "soil_layer"),
        ]
        .into_iter()
        .collect();
        Self {
            rename,
            expand_dims: vec![
                "forecast_reference_time".to_string(),
                "forecast_period".to_string(),
            ],
        }
    }

    /// Rename, then expand.
    pub fn apply(&self, table: &mut Table) -> Result<()> {
        rename(table, &self.rename)?;
        expand_dims(table, &self.expand_dims)
    }
}

/// Resolve the order renames must run in.
///
/// Entries that do not apply are dropped. Entries whose target is free go
/// first (latest first), entries whose target is taken go last in map order.
/// Each pass over the pending entries runs those whose target is free on the
/// simulated names, so chains of any length resolve. When a pass makes no
/// progress the first pending entry is a [`CubeError::NamingConflict`]; only
/// cycles and renames onto names nothing vacates end up there.
pub fn plan_renames(table: &Table, map: &RenameMap) -> Result<Vec<(String, String)>> {
    let mut pending: VecDeque<(String, String)> = VecDeque::new();
    let mut deferred = Vec::new();
    for (old, new) in map.entries() {
        if old == new || !table.contains(old) {
            continue;
        }
        if table.contains(new) {
            deferred.push((old.clone(), new.clone()));
        } else {
            pending.push_front((old.clone(), new.clone()));
        }
    }
    pending.extend(deferred);

    let mut names: BTreeSet<String> = table.names();
    let mut order = Vec::with_capacity(pending.len());
    while !pending.is_empty() {
        let before = pending.len();
        let mut blocked = VecDeque::new();
        for (old, new) in pending {
            if names.contains(&new) {
                blocked.push_back((old, new));
            } else {
                names.remove(&old);
                names.insert(new.clone());
                order.push((old, new));
            }
        }
        if blocked.len() == before {
            if let Some((from, to)) = blocked.pop_front() {
                return Err(CubeError::NamingConflict { from, to });
            }
        }
        pending = blocked;
    }
    Ok(order)
}

/// Apply a rename map. On conflict the table is left untouched.
pub fn rename(table: &mut Table, map: &RenameMap) -> Result<()> {
    let order = plan_renames(table, map)?;
    for (old, new) in &order {
        table.rename(old, new)?;
        debug!(from = %old, to = %new, "Renamed field");
    }
    Ok(())
}

/// Make sure every coordinate named in `names`, and every coordinate that
/// already is a dimension, is a dimension. Scalar coordinates become length-1
/// axes at their position among those coordinates.
pub fn expand_dims(table: &mut Table, names: &[String]) -> Result<()> {
    let required: Vec<String> = table
        .coords()
        .iter()
        .map(|(name, _)| name)
        .filter(|name| names.contains(name) || table.is_dim(name))
        .cloned()
        .collect();

    for (axis, name) in required.iter().enumerate() {
        if !table.is_dim(name) {
            table.expand_dim(name, axis)?;
            debug!(dim = %name, axis = axis, "Expanded dimension");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{ArrayData, Variable};
    use grib2_parser::MetaValue;

    fn table_with(names: &[&str]) -> Table {
        let mut table = Table::new();
        for (i, name) in names.iter().enumerate() {
            table
                .add_data_var(name, Variable::scalar(&MetaValue::Int(i as i64)))
                .unwrap();
        }
        table
    }

    #[test]
    fn test_plan_puts_free_targets_first() {
        let table = table_with(&["A", "B"]);
        let map: RenameMap = [("A", "B"), ("B", "C")].into_iter().collect();
        let plan = plan_renames(&table, &map).unwrap();
        assert_eq!(
            plan,
            vec![("B".to_string(), "C".to_string()), ("A".to_string(), "B".to_string())]
        );
    }

    #[test]
    fn test_plan_skips_absent_and_identity() {
        let table = table_with(&["A"]);
        let map: RenameMap = [("A", "A"), ("Z", "Y")].into_iter().collect();
        assert!(plan_renames(&table, &map).unwrap().is_empty());
    }

    #[test]
    fn test_cycle_is_conflict() {
        let mut table = table_with(&["A", "B"]);
        let before = table.clone();
        let map: RenameMap = [("A", "B"), ("B", "A")].into_iter().collect();
        assert_eq!(
            rename(&mut table, &map),
            Err(CubeError::NamingConflict {
                from: "A".into(),
                to: "B".into()
            })
        );
        assert_eq!(table, before);
    }

    #[test]
    fn test_plan_resolves_long_chain() {
        let mut table = table_with(&["A", "B", "C"]);
        let map: RenameMap = [("A", "B"), ("B", "C"), ("C", "D")].into_iter().collect();
        let plan = plan_renames(&table, &map).unwrap();
        assert_eq!(
            plan,
            vec![
                ("C".to_string(), "D".to_string()),
                ("B".to_string(), "C".to_string()),
                ("A".to_string(), "B".to_string()),
            ]
        );

        rename(&mut table, &map).unwrap();
        assert_eq!(table.data_var("B"), Some(&Variable::scalar(&MetaValue::Int(0))));
        assert_eq!(table.data_var("D"), Some(&Variable::scalar(&MetaValue::Int(2))));
        assert!(table.data_var("A").is_none());
    }

    #[test]
    fn test_shared_target_is_conflict() {
        let table = table_with(&["A", "B"]);
        let map: RenameMap = [("A", "X"), ("B", "X")].into_iter().collect();
        assert_eq!(
            plan_renames(&table, &map),
            Err(CubeError::NamingConflict {
                from: "A".into(),
                to: "X".into()
            })
        );
    }

    #[test]
    fn test_rename_map_keeps_yaml_order() {
        let map: RenameMap = serde_yaml::from_str("z: a\nb: c\na: z\n").unwrap();
        let olds: Vec<&str> = map.entries().iter().map(|(o, _)| o.as_str()).collect();
        assert_eq!(olds, vec!["z", "b", "a"]);
        assert_eq!(map.get("b"), Some("c"));

        let yaml = serde_yaml::to_string(&map).unwrap();
        let back: RenameMap = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_expand_dims_orders_axes() {
        let mut table = Table::new();
        table.add_dim("values", 2).unwrap();
        table.add_coord("time", Variable::scalar(&MetaValue::Int(0))).unwrap();
        table.add_coord("step", Variable::scalar(&MetaValue::Int(6))).unwrap();
        table
            .add_coord("values", Variable::new(vec!["values".into()], ArrayData::I64(vec![0, 1])))
            .unwrap();
        table
            .add_data_var("t", Variable::new(vec!["values".into()], ArrayData::F32(vec![1.0, 2.0])))
            .unwrap();

        let names = vec!["step".to_string(), "time".to_string(), "absent".to_string()];
        expand_dims(&mut table, &names).unwrap();

        assert_eq!(table.data_var("t").unwrap().dims, vec!["time", "step", "values"]);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_cds_style_spec() {
        let spec = NormalizeSpec::cds_style();
        assert_eq!(spec.rename.get("isobaricInhPa"), Some("pressure_level"));
        assert_eq!(spec.rename.len(), 5);
    }
}
