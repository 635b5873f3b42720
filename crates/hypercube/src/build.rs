//! Strict hypercube assembly.
//!
//! Records are grouped into variables by `shortName`. Each variable must be
//! single-valued on the unique keys and must place every record on its own
//! cell of the `[header dims…, grid dims…]` cube; any violation fails the
//! whole build.

use grib2_parser::{FieldRecord, GridGeometry, MetaValue, GRID_HASH_KEY};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::descriptor::OpenDescriptor;
use crate::error::OpenError;
use crate::table::{ArrayData, Attributes, Table, Variable};

/// Keys that must take exactly one value per variable. A variable spread
/// over several grids shows up as several `gridHash` values.
pub const UNIQUE_KEYS: [&str; 7] = [
    "stream",
    "dataType",
    "typeOfLevel",
    "stepType",
    "gridType",
    "numberOfPoints",
    GRID_HASH_KEY,
];

/// Dimension names produced by grids. These are never squeezed.
pub const GRID_DIMS: [&str; 3] = ["latitude", "longitude", "values"];

/// Metadata key holding the level value.
const LEVEL_KEY: &str = "level";

/// Keys never copied into `GRIB_*` variable attributes.
const NON_ATTRIBUTE_KEYS: [&str; 3] = [LEVEL_KEY, "valid_time", GRID_HASH_KEY];

/// Build one table from every record the descriptor selects, squeezing
/// single-valued header coordinates to scalars.
pub fn build_table(records: &[FieldRecord], descriptor: &OpenDescriptor) -> Result<Table, OpenError> {
    let refs: Vec<&FieldRecord> = records.iter().collect();
    build_from_refs(&refs, descriptor, true)
}

pub(crate) fn build_from_refs(
    records: &[&FieldRecord],
    descriptor: &OpenDescriptor,
    squeeze: bool,
) -> Result<Table, OpenError> {
    let selected: Vec<&FieldRecord> = records
        .iter()
        .copied()
        .filter(|r| descriptor.matches(r))
        .collect();
    if selected.is_empty() {
        return Err(OpenError::NoMatchingRecords {
            filter: descriptor.describe_filter(),
        });
    }

    let mut groups: Vec<(String, Vec<&FieldRecord>)> = Vec::new();
    for record in &selected {
        let name = record
            .short_name()
            .ok_or_else(|| OpenError::MissingKey {
                variable: "unknown".to_string(),
                key: "shortName".to_string(),
            })?
            .to_string();
        match groups.iter_mut().find(|(n, _)| *n == name) {
            Some((_, members)) => members.push(*record),
            None => groups.push((name, vec![*record])),
        }
    }

    let mut table = Table::new();
    for (name, members) in &groups {
        let variable_table = build_variable(name, members, descriptor, squeeze)?;
        table.merge(variable_table)?;
    }
    table.attrs = table_attributes(&selected);

    debug!(
        variables = groups.len(),
        records = selected.len(),
        dims = table.dims().len(),
        "Built hypercube"
    );
    Ok(table)
}

/// One header axis: coordinate name, source metadata key and its sorted values.
struct HeaderAxis {
    name: String,
    key: String,
    values: Vec<MetaValue>,
}

fn build_variable(
    name: &str,
    records: &[&FieldRecord],
    descriptor: &OpenDescriptor,
    squeeze: bool,
) -> Result<Table, OpenError> {
    for key in UNIQUE_KEYS {
        if descriptor.is_ignored(key) {
            continue;
        }
        let values = distinct_values(name, records, key)?;
        if values.len() > 1 {
            return Err(OpenError::MultipleValues {
                variable: name.to_string(),
                key: key.to_string(),
                values,
            });
        }
    }

    let grid = &records[0].grid;
    for record in records {
        if &record.grid != grid || record.values.len() != grid.num_points() {
            return Err(OpenError::GridMismatch {
                variable: name.to_string(),
            });
        }
    }

    let mut var_attrs = Attributes::new();
    let mut axes: Vec<HeaderAxis> = Vec::new();
    let mut scalars: Vec<(String, MetaValue)> = Vec::new();
    let mut coord_order: Vec<String> = Vec::new();

    for (coord_name, key) in header_keys(records, descriptor) {
        let values = distinct_values(name, records, &key)?;
        if values.is_empty() {
            continue;
        }
        if descriptor.is_attribute(&key) {
            if values.len() > 1 {
                return Err(OpenError::MultipleValues {
                    variable: name.to_string(),
                    key,
                    values,
                });
            }
            var_attrs.insert(format!("GRIB_{}", key), values[0].clone());
        } else if squeeze && values.len() == 1 {
            coord_order.push(coord_name.clone());
            scalars.push((coord_name, values[0].clone()));
        } else {
            coord_order.push(coord_name.clone());
            let mut values = values;
            if coord_name == "isobaricInhPa" {
                values.reverse();
            }
            axes.push(HeaderAxis {
                name: coord_name,
                key,
                values,
            });
        }
    }

    let points = grid.num_points();
    let cells: usize = axes.iter().map(|a| a.values.len()).product();
    let mut data = vec![f32::NAN; cells * points];
    let mut filled = vec![false; cells];

    for record in records {
        let mut cell = 0usize;
        for axis in &axes {
            let value = record.get(&axis.key).ok_or_else(|| OpenError::MissingKey {
                variable: name.to_string(),
                key: axis.key.clone(),
            })?;
            let pos = axis
                .values
                .iter()
                .position(|v| v == value)
                .ok_or_else(|| OpenError::MissingKey {
                    variable: name.to_string(),
                    key: axis.key.clone(),
                })?;
            cell = cell * axis.values.len() + pos;
        }
        if filled[cell] {
            return Err(OpenError::DuplicateField {
                variable: name.to_string(),
                position: describe_position(record, &axes),
            });
        }
        filled[cell] = true;
        data[cell * points..(cell + 1) * points].copy_from_slice(&record.values);
    }

    let mut table = Table::new();
    for axis in &axes {
        table.add_dim(&axis.name, axis.values.len())?;
    }
    for (dim, len) in grid.dims() {
        table.add_dim(dim, len)?;
    }

    let header_names: BTreeSet<&str> = axes
        .iter()
        .map(|a| a.name.as_str())
        .chain(scalars.iter().map(|(n, _)| n.as_str()))
        .collect();

    for coord_name in &coord_order {
        let mut var = match axes.iter().find(|a| &a.name == coord_name) {
            Some(axis) => Variable::new(
                vec![axis.name.clone()],
                ArrayData::from_meta_values(&axis.values),
            ),
            None => match scalars.iter().find(|(n, _)| n == coord_name) {
                Some((_, value)) => Variable::scalar(value),
                None => continue,
            },
        };
        var.attrs = coordinate_attributes(coord_name);
        table.add_coord(coord_name, var)?;
    }

    let mut extra_keys = Vec::new();
    for (coord_key, dim) in &descriptor.extra_coords {
        if header_names.contains(coord_key.as_str()) {
            continue;
        }
        if let Some(var) = extra_coordinate(name, records, coord_key, dim, &axes, &scalars)? {
            table.add_coord(coord_key, var)?;
            extra_keys.push(coord_key.as_str());
        }
    }

    add_grid_coordinates(&mut table, grid)?;

    let skip_keys: BTreeSet<&str> = axes
        .iter()
        .map(|a| a.key.as_str())
        .chain(header_names.iter().copied())
        .collect();
    for (key, value) in constant_metadata(records) {
        if skip_keys.contains(key.as_str())
            || extra_keys.contains(&key.as_str())
            || NON_ATTRIBUTE_KEYS.contains(&key.as_str())
            || descriptor.is_ignored(&key)
        {
            continue;
        }
        var_attrs.insert(format!("GRIB_{}", key), value);
    }
    if let Some(units) = records[0].get("units") {
        var_attrs.insert("units".to_string(), units.clone());
    }
    if let Some(long_name) = records[0].get("name") {
        var_attrs.insert("long_name".to_string(), long_name.clone());
    }

    let mut dims: Vec<String> = axes.iter().map(|a| a.name.clone()).collect();
    dims.extend(grid.dims().into_iter().map(|(d, _)| d.to_string()));
    table.add_data_var(
        name,
        Variable {
            dims,
            data: ArrayData::F32(data),
            attrs: var_attrs,
        },
    )?;

    debug!(
        variable = name,
        records = records.len(),
        header_dims = axes.len(),
        "Assembled variable"
    );
    Ok(table)
}

/// Header coordinates in axis order: `number`, the time dims, then the level
/// coordinate named after the `typeOfLevel` value.
fn header_keys(records: &[&FieldRecord], descriptor: &OpenDescriptor) -> Vec<(String, String)> {
    let mut keys = vec![("number".to_string(), "number".to_string())];
    keys.extend(descriptor.time_dims.iter().map(|d| (d.clone(), d.clone())));

    let levels: BTreeSet<String> = records
        .iter()
        .filter_map(|r| r.get("typeOfLevel"))
        .map(|v| v.to_string())
        .collect();
    let level_name = if levels.len() == 1 {
        levels.into_iter().next().unwrap_or_else(|| LEVEL_KEY.to_string())
    } else {
        LEVEL_KEY.to_string()
    };
    keys.push((level_name, LEVEL_KEY.to_string()));
    keys
}

/// Sorted distinct values of `key`. A key carried by only some records is an error.
fn distinct_values(
    variable: &str,
    records: &[&FieldRecord],
    key: &str,
) -> Result<Vec<MetaValue>, OpenError> {
    let present: Vec<&MetaValue> = records.iter().filter_map(|r| r.get(key)).collect();
    if !present.is_empty() && present.len() != records.len() {
        return Err(OpenError::MissingKey {
            variable: variable.to_string(),
            key: key.to_string(),
        });
    }
    let values: BTreeSet<MetaValue> = present.into_iter().cloned().collect();
    Ok(values.into_iter().collect())
}

/// Keys carried with the same value by every record.
fn constant_metadata(records: &[&FieldRecord]) -> Vec<(String, MetaValue)> {
    records[0]
        .metadata
        .iter()
        .filter(|(key, value)| records.iter().all(|r| r.get(key) == Some(*value)))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn extra_coordinate(
    variable: &str,
    records: &[&FieldRecord],
    coord_key: &str,
    dim: &str,
    axes: &[HeaderAxis],
    scalars: &[(String, MetaValue)],
) -> Result<Option<Variable>, OpenError> {
    let mismatch = || OpenError::ExtraCoordMismatch {
        coord: coord_key.to_string(),
        dim: dim.to_string(),
    };
    let missing = || OpenError::MissingKey {
        variable: variable.to_string(),
        key: coord_key.to_string(),
    };

    if let Some(axis) = axes.iter().find(|a| a.name == dim) {
        let mut by_position: Vec<Option<MetaValue>> = vec![None; axis.values.len()];
        for record in records {
            let value = record.get(coord_key).ok_or_else(missing)?;
            let pos = record
                .get(&axis.key)
                .and_then(|k| axis.values.iter().position(|v| v == k))
                .ok_or_else(mismatch)?;
            match &by_position[pos] {
                Some(existing) if existing != value => return Err(mismatch()),
                Some(_) => {}
                None => by_position[pos] = Some(value.clone()),
            }
        }
        let values: Vec<MetaValue> = by_position.into_iter().collect::<Option<_>>().ok_or_else(mismatch)?;
        let var = Variable {
            dims: vec![dim.to_string()],
            data: ArrayData::from_meta_values(&values),
            attrs: coordinate_attributes(coord_key),
        };
        return Ok(Some(var));
    }

    if scalars.iter().any(|(n, _)| n == dim) {
        let values = distinct_values(variable, records, coord_key)?;
        return match values.as_slice() {
            [] => Err(missing()),
            [value] => {
                let mut var = Variable::scalar(value);
                var.attrs = coordinate_attributes(coord_key);
                Ok(Some(var))
            }
            _ => Err(mismatch()),
        };
    }

    Ok(None)
}

fn add_grid_coordinates(table: &mut Table, grid: &GridGeometry) -> Result<(), OpenError> {
    let (lat_dims, lon_dims, latitudes, longitudes) = match grid {
        GridGeometry::Regular {
            latitudes,
            longitudes,
        } => (["latitude"], ["longitude"], latitudes, longitudes),
        GridGeometry::Unstructured {
            latitudes,
            longitudes,
        } => (["values"], ["values"], latitudes, longitudes),
    };
    let to_dims = |dims: [&str; 1]| dims.iter().map(|d| d.to_string()).collect::<Vec<_>>();

    table.add_coord(
        "latitude",
        Variable {
            dims: to_dims(lat_dims),
            data: ArrayData::F64(latitudes.clone()),
            attrs: coordinate_attributes("latitude"),
        },
    )?;
    table.add_coord(
        "longitude",
        Variable {
            dims: to_dims(lon_dims),
            data: ArrayData::F64(longitudes.clone()),
            attrs: coordinate_attributes("longitude"),
        },
    )?;
    Ok(())
}

/// CF attributes for the well-known coordinates.
pub fn coordinate_attributes(name: &str) -> Attributes {
    let pairs: &[(&str, &str)] = match name {
        "number" => &[
            ("long_name", "ensemble member numerical id"),
            ("units", "1"),
            ("standard_name", "realization"),
        ],
        "time" | "indexing_time" => &[
            ("long_name", "initial time of forecast"),
            ("units", "seconds since 1970-01-01T00:00:00"),
            ("calendar", "proleptic_gregorian"),
            ("standard_name", "forecast_reference_time"),
        ],
        "valid_time" | "verifying_time" => &[
            ("long_name", "time"),
            ("units", "seconds since 1970-01-01T00:00:00"),
            ("calendar", "proleptic_gregorian"),
            ("standard_name", "time"),
        ],
        "step" => &[
            ("long_name", "time since forecast_reference_time"),
            ("units", "hours"),
            ("standard_name", "forecast_period"),
        ],
        "isobaricInhPa" => &[
            ("long_name", "pressure"),
            ("units", "hPa"),
            ("positive", "down"),
            ("stored_direction", "decreasing"),
            ("standard_name", "air_pressure"),
        ],
        "latitude" => &[
            ("long_name", "latitude"),
            ("units", "degrees_north"),
            ("standard_name", "latitude"),
        ],
        "longitude" => &[
            ("long_name", "longitude"),
            ("units", "degrees_east"),
            ("standard_name", "longitude"),
        ],
        _ => &[],
    };
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), MetaValue::from(*v)))
        .collect()
}

fn table_attributes(records: &[&FieldRecord]) -> Attributes {
    let mut attrs = Attributes::new();
    let first = records[0];
    if let Some(edition) = first.get("edition") {
        attrs.insert("GRIB_edition".to_string(), edition.clone());
    }
    if let Some(centre) = first.get("centre") {
        attrs.insert("GRIB_centre".to_string(), centre.clone());
        if let Some(institution) = centre.as_i64().and_then(centre_description) {
            attrs.insert("institution".to_string(), institution.into());
        }
    }
    attrs.insert("Conventions".to_string(), "CF-1.7".into());
    attrs
}

/// WMO originating centre names (common code table C-11 entries).
fn centre_description(code: i64) -> Option<&'static str> {
    let name = match code {
        7 => "US National Weather Service - NCEP",
        34 => "Japanese Meteorological Agency - Tokyo",
        54 => "Canadian Meteorological Service - Montreal",
        74 => "UK Meteorological Office - Exeter",
        78 => "Offenbach (RSMC)",
        85 => "French Weather Service - Toulouse",
        98 => "European Centre for Medium-Range Weather Forecasts",
        _ => return None,
    };
    Some(name)
}

fn describe_position(record: &FieldRecord, axes: &[HeaderAxis]) -> String {
    if axes.is_empty() {
        return "the only cell".to_string();
    }
    axes.iter()
        .map(|axis| {
            let value = record
                .get(&axis.key)
                .map(|v| v.to_string())
                .unwrap_or_default();
            format!("{}={}", axis.name, value)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Data variables' `GRIB_typeOfLevel`, used to group split results.
pub(crate) fn type_of_level(table: &Table) -> Option<String> {
    table
        .data_vars()
        .iter()
        .find_map(|(_, var)| var.attrs.get("GRIB_typeOfLevel"))
        .map(|v| v.to_string())
}

/// Distinct `shortName`s with the `paramId` that sorts them.
pub(crate) fn short_names(records: &[&FieldRecord]) -> Vec<(Option<i64>, String)> {
    let mut by_name: BTreeMap<String, Option<i64>> = BTreeMap::new();
    for record in records {
        if let Some(name) = record.short_name() {
            let param_id = record.get("paramId").and_then(|v| v.as_i64());
            by_name.entry(name.to_string()).or_insert(param_id);
        }
    }
    let mut names: Vec<(Option<i64>, String)> =
        by_name.into_iter().map(|(name, id)| (id, name)).collect();
    names.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.1.cmp(&b.1)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.1.cmp(&b.1),
    });
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> GridGeometry {
        GridGeometry::Regular {
            latitudes: vec![10.0, 0.0],
            longitudes: vec![0.0, 1.0],
        }
    }

    fn field(short_name: &str, step: i64, level: i64, fill: f32) -> FieldRecord {
        FieldRecord::new(grid(), vec![fill; 4])
            .with("shortName", short_name)
            .with("paramId", 130)
            .with("units", "K")
            .with("name", "Temperature")
            .with("typeOfLevel", "isobaricInhPa")
            .with("level", level)
            .with("stepType", "instant")
            .with("gridType", "regular_ll")
            .with("numberOfPoints", 4)
            .with("time", 0)
            .with("step", step)
            .with("centre", 98)
            .with("edition", 2)
    }

    #[test]
    fn test_builds_squeezed_cube() {
        let records = vec![
            field("t", 0, 500, 1.0),
            field("t", 0, 850, 2.0),
            field("t", 6, 500, 3.0),
            field("t", 6, 850, 4.0),
        ];
        let table = build_table(&records, &OpenDescriptor::default()).unwrap();

        let t = table.data_var("t").unwrap();
        assert_eq!(t.dims, vec!["step", "isobaricInhPa", "latitude", "longitude"]);
        assert!(table.coord("time").unwrap().is_scalar());

        // isobaricInhPa descends: 850 before 500
        assert_eq!(
            table.coord("isobaricInhPa").unwrap().data,
            ArrayData::I64(vec![850, 500])
        );
        match &t.data {
            ArrayData::F32(values) => {
                assert_eq!(&values[0..4], &[2.0f32; 4]);
                assert_eq!(&values[4..8], &[1.0f32; 4]);
                assert_eq!(&values[8..12], &[4.0f32; 4]);
            }
            other => panic!("unexpected data {:?}", other),
        }

        assert_eq!(t.attrs.get("units"), Some(&MetaValue::from("K")));
        assert_eq!(t.attrs.get("GRIB_typeOfLevel"), Some(&MetaValue::from("isobaricInhPa")));
        assert!(t.attrs.get("GRIB_step").is_none());
        assert_eq!(table.attrs.get("Conventions"), Some(&MetaValue::from("CF-1.7")));
        assert_eq!(table.attrs.get("GRIB_centre"), Some(&MetaValue::Int(98)));
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_missing_cells_are_nan() {
        let records = vec![field("t", 0, 500, 1.0), field("t", 6, 850, 2.0)];
        let table = build_table(&records, &OpenDescriptor::default()).unwrap();
        match &table.data_var("t").unwrap().data {
            ArrayData::F32(values) => {
                assert_eq!(values.len(), 16);
                assert!(values[0..4].iter().all(|v| v.is_nan()));
            }
            other => panic!("unexpected data {:?}", other),
        }
    }

    #[test]
    fn test_unsqueezed_keeps_length_one_dims() {
        let records = vec![field("t", 0, 500, 1.0)];
        let refs: Vec<&FieldRecord> = records.iter().collect();
        let table = build_from_refs(&refs, &OpenDescriptor::default(), false).unwrap();
        assert_eq!(table.dim_len("time"), Some(1));
        assert_eq!(table.dim_len("step"), Some(1));
    }

    #[test]
    fn test_multiple_values_names_key() {
        let mut other = field("t", 0, 500, 1.0);
        other.set("stepType", "accum");
        let records = vec![field("t", 0, 500, 1.0), other];

        let err = build_table(&records, &OpenDescriptor::default()).unwrap_err();
        assert_eq!(
            err,
            OpenError::MultipleValues {
                variable: "t".into(),
                key: "stepType".into(),
                values: vec!["accum".into(), "instant".into()],
            }
        );

        let ignoring = OpenDescriptor::default().with_ignored_key("stepType");
        assert!(matches!(
            build_table(&records, &ignoring),
            Err(OpenError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_duplicate_field() {
        let records = vec![field("t", 0, 500, 1.0), field("t", 0, 500, 2.0)];
        let err = build_table(&records, &OpenDescriptor::default()).unwrap_err();
        assert!(matches!(err, OpenError::DuplicateField { ref variable, .. } if variable == "t"));
    }

    #[test]
    fn test_grids_differ_by_grid_hash() {
        let south = GridGeometry::Regular {
            latitudes: vec![-10.0, -20.0],
            longitudes: vec![0.0, 1.0],
        };
        let mut other = field("t", 0, 500, 1.0);
        other.grid = south.clone();
        let mut records = vec![field("t", 0, 500, 1.0), other];

        // Same gridType and numberOfPoints; only the fingerprint tells them apart
        let unhashed = build_table(&records, &OpenDescriptor::default()).unwrap_err();
        assert_eq!(unhashed, OpenError::GridMismatch { variable: "t".into() });

        for record in &mut records {
            let hash = record.grid.fingerprint();
            record.set(GRID_HASH_KEY, hash);
        }
        let err = build_table(&records, &OpenDescriptor::default()).unwrap_err();
        match err {
            OpenError::MultipleValues { variable, key, values } => {
                assert_eq!(variable, "t");
                assert_eq!(key, GRID_HASH_KEY);
                assert_eq!(values.len(), 2);
                assert!(values.contains(&MetaValue::from(south.fingerprint())));
            }
            other => panic!("unexpected error {:?}", other),
        }

        let table = build_table(&records[..1], &OpenDescriptor::default()).unwrap();
        assert!(table.data_var("t").unwrap().attrs.get("GRIB_gridHash").is_none());
    }

    #[test]
    fn test_partial_key_is_missing_key() {
        let mut bare = field("t", 6, 500, 1.0);
        bare.metadata.remove("time");
        let records = vec![field("t", 0, 500, 1.0), bare];
        let err = build_table(&records, &OpenDescriptor::default()).unwrap_err();
        assert_eq!(
            err,
            OpenError::MissingKey {
                variable: "t".into(),
                key: "time".into()
            }
        );
    }

    #[test]
    fn test_no_match() {
        let records = vec![field("t", 0, 500, 1.0)];
        let descriptor = OpenDescriptor::default().with_filter("stream", "wave");
        assert!(matches!(
            build_table(&records, &descriptor),
            Err(OpenError::NoMatchingRecords { .. })
        ));
    }

    #[test]
    fn test_coords_as_attributes() {
        let records = vec![field("t", 0, 500, 1.0), field("t", 6, 500, 1.0)];
        let descriptor = OpenDescriptor::default().with_coord_as_attribute("level");
        let table = build_table(&records, &descriptor).unwrap();
        assert!(table.coord("isobaricInhPa").is_none());
        assert_eq!(
            table.data_var("t").unwrap().attrs.get("GRIB_level"),
            Some(&MetaValue::Int(500))
        );

        let descriptor = OpenDescriptor::default().with_coord_as_attribute("step");
        assert!(matches!(
            build_table(&records, &descriptor),
            Err(OpenError::MultipleValues { ref key, .. }) if key == "step"
        ));
    }

    #[test]
    fn test_extra_coords_follow_dimension() {
        let mut records = vec![field("t", 0, 500, 1.0), field("t", 6, 500, 1.0)];
        records[0].set("valid_time", 0);
        records[1].set("valid_time", 21600);
        let descriptor = OpenDescriptor::default().with_extra_coord("valid_time", "step");
        let table = build_table(&records, &descriptor).unwrap();
        let valid_time = table.coord("valid_time").unwrap();
        assert_eq!(valid_time.dims, vec!["step"]);
        assert_eq!(valid_time.data, ArrayData::I64(vec![0, 21600]));

        records[1].set("valid_time", 0);
        let mut third = field("t", 6, 850, 1.0);
        third.set("valid_time", 7200);
        records.push(third);
        assert_eq!(
            build_table(&records, &descriptor).unwrap_err(),
            OpenError::ExtraCoordMismatch {
                coord: "valid_time".into(),
                dim: "step".into()
            }
        );
    }

    #[test]
    fn test_extra_coord_on_absent_dim_is_ignored() {
        let records = vec![field("t", 0, 500, 1.0)];
        let descriptor = OpenDescriptor::default().with_extra_coord("valid_time", "number");
        let table = build_table(&records, &descriptor).unwrap();
        assert!(table.coord("valid_time").is_none());
    }

    #[test]
    fn test_conflicting_variables() {
        let records = vec![field("t", 0, 500, 1.0), field("u", 6, 500, 1.0)];
        assert!(matches!(
            build_table(&records, &OpenDescriptor::default()),
            Err(OpenError::CoordinateConflict { .. })
        ));
    }

    #[test]
    fn test_unstructured_grid() {
        let record = FieldRecord::new(
            GridGeometry::Unstructured {
                latitudes: vec![1.0, 2.0, 3.0],
                longitudes: vec![4.0, 5.0, 6.0],
            },
            vec![1.0, 2.0, 3.0],
        )
        .with("shortName", "swh");
        let table = build_table(&[record], &OpenDescriptor::default()).unwrap();
        assert_eq!(table.data_var("swh").unwrap().dims, vec!["values"]);
        assert_eq!(table.coord("latitude").unwrap().dims, vec!["values"]);
    }

    #[test]
    fn test_short_name_order() {
        let a = field("u", 0, 500, 1.0).with("paramId", 131);
        let b = field("t", 0, 500, 1.0);
        let mut c = field("zz", 0, 500, 1.0);
        c.metadata.remove("paramId");
        let names = short_names(&[&a, &b, &c]);
        let order: Vec<&str> = names.iter().map(|(_, n)| n.as_str()).collect();
        assert_eq!(order, vec!["t", "u", "zz"]);
    }
}
