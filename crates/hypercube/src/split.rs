//! Automatic splitting of records that do not form one hypercube.
//!
//! Each `shortName` is opened on its own and refined on whichever unique key
//! still takes several values, until every piece builds. The pieces are then
//! grouped by level type and merged back together wherever they agree.

use grib2_parser::FieldRecord;
use std::collections::BTreeMap;
use tracing::debug;

use crate::build::{build_from_refs, short_names, type_of_level, GRID_DIMS};
use crate::descriptor::OpenDescriptor;
use crate::error::OpenError;
use crate::table::Table;

/// Split `records` into internally consistent tables.
///
/// The returned order is deterministic for a given input but carries no
/// meaning beyond that.
pub fn split_records(
    records: &[FieldRecord],
    descriptor: &OpenDescriptor,
) -> Result<Vec<Table>, OpenError> {
    let selected: Vec<&FieldRecord> = records.iter().filter(|r| descriptor.matches(r)).collect();
    if selected.is_empty() {
        return Err(OpenError::NoMatchingRecords {
            filter: descriptor.describe_filter(),
        });
    }
    if selected.iter().any(|r| r.short_name().is_none()) {
        return Err(OpenError::MissingKey {
            variable: "unknown".to_string(),
            key: "shortName".to_string(),
        });
    }

    let mut pieces = Vec::new();
    for (_, name) in short_names(&selected) {
        let refined = descriptor.clone().with_filter("shortName", name.as_str());
        split_one(&selected, &refined, &mut pieces)?;
    }
    debug!(pieces = pieces.len(), "Split records into hypercubes");

    let mut by_level: BTreeMap<Option<String>, Vec<Table>> = BTreeMap::new();
    for piece in pieces {
        by_level.entry(type_of_level(&piece)).or_default().push(piece);
    }

    let mut tables = Vec::new();
    for (_, group) in by_level {
        let mut merged: Vec<Table> = Vec::new();
        for piece in group {
            match merged.iter_mut().find(|t| t.check_merge(&piece).is_ok()) {
                Some(target) => target.merge(piece)?,
                None => merged.push(piece),
            }
        }
        tables.extend(merged);
    }

    for table in tables.iter_mut() {
        table.squeeze(&GRID_DIMS);
    }
    Ok(tables)
}

fn split_one(
    records: &[&FieldRecord],
    descriptor: &OpenDescriptor,
    out: &mut Vec<Table>,
) -> Result<(), OpenError> {
    match build_from_refs(records, descriptor, false) {
        Ok(table) => {
            out.push(table);
            Ok(())
        }
        Err(OpenError::MultipleValues { key, values, .. }) => {
            debug!(key = %key, values = values.len(), "Refining split");
            for value in values {
                let refined = descriptor.clone().with_filter(&key, value);
                split_one(records, &refined, out)?;
            }
            Ok(())
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grib2_parser::{GridGeometry, MetaValue};

    fn field(short_name: &str, type_of_level: &str, step: i64) -> FieldRecord {
        FieldRecord::new(
            GridGeometry::Regular {
                latitudes: vec![1.0, 0.0],
                longitudes: vec![0.0],
            },
            vec![1.0, 2.0],
        )
        .with("shortName", short_name)
        .with("typeOfLevel", type_of_level)
        .with("level", 0)
        .with("time", 0)
        .with("step", step)
    }

    #[test]
    fn test_splits_on_level_type_and_remerges() {
        let records = vec![
            field("t", "surface", 0),
            field("t", "heightAboveGround", 0),
            field("u", "surface", 0),
        ];
        let tables = split_records(&records, &OpenDescriptor::default()).unwrap();

        assert_eq!(tables.len(), 2);
        // heightAboveGround sorts before surface
        assert!(tables[0].data_var("t").is_some());
        assert!(tables[0].coord("heightAboveGround").is_some());
        assert!(tables[1].data_var("t").is_some());
        assert!(tables[1].data_var("u").is_some());
        assert!(tables[1].coord("time").unwrap().is_scalar());
    }

    #[test]
    fn test_conflicting_steps_stay_apart() {
        let records = vec![
            field("t", "surface", 0),
            field("t", "surface", 6),
            field("u", "surface", 0),
        ];
        let tables = split_records(&records, &OpenDescriptor::default()).unwrap();
        assert_eq!(tables.len(), 2);
        assert_eq!(tables[0].dim_len("step"), Some(2));
        assert_eq!(
            tables[1].coord("step").unwrap().data,
            crate::table::ArrayData::from_meta_values(&[MetaValue::Int(0)])
        );
    }

    #[test]
    fn test_non_splittable_error_propagates() {
        let records = vec![field("t", "surface", 0), field("t", "surface", 0)];
        assert!(matches!(
            split_records(&records, &OpenDescriptor::default()),
            Err(OpenError::DuplicateField { .. })
        ));
    }

    #[test]
    fn test_empty_selection_fails() {
        let records = vec![field("t", "surface", 0)];
        let descriptor = OpenDescriptor::default().with_filter("stream", "wave");
        assert!(matches!(
            split_records(&records, &descriptor),
            Err(OpenError::NoMatchingRecords { .. })
        ));
    }
}
