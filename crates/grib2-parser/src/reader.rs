//! GRIB2 file reader built on the `grib` crate.
//!
//! Every submessage becomes a [`FieldRecord`]. Metadata keys follow ecCodes
//! naming so descriptors written against ecCodes-based tooling keep working:
//! `edition`, `centre`, `discipline`, `parameterCategory`, `parameterNumber`,
//! `paramId`, `shortName`, `name`, `units`, `typeOfLevel`, `level`, `step`,
//! `stepType`, `time`, `valid_time`, `dataDate`, `dataTime`, `dataType`,
//! `number`, `gridType`, `numberOfPoints`, plus `gridHash`, a fingerprint of
//! the grid geometry.
//!
//! `step` is in hours whatever unit the message encodes it in; it becomes a
//! float when the forecast time is not a whole number of hours. `number` is
//! only set for ensemble templates (4.1 and 4.11).
//!
//! `stream` lives in ECMWF's local use section, which the `grib` crate does
//! not decode, so records read from files never carry it.

use bytes::Bytes;
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Grib2Error, Result};
use crate::record::{FieldRecord, GridGeometry, MetaValue};
use crate::tables::Grib2Tables;

/// Grid definition template 3.0: regular latitude/longitude
const TEMPLATE_LATLON: u16 = 0;

/// Product definition templates carrying a statistical process (accumulations)
const ACCUMULATION_TEMPLATES: [u16; 3] = [8, 11, 12];

/// Individual ensemble forecast templates
const ENSEMBLE_TEMPLATES: [u16; 2] = [1, 11];

/// Perturbation number (octet 36 of templates 4.1 and 4.11) as an offset into
/// the section 4 payload, which starts at octet 6.
const PERTURBATION_NUMBER_OFFSET: usize = 30;

/// Metadata key carrying [`GridGeometry::fingerprint`].
pub const GRID_HASH_KEY: &str = "gridHash";

/// Reads GRIB2 files into field records.
#[derive(Debug, Clone)]
pub struct Grib2Reader {
    tables: Arc<Grib2Tables>,
}

impl Default for Grib2Reader {
    fn default() -> Self {
        Self::new(Arc::new(Grib2Tables::with_defaults()))
    }
}

impl Grib2Reader {
    pub fn new(tables: Arc<Grib2Tables>) -> Self {
        Self { tables }
    }

    /// Decode every submessage of the file at `path`.
    pub fn read_path(&self, path: &Path) -> Result<Vec<FieldRecord>> {
        let file = File::open(path)?;
        let records = self.read(BufReader::new(file))?;
        info!(path = %path.display(), records = records.len(), "Decoded GRIB2 file");
        Ok(records)
    }

    /// Decode every submessage of an in-memory GRIB2 file.
    pub fn read_bytes(&self, data: Bytes) -> Result<Vec<FieldRecord>> {
        self.read(Cursor::new(data))
    }

    fn read<R: Read + Seek>(&self, reader: R) -> Result<Vec<FieldRecord>> {
        let grib2 = grib::from_reader(reader)
            .map_err(|e| Grib2Error::InvalidFormat(e.to_string()))?;

        let mut records = Vec::new();
        for (index, submessage) in grib2.iter() {
            let index = format!("{}.{}", index.0, index.1);
            let discipline = submessage.indicator().discipline;

            let prod_def = submessage.prod_def();
            let category = prod_def
                .parameter_category()
                .ok_or_else(|| missing(&index, "parameter category"))?;
            let number = prod_def
                .parameter_number()
                .ok_or_else(|| missing(&index, "parameter number"))?;
            let step_seconds = match prod_def.forecast_time() {
                Some(ft) => {
                    let unit = match ft.unit {
                        grib::Name(unit) => u8::from(unit),
                        grib::Num(unit) => unit,
                    };
                    forecast_seconds(unit, ft.value).ok_or_else(|| {
                        Grib2Error::UnsupportedTimeUnit {
                            index: index.clone(),
                            unit,
                        }
                    })?
                }
                None => 0,
            };
            let step = step_hours(step_seconds);
            let step_type = if ACCUMULATION_TEMPLATES.contains(&prod_def.prod_tmpl_num()) {
                "accum"
            } else {
                "instant"
            };
            let (surface_type, raw_level) = prod_def
                .fixed_surfaces()
                .map(|(first, _)| (first.surface_type, first.value()))
                .ok_or_else(|| missing(&index, "fixed surfaces"))?;

            let member = if ENSEMBLE_TEMPLATES.contains(&prod_def.prod_tmpl_num()) {
                let payload: Vec<u8> = prod_def.iter().copied().collect();
                perturbation_number(&payload)
            } else {
                None
            };

            let identification = submessage.identification();
            let data_type = data_type_name(identification.data_type());
            let centre = identification.centre_id() as i64;
            let ref_time = identification.ref_time_unchecked();
            let reference = NaiveDate::from_ymd_opt(
                ref_time.year as i32,
                ref_time.month as u32,
                ref_time.day as u32,
            )
            .and_then(|date| {
                date.and_hms_opt(
                    ref_time.hour as u32,
                    ref_time.minute as u32,
                    ref_time.second as u32,
                )
            })
            .ok_or_else(|| missing(&index, "a valid reference time"))?;
            let time = reference.and_utc().timestamp();

            let points: Vec<(f64, f64)> = submessage
                .latlons()
                .map_err(|e| missing(&index, &format!("grid coordinates ({})", e)))?
                .map(|(lat, lon)| (lat as f64, lon as f64))
                .collect();
            let regular_shape = if submessage.grid_def().grid_tmpl_num() == TEMPLATE_LATLON {
                submessage.grid_shape().ok()
            } else {
                None
            };
            let grid = grid_from_points(points, regular_shape);

            let decoder = grib::Grib2SubmessageDecoder::from(submessage).map_err(|e| {
                Grib2Error::UnpackingError {
                    index: index.clone(),
                    reason: e.to_string(),
                }
            })?;
            let values: Vec<f32> = decoder
                .dispatch()
                .map_err(|e| Grib2Error::UnpackingError {
                    index: index.clone(),
                    reason: e.to_string(),
                })?
                .collect();

            if values.len() != grid.num_points() {
                return Err(Grib2Error::GridMismatch {
                    index,
                    values: values.len(),
                    points: grid.num_points(),
                });
            }

            let parameter = self.tables.parameter(discipline, category, number);
            let level = self.tables.level_value(surface_type, raw_level);

            let mut record = FieldRecord::new(grid, values)
                .with("edition", 2)
                .with("centre", centre)
                .with("discipline", discipline as i64)
                .with("parameterCategory", category as i64)
                .with("parameterNumber", number as i64)
                .with("shortName", parameter.short_name.as_str())
                .with("name", parameter.name.as_str())
                .with("units", parameter.units.as_str())
                .with("typeOfLevel", self.tables.type_of_level(surface_type))
                .with("step", step.clone())
                .with("stepType", step_type)
                .with("time", time)
                .with("valid_time", time + step_seconds)
                .with(
                    "dataDate",
                    ref_time.year as i64 * 10_000 + ref_time.month as i64 * 100 + ref_time.day as i64,
                )
                .with("dataTime", ref_time.hour as i64 * 100 + ref_time.minute as i64);

            if level.fract() == 0.0 {
                record.set("level", level as i64);
            } else {
                record.set("level", level);
            }
            if let Some(param_id) = parameter.param_id {
                record.set("paramId", param_id);
            }
            if let Some(data_type) = data_type {
                record.set("dataType", data_type);
            }
            if let Some(member) = member {
                record.set("number", member);
            }
            let grid_type = record.grid.grid_type();
            let num_points = record.grid.num_points() as i64;
            let grid_hash = record.grid.fingerprint();
            record.set("gridType", grid_type);
            record.set("numberOfPoints", num_points);
            record.set(GRID_HASH_KEY, grid_hash);

            debug!(
                index = %index,
                short_name = %parameter.short_name,
                level = level,
                step = %step,
                "Decoded submessage"
            );
            records.push(record);
        }

        Ok(records)
    }
}

/// Build the grid geometry from decoded points.
///
/// A regular lat/lon shape `(ni, nj)` is used only when it matches the point
/// count; anything else falls back to one coordinate pair per point.
fn grid_from_points(points: Vec<(f64, f64)>, regular_shape: Option<(usize, usize)>) -> GridGeometry {
    if let Some((ni, nj)) = regular_shape {
        if ni > 0 && ni * nj == points.len() {
            let longitudes = points[..ni].iter().map(|(_, lon)| *lon).collect();
            let latitudes = points.iter().step_by(ni).map(|(lat, _)| *lat).collect();
            return GridGeometry::Regular {
                latitudes,
                longitudes,
            };
        }
    }

    let (latitudes, longitudes) = points.into_iter().unzip();
    GridGeometry::Unstructured {
        latitudes,
        longitudes,
    }
}

/// Length in seconds of a forecast time expressed in a Code Table 4.4 unit.
///
/// Months, years and longer units have no fixed length and give `None`.
fn forecast_seconds(unit: u8, value: u32) -> Option<i64> {
    let per_unit: i64 = match unit {
        0 => 60,
        1 => 3_600,
        2 => 86_400,
        10 => 3 * 3_600,
        11 => 6 * 3_600,
        12 => 12 * 3_600,
        13 => 1,
        _ => return None,
    };
    Some(i64::from(value) * per_unit)
}

/// `step` value in hours: integral when possible.
fn step_hours(seconds: i64) -> MetaValue {
    if seconds % 3_600 == 0 {
        MetaValue::Int(seconds / 3_600)
    } else {
        MetaValue::Float(seconds as f64 / 3_600.0)
    }
}

/// ecCodes `dataType` for a Code Table 1.4 entry. Unlisted local codes keep
/// their number; 255 (missing) gives `None`.
fn data_type_name(code: u8) -> Option<MetaValue> {
    let name = match code {
        0 => "an",
        1 => "fc",
        2 => "af",
        3 => "cf",
        4 => "pf",
        5 => "cp",
        6 => "sa",
        7 => "ra",
        8 => "ep",
        255 => return None,
        other => return Some(MetaValue::Int(i64::from(other))),
    };
    Some(MetaValue::from(name))
}

fn perturbation_number(payload: &[u8]) -> Option<i64> {
    payload
        .get(PERTURBATION_NUMBER_OFFSET)
        .filter(|&&n| n != u8::MAX)
        .map(|&n| i64::from(n))
}

fn missing(index: &str, what: &str) -> Grib2Error {
    Grib2Error::MissingField {
        index: index.to_string(),
        what: what.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_grib_bytes() {
        let reader = Grib2Reader::default();
        let result = reader.read_bytes(Bytes::from_static(b"definitely not a grib file"));
        assert!(result.is_err());
    }

    #[test]
    fn test_grid_from_regular_points() {
        let points = vec![(10.0, 0.0), (10.0, 1.0), (10.0, 2.0), (0.0, 0.0), (0.0, 1.0), (0.0, 2.0)];
        let grid = grid_from_points(points, Some((3, 2)));
        assert_eq!(
            grid,
            GridGeometry::Regular {
                latitudes: vec![10.0, 0.0],
                longitudes: vec![0.0, 1.0, 2.0],
            }
        );
    }

    #[test]
    fn test_grid_shape_mismatch_falls_back_to_points() {
        let points = vec![(1.0, 2.0), (3.0, 4.0)];
        let grid = grid_from_points(points, Some((3, 3)));
        assert_eq!(
            grid,
            GridGeometry::Unstructured {
                latitudes: vec![1.0, 3.0],
                longitudes: vec![2.0, 4.0],
            }
        );
    }

    #[test]
    fn test_minute_forecast_time_converts_to_hours() {
        let seconds = forecast_seconds(0, 90).unwrap();
        assert_eq!(seconds, 5_400);
        assert_eq!(step_hours(seconds), MetaValue::Float(1.5));

        assert_eq!(forecast_seconds(1, 6), Some(21_600));
        assert_eq!(forecast_seconds(2, 1).map(step_hours), Some(MetaValue::Int(24)));
        assert_eq!(forecast_seconds(11, 2).map(step_hours), Some(MetaValue::Int(12)));
        assert_eq!(forecast_seconds(13, 1_800).map(step_hours), Some(MetaValue::Float(0.5)));
    }

    #[test]
    fn test_calendar_time_units_are_rejected() {
        // Month, year, decade, normal, century, missing
        for unit in [3, 4, 5, 6, 7, 255] {
            assert_eq!(forecast_seconds(unit, 1), None, "unit {}", unit);
        }
    }

    #[test]
    fn test_data_type_names() {
        assert_eq!(data_type_name(0), Some(MetaValue::from("an")));
        assert_eq!(data_type_name(1), Some(MetaValue::from("fc")));
        assert_eq!(data_type_name(4), Some(MetaValue::from("pf")));
        assert_eq!(data_type_name(192), Some(MetaValue::Int(192)));
        assert_eq!(data_type_name(255), None);
    }

    #[test]
    fn test_perturbation_number_from_ensemble_payload() {
        let mut payload = vec![0u8; 32];
        payload[2..4].copy_from_slice(&1u16.to_be_bytes());
        payload[29] = 3;
        payload[30] = 7;
        assert_eq!(perturbation_number(&payload), Some(7));

        payload[30] = u8::MAX;
        assert_eq!(perturbation_number(&payload), None);
        assert_eq!(perturbation_number(&payload[..20]), None);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let reader = Grib2Reader::default();
        let result = reader.read_path(Path::new("/nonexistent/input.grib2"));
        assert!(matches!(result, Err(Grib2Error::Io(_))));
    }
}
