//! Synthetic field record generators.
//!
//! Records carry the same metadata keys the GRIB2 reader produces, so tests
//! exercise the opener without needing real GRIB files.

use grib2_parser::{FieldRecord, GridGeometry, MetaValue, GRID_HASH_KEY};

/// Reference time used by every generated record (2024-01-01T00:00:00Z).
pub const BASE_TIME: i64 = 1_704_067_200;

/// Regular lat/lon grid with `height` rows from 90 southwards and `width`
/// columns from 0 eastwards, both at `step` degrees.
pub fn regular_grid(width: usize, height: usize, step: f64) -> GridGeometry {
    GridGeometry::Regular {
        latitudes: (0..height).map(|i| 90.0 - i as f64 * step).collect(),
        longitudes: (0..width).map(|i| i as f64 * step).collect(),
    }
}

/// Unstructured grid of `n` points along the equator.
pub fn point_grid(n: usize) -> GridGeometry {
    GridGeometry::Unstructured {
        latitudes: vec![0.0; n],
        longitudes: (0..n).map(|i| i as f64).collect(),
    }
}

/// Builder for synthetic [`FieldRecord`]s.
///
/// # Example
///
/// ```
/// use test_utils::RecordBuilder;
///
/// let record = RecordBuilder::new("t").level("isobaricInhPa", 500).step(6).build();
/// assert_eq!(record.short_name(), Some("t"));
/// ```
#[derive(Debug, Clone)]
pub struct RecordBuilder {
    record: FieldRecord,
    fill: f32,
}

impl RecordBuilder {
    /// Instantaneous surface field on a 4×3 regular grid with ECMWF-style keys.
    pub fn new(short_name: &str) -> Self {
        let grid = regular_grid(4, 3, 1.0);
        let points = grid.num_points();
        let (param_id, name, units) = parameter_info(short_name);

        let mut record = FieldRecord::new(grid, vec![0.0; points])
            .with("edition", 2)
            .with("centre", 98)
            .with("shortName", short_name)
            .with("name", name)
            .with("units", units)
            .with("stream", "oper")
            .with("dataType", "fc")
            .with("typeOfLevel", "surface")
            .with("level", 0)
            .with("stepType", "instant")
            .with("time", BASE_TIME)
            .with("step", 0)
            .with("valid_time", BASE_TIME);
        if let Some(id) = param_id {
            record.set("paramId", id);
        }

        let mut builder = Self { record, fill: 0.0 };
        builder.sync_grid_keys();
        builder
    }

    pub fn stream(mut self, stream: &str) -> Self {
        self.record.set("stream", stream);
        self
    }

    pub fn level(mut self, type_of_level: &str, level: i64) -> Self {
        self.record.set("typeOfLevel", type_of_level);
        self.record.set("level", level);
        self
    }

    /// Forecast step in hours; `valid_time` follows.
    pub fn step(mut self, hours: i64) -> Self {
        let time = self.record.get("time").and_then(|v| v.as_i64()).unwrap_or(BASE_TIME);
        self.record.set("step", hours);
        self.record.set("valid_time", time + hours * 3600);
        self
    }

    pub fn step_type(mut self, step_type: &str) -> Self {
        self.record.set("stepType", step_type);
        self
    }

    pub fn number(mut self, member: i64) -> Self {
        self.record.set("number", member);
        self
    }

    pub fn grid(mut self, grid: GridGeometry) -> Self {
        self.record.grid = grid;
        self.sync_grid_keys();
        self
    }

    /// Offset added to the generated values so fields are distinguishable.
    pub fn fill(mut self, offset: f32) -> Self {
        self.fill = offset;
        self
    }

    pub fn meta(mut self, key: &str, value: impl Into<MetaValue>) -> Self {
        self.record.set(key, value);
        self
    }

    pub fn without(mut self, key: &str) -> Self {
        self.record.metadata.remove(key);
        self
    }

    pub fn build(mut self) -> FieldRecord {
        let points = self.record.grid.num_points();
        self.record.values = field_values(points, self.fill);
        self.record
    }

    fn sync_grid_keys(&mut self) {
        let grid_type = self.record.grid.grid_type();
        let points = self.record.grid.num_points() as i64;
        let grid_hash = self.record.grid.fingerprint();
        self.record.set("gridType", grid_type);
        self.record.set("numberOfPoints", points);
        self.record.set(GRID_HASH_KEY, grid_hash);
    }
}

/// Predictable values: `offset + index * 1000`.
fn field_values(points: usize, offset: f32) -> Vec<f32> {
    (0..points).map(|i| offset + (i * 1000) as f32).collect()
}

fn parameter_info(short_name: &str) -> (Option<i64>, &'static str, &'static str) {
    match short_name {
        "t" => (Some(130), "Temperature", "K"),
        "u" => (Some(131), "U component of wind", "m s**-1"),
        "v" => (Some(132), "V component of wind", "m s**-1"),
        "msl" => (Some(151), "Mean sea level pressure", "Pa"),
        "2t" => (Some(167), "2 metre temperature", "K"),
        "tp" => (Some(228), "Total precipitation", "m"),
        "swh" => (Some(140229), "Significant height of combined wind waves and swell", "m"),
        "mwp" => (Some(140232), "Mean wave period", "s"),
        _ => (None, "unknown", "unknown"),
    }
}
