//! Common record sets for conversion tests.
//!
//! Each fixture mirrors a situation seen in real ECMWF downloads.

use grib2_parser::FieldRecord;

use crate::generators::{point_grid, RecordBuilder};

/// Common descriptor tags.
pub mod tags {
    pub const STREAM_OPER: &str = "stream-oper";
    pub const STREAM_WAVE: &str = "stream-wave";
}

/// Base names used for output keys.
pub mod names {
    pub const TWO_STREAM: &str = "era5_mixed";
    pub const MIXED_LEVELS: &str = "forecast";
}

/// One file holding atmospheric fields (`stream=oper`, regular grid) and
/// wave fields (`stream=wave`, unstructured grid), steps 0 and 6.
///
/// Opened whole the two grids conflict; filtered per stream each half forms
/// one hypercube.
pub fn two_stream_records() -> Vec<FieldRecord> {
    let mut records = Vec::new();
    for step in [0, 6] {
        for level in [500, 850] {
            records.push(
                RecordBuilder::new("t")
                    .level("isobaricInhPa", level)
                    .step(step)
                    .fill(level as f32)
                    .build(),
            );
        }
        records.push(RecordBuilder::new("2t").step(step).fill(2.0).build());
        for short_name in ["swh", "mwp"] {
            records.push(
                RecordBuilder::new(short_name)
                    .stream("wave")
                    .grid(point_grid(6))
                    .step(step)
                    .build(),
            );
        }
    }
    records
}

/// Fields that cannot share one hypercube: `t` on pressure levels at step 0,
/// `msl` on mean sea level at step 0, `2t` at surface for steps 0 and 6, and
/// `swh` at surface on a point grid.
///
/// The automatic splitter yields four tables: isobaricInhPa, meanSea,
/// surface (`2t`), surface (`swh`).
pub fn mixed_level_records() -> Vec<FieldRecord> {
    vec![
        RecordBuilder::new("t").level("isobaricInhPa", 500).build(),
        RecordBuilder::new("t").level("isobaricInhPa", 850).fill(1.0).build(),
        RecordBuilder::new("msl").level("meanSea", 0).build(),
        RecordBuilder::new("2t").build(),
        RecordBuilder::new("2t").step(6).fill(1.0).build(),
        RecordBuilder::new("swh").grid(point_grid(6)).build(),
    ]
}

/// A two-member ensemble of `t` at 850 hPa: forms one hypercube with a
/// `number` dimension.
pub fn ensemble_records() -> Vec<FieldRecord> {
    (0..2)
        .map(|member| {
            RecordBuilder::new("t")
                .level("isobaricInhPa", 850)
                .number(member)
                .meta("dataType", "pf")
                .fill(member as f32 * 100.0)
                .build()
        })
        .collect()
}
