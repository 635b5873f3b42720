//! GRIB2 parameter and level lookup tables.
//!
//! Translates the numeric codes of the product definition section into the
//! ecCodes-style names (`shortName`, `typeOfLevel`) that descriptors filter
//! on and that become variable and coordinate names downstream.

use std::collections::HashMap;

/// Lookup key for parameter: (discipline, category, number)
pub type ParamKey = (u8, u8, u8);

/// Names and units attached to one parameter code.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterEntry {
    /// Short name (e.g., "t", "u", "swh")
    pub short_name: String,
    /// Long name (e.g., "Temperature")
    pub name: String,
    pub units: String,
    /// ECMWF parameter database id, when known
    pub param_id: Option<i64>,
}

impl ParameterEntry {
    pub fn new(short_name: &str, name: &str, units: &str, param_id: Option<i64>) -> Self {
        Self {
            short_name: short_name.to_string(),
            name: name.to_string(),
            units: units.to_string(),
            param_id,
        }
    }
}

/// Level type naming for one fixed-surface code.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelEntry {
    /// `typeOfLevel` name (e.g., "isobaricInhPa")
    pub type_of_level: String,
    /// Raw surface value is divided by this (Pa → hPa uses 100)
    pub divisor: f64,
}

/// GRIB2 parameter and level lookup tables.
#[derive(Debug, Clone, Default)]
pub struct Grib2Tables {
    parameters: HashMap<ParamKey, ParameterEntry>,
    levels: HashMap<u8, LevelEntry>,
}

impl Grib2Tables {
    /// Create empty tables
    pub fn new() -> Self {
        Self::default()
    }

    /// Tables pre-populated with the common ECMWF/WMO parameters and level types.
    pub fn with_defaults() -> Self {
        let mut tables = Self::new();

        // Discipline 0: Meteorological products
        tables.add_parameter(0, 0, 0, ParameterEntry::new("t", "Temperature", "K", Some(130)));
        tables.add_parameter(0, 0, 6, ParameterEntry::new("dpt", "Dew point temperature", "K", Some(3017)));
        tables.add_parameter(0, 1, 0, ParameterEntry::new("q", "Specific humidity", "kg kg**-1", Some(133)));
        tables.add_parameter(0, 1, 1, ParameterEntry::new("r", "Relative humidity", "%", Some(157)));
        tables.add_parameter(0, 1, 8, ParameterEntry::new("tp", "Total precipitation", "kg m**-2", Some(228228)));
        tables.add_parameter(0, 2, 2, ParameterEntry::new("u", "U component of wind", "m s**-1", Some(131)));
        tables.add_parameter(0, 2, 3, ParameterEntry::new("v", "V component of wind", "m s**-1", Some(132)));
        tables.add_parameter(0, 2, 8, ParameterEntry::new("w", "Vertical velocity", "Pa s**-1", Some(135)));
        tables.add_parameter(0, 3, 0, ParameterEntry::new("sp", "Surface pressure", "Pa", Some(134)));
        tables.add_parameter(0, 3, 1, ParameterEntry::new("msl", "Mean sea level pressure", "Pa", Some(151)));
        tables.add_parameter(0, 3, 5, ParameterEntry::new("gh", "Geopotential height", "gpm", Some(156)));
        tables.add_parameter(0, 6, 1, ParameterEntry::new("tcc", "Total cloud cover", "%", Some(228164)));

        // Discipline 10: Oceanographic products
        tables.add_parameter(10, 0, 3, ParameterEntry::new("swh", "Significant height of combined wind waves and swell", "m", Some(140229)));

        tables.add_level(1, "surface", 1.0);
        tables.add_level(100, "isobaricInhPa", 100.0);
        tables.add_level(101, "meanSea", 1.0);
        tables.add_level(103, "heightAboveGround", 1.0);
        tables.add_level(105, "hybrid", 1.0);
        tables.add_level(106, "depthBelowLandLayer", 1.0);
        tables.add_level(160, "depthBelowSea", 1.0);
        tables.add_level(200, "atmosphere", 1.0);

        tables
    }

    /// Add a parameter mapping
    pub fn add_parameter(&mut self, discipline: u8, category: u8, number: u8, entry: ParameterEntry) {
        self.parameters.insert((discipline, category, number), entry);
    }

    /// Add a level type mapping
    pub fn add_level(&mut self, surface_type: u8, type_of_level: &str, divisor: f64) {
        self.levels.insert(
            surface_type,
            LevelEntry {
                type_of_level: type_of_level.to_string(),
                divisor,
            },
        );
    }

    /// Look up a parameter by GRIB2 codes.
    ///
    /// Unknown codes get the short name "p{discipline}_{category}_{number}"
    /// and no units.
    pub fn parameter(&self, discipline: u8, category: u8, number: u8) -> ParameterEntry {
        self.parameters
            .get(&(discipline, category, number))
            .cloned()
            .unwrap_or_else(|| {
                let code = format!("p{}_{}_{}", discipline, category, number);
                ParameterEntry::new(&code, &code, "unknown", None)
            })
    }

    /// `typeOfLevel` name for a fixed-surface code ("level{code}" if unknown).
    pub fn type_of_level(&self, surface_type: u8) -> String {
        self.levels
            .get(&surface_type)
            .map(|entry| entry.type_of_level.clone())
            .unwrap_or_else(|| format!("level{}", surface_type))
    }

    /// Level value in the units of its `typeOfLevel`.
    pub fn level_value(&self, surface_type: u8, raw: f64) -> f64 {
        match self.levels.get(&surface_type) {
            Some(entry) => raw / entry.divisor,
            None => raw,
        }
    }

    /// Get the number of parameters in the table
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Get the number of level types in the table
    pub fn level_count(&self) -> usize {
        self.levels.len()
    }

    /// Check if the tables are empty
    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty() && self.levels.is_empty()
    }
}
