//! ECU Calibration
//!
//! Interpolated 2D maps (fuel, ignition, target AFR) and the factory data they
//! start from.

pub mod defaults;
mod error;
mod table;

pub use error::CalibrationError;
pub use table::{CellSnap, LookupTable};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which ECU map an operation targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapType {
    /// Fuel multiplier map
    Fuel,
    /// Ignition advance map (degrees BTDC)
    Ignition,
    /// Target air-fuel ratio map
    Afr,
}

impl MapType {
    /// All map types in export order
    pub const ALL: [MapType; 3] = [MapType::Fuel, MapType::Ignition, MapType::Afr];

    /// Wire name of the map
    pub fn as_str(&self) -> &'static str {
        match self {
            MapType::Fuel => "fuel",
            MapType::Ignition => "ignition",
            MapType::Afr => "afr",
        }
    }
}

impl fmt::Display for MapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MapType {
    type Err = CalibrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fuel" => Ok(MapType::Fuel),
            "ignition" => Ok(MapType::Ignition),
            "afr" => Ok(MapType::Afr),
            _ => Err(CalibrationError::UnknownMapType(s.to_string())),
        }
    }
}

/// Calibration read shape: one map with its axes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationMap {
    /// Which map this is (serialised as `type`)
    #[serde(rename = "type")]
    pub map_type: MapType,
    /// RPM axis
    pub rpm_breakpoints: Vec<f64>,
    /// Load (throttle %) axis
    pub load_breakpoints: Vec<f64>,
    /// One row per RPM breakpoint
    pub values: Vec<Vec<f64>>,
}

impl CalibrationMap {
    /// Snapshot a table for export
    pub fn from_table(map_type: MapType, table: &LookupTable) -> Self {
        Self {
            map_type,
            rpm_breakpoints: table.rpm_breakpoints().to_vec(),
            load_breakpoints: table.load_breakpoints().to_vec(),
            values: table.values().to_vec(),
        }
    }

    /// Validate and convert back into a table
    pub fn into_table(self) -> Result<LookupTable, CalibrationError> {
        LookupTable::new(self.rpm_breakpoints, self.load_breakpoints, self.values)
    }
}

/// The full set of ECU maps
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    /// Fuel multiplier map
    pub fuel: LookupTable,
    /// Ignition advance map
    pub ignition: LookupTable,
    /// Target AFR map
    pub afr: LookupTable,
}

impl Calibration {
    /// Factory calibration for the 649cc twin
    pub fn ninja650() -> Self {
        use defaults::{FUEL, IGNITION, LOAD_BREAKPOINTS, RPM_BREAKPOINTS, TARGET_AFR};

        Self {
            fuel: LookupTable::from_grid(&RPM_BREAKPOINTS, &LOAD_BREAKPOINTS, &FUEL),
            ignition: LookupTable::from_grid(&RPM_BREAKPOINTS, &LOAD_BREAKPOINTS, &IGNITION),
            afr: LookupTable::from_grid(&RPM_BREAKPOINTS, &LOAD_BREAKPOINTS, &TARGET_AFR),
        }
    }

    /// Borrow a map by type
    pub fn table(&self, map_type: MapType) -> &LookupTable {
        match map_type {
            MapType::Fuel => &self.fuel,
            MapType::Ignition => &self.ignition,
            MapType::Afr => &self.afr,
        }
    }

    /// Mutably borrow a map by type
    pub fn table_mut(&mut self, map_type: MapType) -> &mut LookupTable {
        match map_type {
            MapType::Fuel => &mut self.fuel,
            MapType::Ignition => &mut self.ignition,
            MapType::Afr => &mut self.afr,
        }
    }

    /// Export all three maps
    pub fn export(&self) -> [CalibrationMap; 3] {
        MapType::ALL.map(|map_type| CalibrationMap::from_table(map_type, self.table(map_type)))
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self::ninja650()
    }
}
