//! Engine Control Unit
//!
//! Turns a sensor snapshot into actuator commands using the calibration maps,
//! global trims, temperature compensation and knock protection.

mod limits;
pub mod model;
mod presets;

pub use limits::{sensor_warnings, SensorChannel, SensorRange, SensorStatus};
pub use presets::TuningPreset;

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use crate::calibration::{Calibration, CalibrationMap, CellSnap, LookupTable, MapType};
use crate::engine::{ActuatorCommand, SensorSnapshot};
use crate::physics::ExhaustType;
use model::{
    knock_risk, volumetric_efficiency, BASE_INJECTION_MS, KNOCK_THRESHOLD, STOICHIOMETRIC_AFR,
};

/// Tunable ECU settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcuSettings {
    /// Global fuel adjustment (%)
    pub fuel_trim_pct: f64,
    /// Global ignition adjustment (degrees)
    pub ignition_trim_deg: f64,
    /// Idle speed target (RPM)
    pub idle_rpm: f64,
    /// Rev limiter threshold (RPM), 0 disables
    pub rev_limit: f64,
    /// Cold-engine enrichment and timing retard
    pub temp_compensation_enabled: bool,
    /// Exhaust the fuel map is compensated for
    pub exhaust_type: ExhaustType,
}

impl Default for EcuSettings {
    fn default() -> Self {
        Self {
            fuel_trim_pct: 0.0,
            ignition_trim_deg: 0.0,
            idle_rpm: 900.0,
            rev_limit: 11000.0,
            temp_compensation_enabled: true,
            exhaust_type: ExhaustType::YoshimuraAlpha2,
        }
    }
}

/// Running ECU statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EcuStatistics {
    /// Ticks where knock protection pulled timing
    pub knock_count: u64,
    /// |measured AFR - target AFR| at the last tick
    pub afr_deviation: f64,
    /// Knock risk computed at the last tick
    pub last_knock_risk: f64,
    /// Snapshots processed since the last reset
    pub ticks_processed: u64,
}

/// Engine control unit
#[derive(Debug, Clone)]
pub struct Ecu {
    calibration: Calibration,
    settings: EcuSettings,
    stats: EcuStatistics,
    knocking: bool,
}

impl Default for Ecu {
    fn default() -> Self {
        Self::new(Calibration::default(), EcuSettings::default())
    }
}

impl Ecu {
    /// Create an ECU from a calibration and settings
    pub fn new(calibration: Calibration, settings: EcuSettings) -> Self {
        Self {
            calibration,
            settings: sanitize(settings, &EcuSettings::default()),
            stats: EcuStatistics::default(),
            knocking: false,
        }
    }

    /// Compute actuator commands for a sensor snapshot
    pub fn process(&mut self, sensor: &SensorSnapshot) -> ActuatorCommand {
        let rpm = sensor.rpm;
        let load = sensor.throttle_position;
        let temp = sensor.engine_temp;

        let base_fuel = self.calibration.fuel.get(rpm, load);
        let base_ignition = self.calibration.ignition.get(rpm, load);
        let target_afr = self.calibration.afr.get(rpm, load);

        let mut fuel_multiplier = base_fuel * (1.0 + self.settings.fuel_trim_pct / 100.0);
        let mut ignition = base_ignition + self.settings.ignition_trim_deg;

        if self.settings.temp_compensation_enabled {
            // Cold engine: more fuel
            if temp < 80.0 {
                fuel_multiplier *= 1.0 + (80.0 - temp) * 0.01;
            }
            // Colder still: less advance
            if temp < 60.0 {
                ignition -= (60.0 - temp) * 0.1;
            }
        }

        fuel_multiplier *= exhaust_fuel_factor(self.settings.exhaust_type);

        let ve = volumetric_efficiency(rpm, load);
        let rpm_factor = (5000.0 / rpm.max(1000.0)).sqrt();
        let fuel_injection_ms = BASE_INJECTION_MS * ve * fuel_multiplier * rpm_factor;

        let lambda_target = target_afr / STOICHIOMETRIC_AFR;

        self.stats.afr_deviation = (STOICHIOMETRIC_AFR * sensor.o2_lambda - target_afr).abs();

        let risk = knock_risk(rpm, load, ignition, temp);
        self.stats.last_knock_risk = risk;
        if risk > KNOCK_THRESHOLD {
            let retard = (risk - KNOCK_THRESHOLD) * 10.0;
            ignition -= retard;
            self.stats.knock_count += 1;
            if !self.knocking {
                tracing::warn!(rpm, load, risk, retard, "knock risk high, retarding ignition");
            }
            self.knocking = true;
        } else {
            self.knocking = false;
        }

        self.stats.ticks_processed += 1;

        ActuatorCommand {
            fuel_injection_ms,
            ignition_advance_deg: ignition,
            target_idle_rpm: self.settings.idle_rpm,
            lambda_target,
            rev_limit_rpm: self.settings.rev_limit,
        }
    }

    /// Borrow one of the calibration maps
    pub fn table(&self, map_type: MapType) -> &LookupTable {
        self.calibration.table(map_type)
    }

    /// Mutable access for bulk edits; writes are not logged
    pub fn table_mut(&mut self, map_type: MapType) -> &mut LookupTable {
        self.calibration.table_mut(map_type)
    }

    /// Full calibration
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Export the three maps for a calibration read
    pub fn export_calibration(&self) -> [CalibrationMap; 3] {
        self.calibration.export()
    }

    /// Point-tune one cell at the nearest breakpoints
    pub fn set_map_cell(&mut self, map_type: MapType, rpm: f64, load: f64, value: f64) -> CellSnap {
        let snap = self.calibration.table_mut(map_type).set(rpm, load, value);
        if snap.is_exact() {
            tracing::info!(map = %map_type, rpm, load, value, "map cell updated");
        } else {
            tracing::info!(
                map = %map_type,
                rpm,
                load,
                value,
                snapped_rpm = snap.rpm_breakpoint,
                snapped_load = snap.load_breakpoint,
                "map cell updated at nearest breakpoint"
            );
        }
        snap
    }

    /// Scale a rectangular region of one map by a percentage
    pub fn modify_map_region(
        &mut self,
        map_type: MapType,
        rpm_range: RangeInclusive<f64>,
        load_range: RangeInclusive<f64>,
        pct: f64,
    ) -> usize {
        let touched = self
            .calibration
            .table_mut(map_type)
            .modify_region(rpm_range, load_range, pct);
        tracing::info!(map = %map_type, pct, touched, "map region modified");
        touched
    }

    /// Current settings
    pub fn settings(&self) -> &EcuSettings {
        &self.settings
    }

    /// Replace the settings; non-finite or negative values keep the previous
    /// setting.
    pub fn apply_settings(&mut self, settings: EcuSettings) {
        self.settings = sanitize(settings, &self.settings);
        tracing::info!(settings = ?self.settings, "ECU settings updated");
    }

    /// Apply the trims of a tuning preset
    pub fn apply_preset(&mut self, preset: &TuningPreset) {
        self.settings.fuel_trim_pct = preset.fuel_trim_pct;
        self.settings.ignition_trim_deg = preset.ignition_trim_deg;
        tracing::info!(preset = preset.name, "tuning preset applied");
    }

    /// Running statistics
    pub fn statistics(&self) -> &EcuStatistics {
        &self.stats
    }

    /// Clear the running statistics
    pub fn reset_statistics(&mut self) {
        self.stats = EcuStatistics::default();
        self.knocking = false;
    }
}

/// Extra fuel for freer-flowing exhausts, which run leaner
pub fn exhaust_fuel_factor(exhaust: ExhaustType) -> f64 {
    match exhaust {
        ExhaustType::Stock => 1.0,
        ExhaustType::YoshimuraAlpha2 => 1.03,
        ExhaustType::AkrapovicFullSystem => 1.04,
    }
}

fn sanitize(new: EcuSettings, previous: &EcuSettings) -> EcuSettings {
    let finite_or = |value: f64, fallback: f64| if value.is_finite() { value } else { fallback };
    let non_negative_or = |value: f64, fallback: f64| {
        if value.is_finite() && value >= 0.0 {
            value
        } else {
            fallback
        }
    };

    EcuSettings {
        fuel_trim_pct: finite_or(new.fuel_trim_pct, previous.fuel_trim_pct),
        ignition_trim_deg: finite_or(new.ignition_trim_deg, previous.ignition_trim_deg),
        idle_rpm: non_negative_or(new.idle_rpm, previous.idle_rpm),
        rev_limit: non_negative_or(new.rev_limit, previous.rev_limit),
        temp_compensation_enabled: new.temp_compensation_enabled,
        exhaust_type: new.exhaust_type,
    }
}
