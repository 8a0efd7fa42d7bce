//! Simulator configuration
//!
//! Everything needed to build a simulation, stored as JSON. Every section
//! falls back to the Ninja 650 defaults when omitted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::calibration::Calibration;
use crate::ecu::EcuSettings;
use crate::engine::{ChassisSpecs, EngineSpecs, Environment};
use crate::error::{Error, Result};
use crate::physics::ExhaustType;

/// Default tick period (20 Hz)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 50;

/// Complete simulator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatorConfig {
    /// Engine and gearing
    pub engine: EngineSpecs,
    /// Mass, aerodynamics and brakes
    pub chassis: ChassisSpecs,
    /// Starting operating environment
    pub environment: Environment,
    /// Exhaust fitted to the bike
    pub exhaust: ExhaustType,
    /// Initial ECU settings
    pub ecu: EcuSettings,
    /// Replacement calibration maps; the factory maps when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<Calibration>,
    /// Tick period in milliseconds
    pub tick_interval_ms: u64,
    /// RNG seed for reproducible runs; entropy when absent
    pub seed: Option<u64>,
    /// Telemetry frames kept by the session recorder, 0 disables recording
    pub telemetry_history: usize,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            engine: EngineSpecs::default(),
            chassis: ChassisSpecs::default(),
            environment: Environment::default(),
            exhaust: ExhaustType::YoshimuraAlpha2,
            ecu: EcuSettings::default(),
            calibration: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            seed: None,
            telemetry_history: 0,
        }
    }
}

impl SimulatorConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimulatorConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&content)?;
        tracing::info!(path = %path.as_ref().display(), "configuration loaded");
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path.as_ref(), content)?;
        tracing::info!(path = %path.as_ref().display(), "configuration saved");
        Ok(())
    }

    /// Tick period as a duration
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Tick period in seconds
    pub fn tick_seconds(&self) -> f64 {
        self.tick_interval().as_secs_f64()
    }

    /// Reject values the physics cannot run with
    pub fn validate(&self) -> Result<()> {
        let engine = &self.engine;
        let chassis = &self.chassis;

        if self.tick_interval_ms == 0 {
            return Err(invalid("tick_interval_ms must be greater than zero"));
        }
        if !(engine.max_rpm > 0.0 && engine.redline_rpm > 0.0 && engine.max_torque > 0.0) {
            return Err(invalid("engine max_rpm, redline_rpm and max_torque must be positive"));
        }
        if !(engine.idle_rpm >= 0.0 && engine.idle_rpm < engine.max_rpm) {
            return Err(invalid("engine idle_rpm must be below max_rpm"));
        }
        if !(engine.max_torque_rpm > 0.0 && engine.max_torque_rpm <= engine.max_rpm) {
            return Err(invalid("engine max_torque_rpm must be within (0, max_rpm]"));
        }
        if engine.gear_ratios[1..].iter().any(|r| !(*r > 0.0))
            || !(engine.final_drive_ratio > 0.0)
        {
            return Err(invalid("gear and final drive ratios must be positive"));
        }
        if !(engine.wheel_circumference > 0.0) {
            return Err(invalid("wheel_circumference must be positive"));
        }
        if !(chassis.mass > 0.0 && chassis.rotational_inertia > 0.0) {
            return Err(invalid("chassis mass and rotational_inertia must be positive"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfig(message.to_string())
}
