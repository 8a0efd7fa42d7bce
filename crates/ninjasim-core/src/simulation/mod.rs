//! Simulation Loop
//!
//! Couples one [`Engine`] and one [`Ecu`] in a fixed-period closed loop:
//! apply rider input, read the sensors, let the ECU decide, advance the
//! physics and publish a telemetry frame. [`Simulation`] runs a single tick
//! on demand; [`Session`] drives it from an async task.

mod session;

pub use session::{Session, SessionHandle};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

use crate::calibration::{CalibrationMap, CellSnap, MapType};
use crate::config::SimulatorConfig;
use crate::datalog::TelemetryLogger;
use crate::ecu::model::STOICHIOMETRIC_AFR;
use crate::ecu::{
    sensor_warnings, Ecu, EcuSettings, EcuStatistics, SensorChannel, SensorStatus, TuningPreset,
};
use crate::engine::{Engine, Environment, SensorSnapshot};
use crate::error::{Error, Result};

/// Rider controls for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ControlInput {
    /// 0-100 %
    pub throttle_position: f64,
    /// 0 = engaged, 1 = pulled
    pub clutch_position: f64,
    /// 0 = neutral; out-of-range values are clamped when applied
    pub gear: i32,
    /// Brake lever
    #[serde(default)]
    pub brake: bool,
}

impl ControlInput {
    /// Input with the brake released
    pub fn new(throttle_position: f64, clutch_position: f64, gear: i32) -> Self {
        Self {
            throttle_position,
            clutch_position,
            gear,
            brake: false,
        }
    }

    /// Same input with the brake applied or released
    pub fn with_brake(mut self, brake: bool) -> Self {
        self.brake = brake;
        self
    }
}

impl Default for ControlInput {
    /// Closed throttle, clutch pulled, neutral
    fn default() -> Self {
        Self::new(0.0, 1.0, 0)
    }
}

/// State published after every tick
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Engine speed
    pub rpm: f64,
    /// Throttle opening (0-100 %)
    pub throttle_position: f64,
    /// km/h
    pub speed: f64,
    /// Rear-wheel horsepower
    pub power: f64,
    /// Nm
    pub torque: f64,
    /// Coolant temperature (°C)
    pub engine_temp: f64,
    /// Measured AFR from the O2 sensor
    pub afr_current: f64,
    /// AFR the ECU is aiming for
    pub afr_target: f64,
    /// Commanded injector pulse width (ms)
    pub fuel_injection_ms: f64,
    /// Commanded advance (degrees BTDC)
    pub ignition_advance_deg: f64,
    /// Gear in use, 0 = neutral
    pub gear: usize,
    /// Clutch lever, 0 engaged - 1 pulled
    pub clutch_position: f64,
    /// Nanoseconds since the Unix epoch
    pub timestamp_nanos: i64,
}

/// One engine and its ECU advanced in fixed steps
#[derive(Debug, Clone)]
pub struct Simulation {
    engine: Engine,
    ecu: Ecu,
    tick: Duration,
    ticks: u64,
    warnings: Vec<(SensorChannel, SensorStatus)>,
    logger: Option<TelemetryLogger>,
}

impl Simulation {
    /// Create a simulation with a tick period.
    ///
    /// A zero period is rejected with [`Error::InvalidConfig`].
    pub fn new(engine: Engine, ecu: Ecu, tick: Duration) -> Result<Self> {
        if tick.is_zero() {
            return Err(Error::InvalidConfig(
                "tick interval must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            engine,
            ecu,
            tick,
            ticks: 0,
            warnings: Vec::new(),
            logger: None,
        })
    }

    /// Build the engine, ECU and optional recorder described by a configuration
    pub fn from_config(config: &SimulatorConfig) -> Result<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let engine = Engine::new(
            config.engine.clone(),
            config.chassis.clone(),
            config.environment.clone(),
            config.exhaust,
            rng,
        );
        let ecu = Ecu::new(config.calibration.clone().unwrap_or_default(), config.ecu.clone());

        let mut simulation = Self::new(engine, ecu, config.tick_interval())?;
        if config.telemetry_history > 0 {
            let mut logger = TelemetryLogger::new(config.telemetry_history);
            logger.start();
            simulation.logger = Some(logger);
        }
        Ok(simulation)
    }

    /// Run one closed-loop step.
    ///
    /// `None` keeps the previous controls.
    pub fn tick(&mut self, input: Option<ControlInput>) -> Telemetry {
        if let Some(input) = input {
            self.apply_input(&input);
        }

        let snapshot = self.engine.sensor_snapshot();
        self.check_sensor_ranges(&snapshot);

        let command = self.ecu.process(&snapshot);
        self.engine.update(&command, self.tick.as_secs_f64());
        let (power, torque) = self.engine.calculate_performance();
        self.ticks += 1;

        let telemetry = Telemetry {
            rpm: self.engine.rpm(),
            throttle_position: self.engine.throttle_position(),
            speed: self.engine.speed(),
            power,
            torque,
            engine_temp: self.engine.engine_temp(),
            afr_current: STOICHIOMETRIC_AFR * self.engine.o2_lambda(),
            afr_target: STOICHIOMETRIC_AFR * command.lambda_target,
            fuel_injection_ms: command.fuel_injection_ms,
            ignition_advance_deg: command.ignition_advance_deg,
            gear: self.engine.gear(),
            clutch_position: self.engine.clutch_position(),
            timestamp_nanos: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        };

        tracing::debug!(
            tick = self.ticks,
            rpm = telemetry.rpm,
            speed = telemetry.speed,
            gear = telemetry.gear,
            regime = ?self.engine.regime(),
            "tick"
        );

        if let Some(logger) = self.logger.as_mut() {
            logger.record(&telemetry);
        }
        telemetry
    }

    fn apply_input(&mut self, input: &ControlInput) {
        self.engine.set_throttle(input.throttle_position);
        self.engine.set_clutch(input.clutch_position);
        self.engine.set_gear(input.gear);
        self.engine.set_brake(input.brake);
    }

    fn check_sensor_ranges(&mut self, snapshot: &SensorSnapshot) {
        let current = sensor_warnings(snapshot);
        for (channel, status) in &current {
            if !self.warnings.contains(&(*channel, *status)) {
                let range = channel.range();
                tracing::warn!(
                    channel = ?channel,
                    status = ?status,
                    value = %range.format(channel.read(snapshot)),
                    "sensor out of range"
                );
            }
        }
        self.warnings = current;
    }

    /// Tune one map cell at the nearest breakpoints
    pub fn set_map_cell(&mut self, map_type: MapType, rpm: f64, load: f64, value: f64) -> CellSnap {
        self.ecu.set_map_cell(map_type, rpm, load, value)
    }

    /// Scale a region of one map by a percentage
    pub fn modify_map_region(
        &mut self,
        map_type: MapType,
        rpm_range: RangeInclusive<f64>,
        load_range: RangeInclusive<f64>,
        pct: f64,
    ) -> usize {
        self.ecu.modify_map_region(map_type, rpm_range, load_range, pct)
    }

    /// Replace the ECU settings
    pub fn apply_settings(&mut self, settings: EcuSettings) {
        self.ecu.apply_settings(settings);
    }

    /// Apply the trims of a tuning preset
    pub fn apply_preset(&mut self, preset: &TuningPreset) {
        self.ecu.apply_preset(preset);
    }

    /// Replace the operating environment
    pub fn set_environment(&mut self, environment: Environment) {
        self.engine.set_environment(environment);
        tracing::info!(environment = ?self.engine.environment(), "environment updated");
    }

    /// Export the three calibration maps
    pub fn calibration(&self) -> [CalibrationMap; 3] {
        self.ecu.export_calibration()
    }

    /// ECU statistics
    pub fn statistics(&self) -> &EcuStatistics {
        self.ecu.statistics()
    }

    /// The simulated engine
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Mutable engine access, e.g. for environment or condition changes
    pub fn engine_mut(&mut self) -> &mut Engine {
        &mut self.engine
    }

    /// The ECU
    pub fn ecu(&self) -> &Ecu {
        &self.ecu
    }

    /// Session recorder, when enabled
    pub fn logger(&self) -> Option<&TelemetryLogger> {
        self.logger.as_ref()
    }

    /// Attach a recorder, replacing any existing one
    pub fn set_logger(&mut self, logger: Option<TelemetryLogger>) {
        self.logger = logger;
    }

    /// Tick period
    pub fn tick_interval(&self) -> Duration {
        self.tick
    }

    /// Ticks run so far
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated time elapsed
    pub fn elapsed(&self) -> Duration {
        self.tick.saturating_mul(u32::try_from(self.ticks).unwrap_or(u32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn simulation() -> Simulation {
        let config = SimulatorConfig {
            seed: Some(3),
            ..SimulatorConfig::default()
        };
        Simulation::from_config(&config).unwrap()
    }

    #[test]
    fn test_tick_applies_input() {
        let mut sim = simulation();
        let telemetry = sim.tick(Some(ControlInput::new(150.0, 0.2, 3).with_brake(true)));
        assert_eq!(telemetry.throttle_position, 100.0);
        assert_eq!(telemetry.clutch_position, 0.2);
        assert_eq!(telemetry.gear, 3);
        assert!(sim.engine().is_brake_applied());
        assert_eq!(sim.ticks(), 1);
        assert_eq!(sim.elapsed(), Duration::from_millis(50));
    }

    #[test]
    fn test_decoded_gear_is_clamped() {
        let mut sim = simulation();
        let reverse: ControlInput = serde_json::from_str(
            r#"{"throttle_position": 10.0, "clutch_position": 1.0, "gear": -1}"#,
        )
        .unwrap();
        assert_eq!(reverse.gear, -1);
        assert!(!reverse.brake);
        assert_eq!(sim.tick(Some(reverse)).gear, 0);

        let too_high: ControlInput = serde_json::from_str(
            r#"{"throttle_position": 10.0, "clutch_position": 1.0, "gear": 9}"#,
        )
        .unwrap();
        assert_eq!(sim.tick(Some(too_high)).gear, 6);
    }

    #[test]
    fn test_zero_tick_rejected() {
        let engine = Engine::ninja650(StdRng::seed_from_u64(1));
        let result = Simulation::new(engine, Ecu::default(), Duration::ZERO);
        assert!(matches!(result, Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn test_none_keeps_previous_controls() {
        let mut sim = simulation();
        sim.tick(Some(ControlInput::new(40.0, 1.0, 0)));
        let telemetry = sim.tick(None);
        assert_eq!(telemetry.throttle_position, 40.0);
    }

    #[test]
    fn test_afr_target_follows_map() {
        let mut sim = simulation();
        let telemetry = sim.tick(None);
        let expected = sim.ecu().table(MapType::Afr).get(900.0, 0.0);
        assert!((telemetry.afr_target - expected).abs() < 1e-9);
        assert!(telemetry.afr_current > 0.0);
    }

    #[test]
    fn test_recorder_enabled_by_config() {
        let config = SimulatorConfig {
            seed: Some(1),
            telemetry_history: 5,
            ..SimulatorConfig::default()
        };
        let mut sim = Simulation::from_config(&config).unwrap();
        for _ in 0..8 {
            sim.tick(None);
        }
        assert_eq!(sim.logger().map(|l| l.entry_count()), Some(5));
        assert!(simulation().logger().is_none());
    }

    #[test]
    fn test_tuning_pass_through() {
        let mut sim = simulation();
        let snap = sim.set_map_cell(MapType::Fuel, 3000.0, 50.0, 1.5);
        assert!(snap.is_exact());
        let maps = sim.calibration();
        assert_eq!(maps[0].values[snap.rpm_index][snap.load_index], 1.5);

        sim.apply_preset(TuningPreset::by_name("Performance").unwrap());
        assert_eq!(sim.ecu().settings().ignition_trim_deg, 2.0);
    }

    #[test]
    fn test_same_seed_same_run() {
        let mut a = simulation();
        let mut b = simulation();
        for _ in 0..40 {
            let ta = a.tick(Some(ControlInput::new(60.0, 1.0, 0)));
            let tb = b.tick(Some(ControlInput::new(60.0, 1.0, 0)));
            assert_eq!(ta.rpm, tb.rpm);
            assert_eq!(ta.afr_current, tb.afr_current);
        }
    }
}
