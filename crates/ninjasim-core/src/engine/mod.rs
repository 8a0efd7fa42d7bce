//! Engine Model
//!
//! Physical model of the engine and drivetrain. Each tick consumes one
//! [`ActuatorCommand`] from the ECU, advances RPM and road speed through the
//! active drivetrain regime, ages the engine and refreshes the sensor
//! readings returned by [`Engine::sensor_snapshot`].

mod drivetrain;
mod specs;
mod torque;

pub use drivetrain::DrivetrainRegime;
pub use specs::{ChassisSpecs, EngineSpecs, Environment};

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::physics::{self, ExhaustType};

/// Throttle (%) below which the engine is considered closed-throttle
pub const CLOSED_THROTTLE: f64 = 5.0;

const LIMITER_BOUNCE_RPM: f64 = 200.0;
const O2_NOISE: f64 = 0.025;
const MAX_ENGINE_TEMP: f64 = 120.0;
const WEAR_RATE: f64 = 3.5e-6;
const CARBON_RATE: f64 = 1.0e-6;
const RICH_LAMBDA: f64 = 0.95;

/// Sensor readings taken at the end of a tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorSnapshot {
    /// Engine speed
    pub rpm: f64,
    /// Throttle opening (0-100 %)
    pub throttle_position: f64,
    /// Intake air temperature (°C)
    pub air_temp: f64,
    /// Coolant temperature (°C)
    pub engine_temp: f64,
    /// Manifold absolute pressure (kPa)
    pub manifold_absolute_pressure: f64,
    /// Measured lambda from the wideband O2 sensor
    pub o2_lambda: f64,
    /// Road speed (km/h)
    pub speed: f64,
    /// Nanoseconds since the Unix epoch
    pub timestamp: i64,
}

/// Outputs computed by the ECU for one tick
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ActuatorCommand {
    /// Injector pulse width (ms)
    pub fuel_injection_ms: f64,
    /// Degrees before top dead centre
    pub ignition_advance_deg: f64,
    /// Idle speed the governor aims for
    pub target_idle_rpm: f64,
    /// Target AFR / stoichiometric
    pub lambda_target: f64,
    /// Limiter threshold, 0 disables
    pub rev_limit_rpm: f64,
}

/// Motorcycle engine, drivetrain and chassis
#[derive(Debug, Clone)]
pub struct Engine {
    specs: EngineSpecs,
    chassis: ChassisSpecs,
    environment: Environment,
    exhaust: ExhaustType,

    rpm: f64,
    throttle_position: f64,
    clutch_position: f64,
    gear: usize,
    speed: f64,
    brake_applied: bool,

    engine_temp: f64,
    manifold_pressure: f64,
    o2_lambda: f64,
    engine_wear: f64,
    carbon_buildup: f64,
    clutch_slip: f64,
    stalled: bool,
    limiter_cut: bool,

    rng: StdRng,
}

impl Engine {
    /// Create an engine idling in neutral with the clutch pulled
    pub fn new(
        specs: EngineSpecs,
        chassis: ChassisSpecs,
        environment: Environment,
        exhaust: ExhaustType,
        rng: StdRng,
    ) -> Self {
        let environment = environment.sanitized();
        let manifold_pressure =
            physics::atmospheric_pressure(environment.altitude, environment.ambient_temp);
        Self {
            rpm: specs.idle_rpm.min(specs.overrev_rpm()).max(0.0),
            specs,
            chassis,
            environment,
            exhaust,
            throttle_position: 0.0,
            clutch_position: 1.0,
            gear: 0,
            speed: 0.0,
            brake_applied: false,
            engine_temp: 90.0,
            manifold_pressure,
            o2_lambda: 1.0,
            engine_wear: 0.0,
            carbon_buildup: 0.0,
            clutch_slip: 0.0,
            stalled: false,
            limiter_cut: false,
            rng,
        }
    }

    /// Kawasaki Ninja 650 with a Yoshimura Alpha 2 slip-on
    pub fn ninja650(rng: StdRng) -> Self {
        Self::new(
            EngineSpecs::default(),
            ChassisSpecs::default(),
            Environment::default(),
            ExhaustType::YoshimuraAlpha2,
            rng,
        )
    }

    /// Current sensor readings
    pub fn sensor_snapshot(&self) -> SensorSnapshot {
        SensorSnapshot {
            rpm: self.rpm,
            throttle_position: self.throttle_position,
            air_temp: self.environment.ambient_temp,
            engine_temp: self.engine_temp,
            manifold_absolute_pressure: self.manifold_pressure,
            o2_lambda: self.o2_lambda,
            speed: self.speed,
            timestamp: chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default(),
        }
    }

    /// Advance the model by `dt` seconds using the ECU's command
    pub fn update(&mut self, command: &ActuatorCommand, dt: f64) {
        if !(dt.is_finite() && dt > 0.0) {
            return;
        }

        match self.regime() {
            DrivetrainRegime::FreeRevving => self.update_free_revving(command, dt),
            DrivetrainRegime::Slipping => self.update_slipping(command, dt),
            DrivetrainRegime::Locked => self.update_locked(command, dt),
        }

        self.apply_rev_limiter(command.rev_limit_rpm);
        self.rpm = self.rpm.min(self.specs.overrev_rpm()).max(0.0);

        self.update_wear(dt);
        self.update_sensors(command, dt);
    }

    fn apply_rev_limiter(&mut self, rev_limit: f64) {
        if rev_limit > 0.0 && self.rpm > rev_limit {
            if !self.limiter_cut {
                tracing::warn!(rpm = self.rpm, rev_limit, "rev limiter hit");
            }
            let bounce = self.rng.gen_range(0.0..LIMITER_BOUNCE_RPM);
            self.rpm = rev_limit - bounce;
            self.limiter_cut = true;
        } else {
            self.limiter_cut = false;
        }
    }

    fn update_wear(&mut self, dt: f64) {
        let load = self.rpm / self.specs.max_rpm;
        let throttle = self.throttle_position / 100.0;
        let fuel_penalty = 2.0 - self.environment.fuel_quality;

        let heat = ((self.engine_temp - 90.0) * 0.02).max(1.0);
        let wear = WEAR_RATE * load * load * heat * (1.0 + throttle) * fuel_penalty * dt;
        self.engine_wear = (self.engine_wear + wear).clamp(0.0, 1.0);

        let mut carbon = CARBON_RATE * (1.0 - self.throttle_position / 200.0) * fuel_penalty * dt;
        if self.o2_lambda < RICH_LAMBDA {
            carbon *= 2.0;
        }
        self.carbon_buildup = (self.carbon_buildup + carbon).clamp(0.0, 1.0);
    }

    fn update_sensors(&mut self, command: &ActuatorCommand, dt: f64) {
        let stock_fuel = self.stock_injection_time();
        let lambda = if command.fuel_injection_ms > 0.0 {
            stock_fuel / command.fuel_injection_ms
        } else {
            2.0
        };
        let noise = self.rng.gen_range(-O2_NOISE..O2_NOISE);
        self.o2_lambda = (lambda + noise).clamp(0.5, 2.0);

        let load = self.rpm / self.specs.max_rpm;
        let throttle = self.throttle_position / 100.0;
        let vacuum = 30.0 * load;
        self.manifold_pressure = physics::atmospheric_pressure(
            self.environment.altitude,
            self.environment.ambient_temp,
        ) - vacuum
            + vacuum * throttle;

        let ambient = self.environment.ambient_temp;
        let heating = 0.01 * (self.rpm / 1000.0) * (0.5 + 0.5 * throttle);
        let cooling = 0.005 * (self.engine_temp - ambient);
        self.engine_temp = (self.engine_temp + (heating - cooling) * dt)
            .min(MAX_ENGINE_TEMP)
            .max(ambient);
    }

    /// Set the throttle opening, clamped to 0-100 %
    pub fn set_throttle(&mut self, position: f64) {
        if position.is_finite() {
            self.throttle_position = position.clamp(0.0, 100.0);
        }
    }

    /// Set the clutch lever, clamped to 0 (engaged) - 1 (pulled)
    pub fn set_clutch(&mut self, position: f64) {
        if position.is_finite() {
            self.clutch_position = position.clamp(0.0, 1.0);
        }
    }

    /// Select a gear, clamped to neutral - top gear
    pub fn set_gear(&mut self, gear: i32) {
        let top = i32::try_from(self.specs.top_gear()).unwrap_or(i32::MAX);
        self.gear = usize::try_from(gear.clamp(0, top)).unwrap_or(0);
    }

    /// Apply or release the brake
    pub fn set_brake(&mut self, applied: bool) {
        self.brake_applied = applied;
    }

    /// Replace the operating environment (values are clamped)
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = environment.sanitized();
    }

    /// Fuel octane rating (RON)
    pub fn set_fuel_octane(&mut self, octane: f64) {
        self.set_environment(Environment {
            fuel_octane: octane,
            ..self.environment.clone()
        });
    }

    /// Air filter restriction, 0 clean - 1 clogged
    pub fn set_air_filter_restriction(&mut self, restriction: f64) {
        self.set_environment(Environment {
            air_filter_restriction: restriction,
            ..self.environment.clone()
        });
    }

    /// Altitude (m) and ambient temperature (°C)
    pub fn set_atmosphere(&mut self, altitude: f64, ambient_temp: f64) {
        self.set_environment(Environment {
            altitude,
            ambient_temp,
            ..self.environment.clone()
        });
    }

    /// Relative humidity (%)
    pub fn set_humidity(&mut self, humidity: f64) {
        self.set_environment(Environment {
            humidity,
            ..self.environment.clone()
        });
    }

    /// Fuel quality, 0 contaminated - 1 perfect
    pub fn set_fuel_quality(&mut self, quality: f64) {
        self.set_environment(Environment {
            fuel_quality: quality,
            ..self.environment.clone()
        });
    }

    /// Road grade (%), positive uphill
    pub fn set_road_grade(&mut self, grade_pct: f64) {
        self.set_environment(Environment {
            road_grade_pct: grade_pct,
            ..self.environment.clone()
        });
    }

    /// Override accumulated wear and carbon (both clamped to 0-1)
    pub fn set_condition(&mut self, engine_wear: f64, carbon_buildup: f64) {
        if engine_wear.is_finite() {
            self.engine_wear = engine_wear.clamp(0.0, 1.0);
        }
        if carbon_buildup.is_finite() {
            self.carbon_buildup = carbon_buildup.clamp(0.0, 1.0);
        }
    }

    /// Change the fitted exhaust
    pub fn set_exhaust(&mut self, exhaust: ExhaustType) {
        self.exhaust = exhaust;
    }

    /// Engine and gearing specifications
    pub fn specs(&self) -> &EngineSpecs {
        &self.specs
    }

    /// Chassis specifications
    pub fn chassis(&self) -> &ChassisSpecs {
        &self.chassis
    }

    /// Current operating environment
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Fitted exhaust
    pub fn exhaust(&self) -> ExhaustType {
        self.exhaust
    }

    /// Engine speed
    pub fn rpm(&self) -> f64 {
        self.rpm
    }

    /// Throttle opening (0-100 %)
    pub fn throttle_position(&self) -> f64 {
        self.throttle_position
    }

    /// Clutch lever, 0 engaged - 1 pulled
    pub fn clutch_position(&self) -> f64 {
        self.clutch_position
    }

    /// Selected gear, 0 = neutral
    pub fn gear(&self) -> usize {
        self.gear
    }

    /// Road speed (km/h)
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Whether the brake is on
    pub fn is_brake_applied(&self) -> bool {
        self.brake_applied
    }

    /// Coolant temperature (°C)
    pub fn engine_temp(&self) -> f64 {
        self.engine_temp
    }

    /// Intake air temperature (°C)
    pub fn air_temp(&self) -> f64 {
        self.environment.ambient_temp
    }

    /// Manifold absolute pressure (kPa)
    pub fn manifold_pressure(&self) -> f64 {
        self.manifold_pressure
    }

    /// Last O2 sensor reading (lambda)
    pub fn o2_lambda(&self) -> f64 {
        self.o2_lambda
    }

    /// Accumulated wear, 0-1
    pub fn engine_wear(&self) -> f64 {
        self.engine_wear
    }

    /// Accumulated carbon deposits, 0-1
    pub fn carbon_buildup(&self) -> f64 {
        self.carbon_buildup
    }

    /// RPM difference across the clutch at the last tick, scaled by engagement
    pub fn clutch_slip(&self) -> f64 {
        self.clutch_slip
    }

    /// Whether the engine has stalled
    pub fn is_stalled(&self) -> bool {
        self.stalled
    }

    /// Upshift RPM per gear for this engine
    pub fn optimal_shift_points(&self) -> [f64; 7] {
        physics::optimal_shift_points(self.specs.max_torque_rpm, self.specs.redline_rpm)
    }

    /// Road speed (km/h) at `rpm` in `gear`
    pub fn speed_at_rpm(&self, rpm: f64, gear: usize) -> f64 {
        physics::speed_from_rpm(
            rpm,
            gear,
            &self.specs.gear_ratios,
            self.specs.final_drive_ratio,
            self.specs.wheel_circumference,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn engine() -> Engine {
        Engine::ninja650(StdRng::seed_from_u64(7))
    }

    #[test]
    fn test_initial_state() {
        let engine = engine();
        assert_eq!(engine.rpm(), 900.0);
        assert_eq!(engine.gear(), 0);
        assert_eq!(engine.clutch_position(), 1.0);
        assert_eq!(engine.regime(), DrivetrainRegime::FreeRevving);
        assert!((engine.manifold_pressure() - 101.325).abs() < 1e-9);
    }

    #[test]
    fn test_setters_clamp() {
        let mut engine = engine();
        engine.set_throttle(150.0);
        engine.set_clutch(-0.5);
        engine.set_gear(9);
        assert_eq!(engine.throttle_position(), 100.0);
        assert_eq!(engine.clutch_position(), 0.0);
        assert_eq!(engine.gear(), 6);
        engine.set_gear(-1);
        assert_eq!(engine.gear(), 0);

        engine.set_throttle(f64::NAN);
        assert_eq!(engine.throttle_position(), 100.0);

        engine.set_condition(2.0, -1.0);
        assert_eq!(engine.engine_wear(), 1.0);
        assert_eq!(engine.carbon_buildup(), 0.0);
    }

    #[test]
    fn test_snapshot_reflects_state() {
        let mut engine = engine();
        engine.set_throttle(42.0);
        let snapshot = engine.sensor_snapshot();
        assert_eq!(snapshot.rpm, 900.0);
        assert_eq!(snapshot.throttle_position, 42.0);
        assert_eq!(snapshot.air_temp, 25.0);
        assert!(snapshot.timestamp > 0);
    }

    #[test]
    fn test_wear_and_carbon_accumulate() {
        let mut engine = engine();
        let command = ActuatorCommand {
            fuel_injection_ms: engine.stock_injection_time(),
            ignition_advance_deg: 10.0,
            target_idle_rpm: 900.0,
            lambda_target: 1.0,
            rev_limit_rpm: 11000.0,
        };
        for _ in 0..100 {
            engine.update(&command, 0.05);
        }
        assert!(engine.engine_wear() > 0.0);
        assert!(engine.carbon_buildup() > 0.0);
        assert!(engine.engine_wear() < 1e-3);
    }

    #[test]
    fn test_rich_mixture_reads_low_lambda() {
        let mut engine = engine();
        let stock = engine.stock_injection_time();
        let command = ActuatorCommand {
            fuel_injection_ms: stock * 1.25,
            ignition_advance_deg: 10.0,
            target_idle_rpm: 900.0,
            lambda_target: 1.0,
            rev_limit_rpm: 11000.0,
        };
        engine.update(&command, 0.05);
        assert!((engine.o2_lambda() - 0.8).abs() <= 0.03, "got {}", engine.o2_lambda());
    }

    #[test]
    fn test_engine_temp_bounded() {
        let mut engine = engine();
        engine.set_environment(Environment {
            ambient_temp: 40.0,
            ..Environment::default()
        });
        let command = ActuatorCommand {
            fuel_injection_ms: 2.0,
            ignition_advance_deg: 10.0,
            target_idle_rpm: 900.0,
            lambda_target: 1.0,
            rev_limit_rpm: 11000.0,
        };
        for _ in 0..2000 {
            engine.update(&command, 0.5);
        }
        assert!(engine.engine_temp() >= 40.0);
        assert!(engine.engine_temp() <= 120.0);
    }

    #[test]
    fn test_invalid_dt_is_ignored() {
        let mut engine = engine();
        engine.set_throttle(100.0);
        let command = ActuatorCommand {
            fuel_injection_ms: 2.0,
            ignition_advance_deg: 10.0,
            target_idle_rpm: 900.0,
            lambda_target: 1.0,
            rev_limit_rpm: 11000.0,
        };
        engine.update(&command, f64::NAN);
        engine.update(&command, -1.0);
        assert_eq!(engine.rpm(), 900.0);
    }
}
