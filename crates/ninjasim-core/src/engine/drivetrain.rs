//! Drivetrain regimes
//!
//! How engine torque reaches the road depends on the clutch and gear:
//! free-revving (no coupling), slipping clutch, or locked drivetrain.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{ActuatorCommand, Engine, CLOSED_THROTTLE};
use crate::physics;

/// Clutch position at or above which the clutch is fully disengaged
pub const CLUTCH_DISENGAGED: f64 = 0.95;

const IDLE_FLOOR_RPM: f64 = 800.0;
const IDLE_PULL_DOWN_RATE: f64 = 500.0;
const IDLE_PULL_UP_RATE: f64 = 300.0;
const FRICTION_PER_RPM: f64 = 0.001;
const TORQUE_TO_RPM_GAIN: f64 = 10.0;
/// Fraction of the clutch slip the friction plates absorb per second
const SLIP_PULLDOWN_RATE: f64 = 0.5;
const CRANKING_RPM: f64 = 300.0;
const STALL_RPM: f64 = 1000.0;
const STALL_RATE: f64 = 2.0;
const STOPPED_KMH: f64 = 1.0;
const KMH_PER_MS: f64 = 3.6;
const ACCELERATION_RUN_DT: f64 = 0.05;
const ACCELERATION_RUN_LIMIT_S: f64 = 30.0;
const LAUNCH_CLUTCH: f64 = 0.5;
const LAUNCH_LOCK_KMH: f64 = 12.0;

/// How the engine is coupled to the rear wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrivetrainRegime {
    /// Clutch pulled or neutral
    FreeRevving,
    /// Clutch partially engaged
    Slipping,
    /// Clutch fully engaged in gear
    Locked,
}

impl DrivetrainRegime {
    /// Regime for a clutch position and gear
    pub fn select(clutch_position: f64, gear: usize) -> Self {
        if gear == 0 || clutch_position >= CLUTCH_DISENGAGED {
            DrivetrainRegime::FreeRevving
        } else if clutch_position > 0.0 {
            DrivetrainRegime::Slipping
        } else {
            DrivetrainRegime::Locked
        }
    }
}

impl Engine {
    /// Active drivetrain regime
    pub fn regime(&self) -> DrivetrainRegime {
        DrivetrainRegime::select(self.clutch_position, self.gear)
    }

    pub(super) fn update_free_revving(&mut self, command: &ActuatorCommand, dt: f64) {
        if self.stalled {
            self.stalled = false;
            self.rpm = self.rpm.max(CRANKING_RPM);
            tracing::info!("engine restarted");
        }

        let torque = self.engine_torque(command);
        self.rpm += self.free_rpm_rate(torque) * dt;
        self.apply_idle_governor(command.target_idle_rpm, dt);
        self.clutch_slip = 0.0;

        let resistance = self.drag_force() + self.rolling_force() + self.brake_force();
        let decel = resistance / self.chassis.mass * KMH_PER_MS * dt;
        self.speed = (self.speed - decel.min(self.speed)).max(0.0);
    }

    pub(super) fn update_slipping(&mut self, command: &ActuatorCommand, dt: f64) {
        if self.stalled {
            self.coast_stalled(dt);
            return;
        }

        let torque = self.engine_torque(command);
        let transfer = 1.0 - self.clutch_position;
        let input_rpm = self.gearbox_input_rpm();

        let clutch_torque = if self.rpm >= input_rpm {
            torque * transfer
        } else {
            -physics::engine_braking(
                self.rpm,
                self.specs.displacement,
                self.specs.compression_ratio,
            ) * transfer
        };

        let net = self.wheel_force(clutch_torque)
            - self.drag_force()
            - self.rolling_force()
            - self.brake_force()
            - self.grade_force();
        self.integrate_speed(net, dt);

        self.clutch_slip = (self.rpm - input_rpm) * transfer;
        let rate = self.free_rpm_rate(torque) * self.clutch_position
            - self.clutch_slip * SLIP_PULLDOWN_RATE;
        self.rpm += rate * dt;
        self.apply_idle_governor(command.target_idle_rpm, dt);
    }

    pub(super) fn update_locked(&mut self, command: &ActuatorCommand, dt: f64) {
        let mut torque = self.engine_torque(command);
        if self.throttle_position < CLOSED_THROTTLE {
            torque -= physics::engine_braking(
                self.rpm,
                self.specs.displacement,
                self.specs.compression_ratio,
            );
        }

        let net = self.wheel_force(torque)
            - self.drag_force()
            - self.rolling_force()
            - self.grade_force()
            - self.brake_force();
        self.integrate_speed(net, dt);

        self.rpm = self.gearbox_input_rpm().min(self.specs.overrev_rpm());
        self.clutch_slip = 0.0;
        self.check_stall(dt);
    }

    /// Dead engine with the clutch partly out: the crank stays at rest until
    /// the clutch is pulled or neutral is selected.
    fn coast_stalled(&mut self, dt: f64) {
        let resistance =
            self.drag_force() + self.rolling_force() + self.brake_force() + self.grade_force();
        self.integrate_speed(-resistance, dt);
        self.rpm = 0.0;
        self.clutch_slip = 0.0;
    }

    fn check_stall(&mut self, dt: f64) {
        if self.stalled
            || self.speed >= STOPPED_KMH
            || self.throttle_position >= CLOSED_THROTTLE
            || self.rpm >= STALL_RPM
        {
            return;
        }

        let probability = (1.0 - self.rpm / STALL_RPM) * STALL_RATE * dt;
        if self.rng.gen::<f64>() < probability {
            tracing::warn!(rpm = self.rpm, gear = self.gear, "engine stalled");
            self.rpm = 0.0;
            self.stalled = true;
        }
    }

    fn free_rpm_rate(&self, torque: f64) -> f64 {
        (torque - self.rpm * FRICTION_PER_RPM) * TORQUE_TO_RPM_GAIN
            / self.chassis.rotational_inertia
    }

    fn apply_idle_governor(&mut self, target_idle_rpm: f64, dt: f64) {
        if self.throttle_position >= CLOSED_THROTTLE || self.stalled {
            return;
        }
        let target = target_idle_rpm.max(IDLE_FLOOR_RPM);
        if self.rpm > target {
            self.rpm -= (self.rpm - target).min(IDLE_PULL_DOWN_RATE * dt);
        } else if self.rpm < target {
            self.rpm += (target - self.rpm).min(IDLE_PULL_UP_RATE * dt);
        }
    }

    fn gearbox_input_rpm(&self) -> f64 {
        physics::rpm_from_speed(
            self.speed,
            self.gear,
            &self.specs.gear_ratios,
            self.specs.final_drive_ratio,
            self.specs.wheel_circumference,
        )
    }

    fn wheel_force(&self, engine_torque: f64) -> f64 {
        let wheel_torque = physics::wheel_torque_from_engine_torque(
            engine_torque,
            self.gear,
            &self.specs.gear_ratios,
            self.specs.final_drive_ratio,
            self.chassis.drivetrain_efficiency,
        );
        wheel_torque / self.specs.wheel_radius()
    }

    fn air_density(&self) -> f64 {
        physics::air_density(self.environment.altitude, self.environment.ambient_temp)
            * physics::humidity_density_factor(self.environment.humidity)
    }

    fn drag_force(&self) -> f64 {
        physics::aerodynamic_drag(
            self.speed,
            self.chassis.drag_coefficient,
            self.chassis.frontal_area,
            self.air_density(),
        )
    }

    fn rolling_force(&self) -> f64 {
        physics::rolling_resistance(
            self.speed,
            self.chassis.mass,
            self.chassis.rolling_resistance_coefficient,
        )
    }

    fn grade_force(&self) -> f64 {
        physics::grade_force(self.chassis.mass, self.environment.road_grade_pct)
    }

    fn brake_force(&self) -> f64 {
        if self.brake_applied {
            self.chassis.brake_force
        } else {
            0.0
        }
    }

    fn integrate_speed(&mut self, net_force: f64, dt: f64) {
        let acceleration = net_force / self.chassis.mass;
        self.speed = (self.speed + acceleration * dt * KMH_PER_MS).max(0.0);
    }

    /// Seconds to reach `target_kmh` from a standing start at full throttle,
    /// or `None` if the target is not reached within 30 s.
    ///
    /// Runs on a copy of the engine with stock fuelling and best timing; the
    /// engine itself is not modified.
    pub fn simulate_acceleration(&self, target_kmh: f64) -> Option<f64> {
        if !target_kmh.is_finite() {
            return None;
        }

        let mut run = self.clone();
        run.speed = 0.0;
        run.stalled = false;
        run.limiter_cut = false;
        run.rpm = self.specs.idle_rpm;
        run.set_brake(false);
        run.set_throttle(100.0);
        run.set_gear(1);
        run.set_clutch(LAUNCH_CLUTCH);

        let shift_points = run.optimal_shift_points();
        let top_gear = run.specs.top_gear();
        let mut elapsed = 0.0;

        while elapsed < ACCELERATION_RUN_LIMIT_S {
            if run.speed >= target_kmh {
                return Some(elapsed);
            }

            if run.clutch_position > 0.0 && run.speed >= LAUNCH_LOCK_KMH {
                run.set_clutch(0.0);
            }
            if run.regime() == DrivetrainRegime::Locked
                && run.gear < top_gear
                && run.rpm >= shift_points[run.gear]
            {
                run.gear += 1;
            }

            let command = ActuatorCommand {
                fuel_injection_ms: run.stock_injection_time(),
                ignition_advance_deg: run.optimal_timing(),
                target_idle_rpm: run.specs.idle_rpm,
                lambda_target: 1.0,
                rev_limit_rpm: run.specs.redline_rpm,
            };
            run.update(&command, ACCELERATION_RUN_DT);
            elapsed += ACCELERATION_RUN_DT;
        }

        (run.speed >= target_kmh).then_some(elapsed)
    }
}
