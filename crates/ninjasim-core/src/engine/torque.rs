//! Torque production
//!
//! Baseline torque curve and the multipliers applied to it: mixture,
//! ignition timing, knock margin and operating environment.

use super::{ActuatorCommand, Engine};
use crate::physics::{self, DYNO_CONSTANT, SEA_LEVEL_AIR_DENSITY};

const LOW_RPM_FRACTION: f64 = 0.1;
const LOW_RPM_TORQUE: f64 = 0.2;
const REDLINE_TORQUE: f64 = 0.7;

impl Engine {
    /// Baseline torque (Nm) at the current RPM before any multipliers
    pub fn calculate_baseline_torque(&self) -> f64 {
        self.baseline_torque_at(self.rpm)
    }

    /// Baseline torque curve: flat at 20 % of peak below 10 % of max RPM,
    /// rising linearly to peak at `max_torque_rpm`, then tapering to 70 %.
    pub fn baseline_torque_at(&self, rpm: f64) -> f64 {
        let max_torque = self.specs.max_torque;
        let p = (rpm / self.specs.max_rpm).max(0.0);
        let peak = (self.specs.max_torque_rpm / self.specs.max_rpm).clamp(LOW_RPM_FRACTION, 1.0);

        let fraction = if p < LOW_RPM_FRACTION {
            LOW_RPM_TORQUE
        } else if p < peak {
            LOW_RPM_TORQUE
                + (1.0 - LOW_RPM_TORQUE) * (p - LOW_RPM_FRACTION) / (peak - LOW_RPM_FRACTION)
        } else if peak < 1.0 {
            1.0 - (1.0 - REDLINE_TORQUE) * (p - peak) / (1.0 - peak)
        } else {
            1.0
        };

        max_torque * fraction
    }

    /// Injection time (ms) a stock ECU would command at the current state
    pub fn stock_injection_time(&self) -> f64 {
        let idle = self.specs.idle_rpm;
        let span = (self.specs.max_rpm - idle).max(1.0);
        let rpm_factor = 1.0 + 0.5 * (self.rpm - idle) / span;
        let throttle_factor = 0.5 + 0.5 * self.throttle_position / 100.0;
        2.0 * rpm_factor * throttle_factor
    }

    /// Best-torque ignition advance (degrees) at the current state
    pub fn optimal_timing(&self) -> f64 {
        let p = self.rpm / self.specs.max_rpm;
        10.0 + 20.0 * p - 5.0 * self.throttle_position / 100.0
    }

    /// Advance (degrees) beyond which the engine detonates
    pub fn knock_limit_deg(&self) -> f64 {
        let env = &self.environment;
        44.0 + 1.5 * (env.fuel_octane - 91.0)
            - 6.0 * self.carbon_buildup
            - 0.2 * (self.engine_temp - 100.0).max(0.0)
    }

    /// Combined effect of intake air, fuel and engine condition
    pub fn environment_multiplier(&self) -> f64 {
        let env = &self.environment;
        let filter = 1.0 - 0.25 * env.air_filter_restriction;
        let density = physics::air_density(env.altitude, env.ambient_temp)
            * physics::humidity_density_factor(env.humidity)
            / SEA_LEVEL_AIR_DENSITY;
        let fuel = 0.85 + 0.15 * env.fuel_quality;
        let wear = 1.0 - 0.15 * self.engine_wear;
        let carbon = 1.0 - 0.08 * self.carbon_buildup;
        filter * density * fuel * wear * carbon
    }

    /// Torque (Nm) produced for a command at the current state
    pub(crate) fn engine_torque(&self, command: &ActuatorCommand) -> f64 {
        if self.stalled || self.limiter_cut {
            return 0.0;
        }

        self.calculate_baseline_torque()
            * self.fuel_effect(command.fuel_injection_ms)
            * self.timing_effect(command.ignition_advance_deg)
            * self.knock_margin_effect(command.ignition_advance_deg)
            * (self.throttle_position / 100.0)
            * self.environment_multiplier()
    }

    fn fuel_effect(&self, fuel_injection_ms: f64) -> f64 {
        if fuel_injection_ms <= 0.0 {
            return 0.0;
        }
        let ratio = fuel_injection_ms / self.stock_injection_time();
        if (0.8..=1.3).contains(&ratio) {
            ratio
        } else {
            ratio.clamp(0.5, 1.1)
        }
    }

    fn timing_effect(&self, advance: f64) -> f64 {
        let delta = advance - self.optimal_timing();
        if delta > 0.0 {
            (1.0 + delta * 0.01).min(1.1)
        } else {
            (1.0 + delta * 0.03).max(0.7)
        }
    }

    fn knock_margin_effect(&self, advance: f64) -> f64 {
        let margin = self.knock_limit_deg() - advance;
        if margin < 0.0 {
            0.6
        } else if margin < 2.0 {
            0.85
        } else if margin < 5.0 {
            0.95
        } else {
            1.0
        }
    }

    /// Rear-wheel `(power_hp, torque_nm)` at the current RPM and throttle
    pub fn calculate_performance(&self) -> (f64, f64) {
        let (torque_mult, power_mult) = physics::exhaust_effect(self.rpm, self.exhaust);
        let torque =
            self.calculate_baseline_torque() * (self.throttle_position / 100.0) * torque_mult;
        let power = torque * self.rpm / DYNO_CONSTANT * power_mult;
        (power, torque)
    }
}
