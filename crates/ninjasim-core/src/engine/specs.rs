//! Engine, chassis and environment parameters

use serde::{Deserialize, Serialize};

use crate::physics::wheel_circumference;

/// Fixed engine and gearing specifications
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSpecs {
    /// Displacement (cc)
    pub displacement: f64,
    /// Static compression ratio
    pub compression_ratio: f64,
    /// RPM used to normalise the torque curve
    pub max_rpm: f64,
    /// Warm idle speed
    pub idle_rpm: f64,
    /// Peak torque (Nm)
    pub max_torque: f64,
    /// RPM of peak torque
    pub max_torque_rpm: f64,
    /// Redline; the limiter overshoot is capped at 105 % of it
    pub redline_rpm: f64,
    /// Index 0 is neutral
    pub gear_ratios: [f64; 7],
    /// Sprocket ratio
    pub final_drive_ratio: f64,
    /// Rear wheel circumference (m)
    pub wheel_circumference: f64,
}

impl Default for EngineSpecs {
    fn default() -> Self {
        Self {
            displacement: 649.0,
            compression_ratio: 10.8,
            max_rpm: 11000.0,
            idle_rpm: 900.0,
            max_torque: 65.7,
            max_torque_rpm: 6500.0,
            redline_rpm: 10500.0,
            gear_ratios: [0.0, 2.438, 1.714, 1.333, 1.111, 0.966, 0.852],
            final_drive_ratio: 3.067,
            // 17 inch wheel
            wheel_circumference: wheel_circumference(0.43),
        }
    }
}

impl EngineSpecs {
    /// Highest RPM the engine can physically reach
    pub fn overrev_rpm(&self) -> f64 {
        self.redline_rpm * 1.05
    }

    /// Effective rolling radius (m)
    pub fn wheel_radius(&self) -> f64 {
        self.wheel_circumference / (2.0 * std::f64::consts::PI)
    }

    /// Number of forward gears
    pub fn top_gear(&self) -> usize {
        self.gear_ratios.len() - 1
    }
}

/// Vehicle body and drivetrain properties
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChassisSpecs {
    /// Wet mass with rider (kg)
    pub mass: f64,
    /// Frontal area (m²)
    pub frontal_area: f64,
    /// Cd
    pub drag_coefficient: f64,
    /// Crr
    pub rolling_resistance_coefficient: f64,
    /// Gearbox + chain efficiency (0-1)
    pub drivetrain_efficiency: f64,
    /// Crank/flywheel inertia (kg·m²)
    pub rotational_inertia: f64,
    /// Braking force with the brake applied (N)
    pub brake_force: f64,
}

impl Default for ChassisSpecs {
    fn default() -> Self {
        Self {
            mass: 196.0,
            frontal_area: 0.7,
            drag_coefficient: 0.35,
            rolling_resistance_coefficient: 0.015,
            drivetrain_efficiency: 0.9,
            rotational_inertia: 0.12,
            brake_force: 1500.0,
        }
    }
}

/// Operating environment and consumables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Environment {
    /// Ambient / intake air temperature (°C)
    pub ambient_temp: f64,
    /// Metres above sea level
    pub altitude: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Research octane number
    pub fuel_octane: f64,
    /// 1 = perfect fuel, 0 = contaminated
    pub fuel_quality: f64,
    /// 0 = clean filter, 1 = fully clogged
    pub air_filter_restriction: f64,
    /// Road grade (%), positive uphill
    pub road_grade_pct: f64,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            ambient_temp: 25.0,
            altitude: 0.0,
            humidity: 50.0,
            fuel_octane: 91.0,
            fuel_quality: 1.0,
            air_filter_restriction: 0.0,
            road_grade_pct: 0.0,
        }
    }
}

impl Environment {
    /// Clamp every field into its physical range
    pub fn sanitized(self) -> Self {
        let defaults = Environment::default();
        let finite_or = |v: f64, d: f64| if v.is_finite() { v } else { d };
        Self {
            ambient_temp: finite_or(self.ambient_temp, defaults.ambient_temp).clamp(-40.0, 60.0),
            altitude: finite_or(self.altitude, defaults.altitude).clamp(-500.0, 6000.0),
            humidity: finite_or(self.humidity, defaults.humidity).clamp(0.0, 100.0),
            fuel_octane: finite_or(self.fuel_octane, defaults.fuel_octane).clamp(80.0, 110.0),
            fuel_quality: finite_or(self.fuel_quality, defaults.fuel_quality).clamp(0.0, 1.0),
            air_filter_restriction: finite_or(
                self.air_filter_restriction,
                defaults.air_filter_restriction,
            )
            .clamp(0.0, 1.0),
            road_grade_pct: finite_or(self.road_grade_pct, defaults.road_grade_pct)
                .clamp(-30.0, 30.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_sanitized() {
        let env = Environment {
            humidity: 140.0,
            fuel_quality: -1.0,
            altitude: f64::NAN,
            ..Environment::default()
        }
        .sanitized();
        assert_eq!(env.humidity, 100.0);
        assert_eq!(env.fuel_quality, 0.0);
        assert_eq!(env.altitude, 0.0);
    }

    #[test]
    fn test_partial_specs_from_json() {
        let specs: EngineSpecs = serde_json::from_str(r#"{"redline_rpm": 9000.0}"#).unwrap();
        assert_eq!(specs.redline_rpm, 9000.0);
        assert_eq!(specs.max_torque, 65.7);
        assert!((specs.overrev_rpm() - 9450.0).abs() < 1e-9);
    }
}
