//! Physics Functions
//!
//! Stateless formulas used by the engine model: atmosphere, road loads,
//! drivetrain ratio conversions, exhaust effect curves and shift heuristics.
//! Speeds are km/h at the API boundary and converted to m/s internally.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.81;
/// Air density at sea level, 15 °C (kg/m³)
pub const SEA_LEVEL_AIR_DENSITY: f64 = 1.225;
/// Standard sea level pressure (kPa)
pub const STANDARD_PRESSURE_KPA: f64 = 101.325;
/// Specific gas constant for dry air (J/(kg·K))
pub const DRY_AIR_GAS_CONSTANT: f64 = 287.058;
/// Dynamometer constant: hp = lb·ft × rpm / 5252
pub const DYNO_CONSTANT: f64 = 5252.0;

const KMH_PER_MS: f64 = 3.6;

/// Exhaust system fitted to the bike
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustType {
    /// Factory exhaust
    #[default]
    Stock,
    /// Yoshimura Alpha 2 slip-on
    YoshimuraAlpha2,
    /// Akrapovic full system
    AkrapovicFullSystem,
}

impl fmt::Display for ExhaustType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExhaustType::Stock => "Stock",
            ExhaustType::YoshimuraAlpha2 => "Yoshimura Alpha 2",
            ExhaustType::AkrapovicFullSystem => "Akrapovic Full System",
        };
        f.write_str(name)
    }
}

/// Barometric pressure (kPa) at `altitude` metres for an air temperature in °C
pub fn atmospheric_pressure(altitude: f64, temperature: f64) -> f64 {
    let temp_k = temperature + 273.15;
    STANDARD_PRESSURE_KPA * (-GRAVITY * altitude / (DRY_AIR_GAS_CONSTANT * temp_k)).exp()
}

/// Dry air density (kg/m³) from altitude (m) and temperature (°C)
pub fn air_density(altitude: f64, temperature: f64) -> f64 {
    let temp_k = temperature + 273.15;
    // kPa -> Pa
    atmospheric_pressure(altitude, temperature) * 1000.0 / (DRY_AIR_GAS_CONSTANT * temp_k)
}

/// Water vapour displaces oxygen; fully saturated air is about 4 % less dense.
pub fn humidity_density_factor(relative_humidity_pct: f64) -> f64 {
    1.0 - 0.04 * (relative_humidity_pct.clamp(0.0, 100.0) / 100.0)
}

/// Aerodynamic drag force (N): 0.5 · ρ · v² · Cd · A
pub fn aerodynamic_drag(
    speed_kmh: f64,
    drag_coefficient: f64,
    frontal_area: f64,
    air_density: f64,
) -> f64 {
    let v = speed_kmh / KMH_PER_MS;
    0.5 * air_density * v * v * drag_coefficient * frontal_area
}

/// Rolling resistance force (N), rising slightly with speed
pub fn rolling_resistance(speed_kmh: f64, mass: f64, coefficient: f64) -> f64 {
    let speed_factor = 1.0 + (speed_kmh / 100.0) * 0.1;
    coefficient * mass * GRAVITY * speed_factor
}

/// Gravity component along the road (N); positive grade is uphill
pub fn grade_force(mass: f64, grade_pct: f64) -> f64 {
    let angle = (grade_pct / 100.0).atan();
    mass * GRAVITY * angle.sin()
}

fn ratio_for(gear: usize, gear_ratios: &[f64]) -> Option<f64> {
    if gear == 0 {
        return None;
    }
    gear_ratios.get(gear).copied().filter(|r| *r > 0.0)
}

/// Engine torque multiplied through the gearbox and final drive.
///
/// Neutral or an unknown gear transmits nothing.
pub fn wheel_torque_from_engine_torque(
    engine_torque: f64,
    gear: usize,
    gear_ratios: &[f64],
    final_drive_ratio: f64,
    efficiency: f64,
) -> f64 {
    match ratio_for(gear, gear_ratios) {
        Some(ratio) => engine_torque * ratio * final_drive_ratio * efficiency,
        None => 0.0,
    }
}

/// Engine RPM implied by road speed in the given gear
pub fn rpm_from_speed(
    speed_kmh: f64,
    gear: usize,
    gear_ratios: &[f64],
    final_drive_ratio: f64,
    wheel_circumference: f64,
) -> f64 {
    let Some(ratio) = ratio_for(gear, gear_ratios) else {
        return 0.0;
    };
    if wheel_circumference <= 0.0 {
        return 0.0;
    }
    let wheel_rpm = (speed_kmh / KMH_PER_MS) * 60.0 / wheel_circumference;
    wheel_rpm * ratio * final_drive_ratio
}

/// Road speed (km/h) implied by engine RPM in the given gear
pub fn speed_from_rpm(
    rpm: f64,
    gear: usize,
    gear_ratios: &[f64],
    final_drive_ratio: f64,
    wheel_circumference: f64,
) -> f64 {
    let Some(ratio) = ratio_for(gear, gear_ratios) else {
        return 0.0;
    };
    if final_drive_ratio <= 0.0 {
        return 0.0;
    }
    let wheel_rpm = rpm / (ratio * final_drive_ratio);
    wheel_rpm * wheel_circumference / 60.0 * KMH_PER_MS
}

/// Wheel circumference (m) from diameter (m)
pub fn wheel_circumference(diameter: f64) -> f64 {
    PI * diameter
}

/// Closed-throttle engine braking torque (Nm).
///
/// Grows with displacement and compression, saturating above 3000 rpm.
pub fn engine_braking(rpm: f64, displacement_cc: f64, compression_ratio: f64) -> f64 {
    let base = displacement_cc * 0.01;
    let rpm_factor = (rpm / 3000.0).clamp(0.0, 1.0);
    base * rpm_factor * (compression_ratio / 10.0)
}

/// Upshift RPM per gear (index 0 = neutral, always 0).
///
/// Low gears run closer to redline for acceleration, tall gears shift nearer
/// peak torque.
pub fn optimal_shift_points(max_torque_rpm: f64, redline_rpm: f64) -> [f64; 7] {
    let band = redline_rpm - max_torque_rpm;
    [
        0.0,
        redline_rpm - band * 0.10,
        redline_rpm - band * 0.15,
        redline_rpm - band * 0.20,
        max_torque_rpm + band * 0.40,
        max_torque_rpm + band * 0.30,
        max_torque_rpm + band * 0.20,
    ]
}

/// Torque and power multipliers of an exhaust at a given RPM.
///
/// Each aftermarket profile has four RPM bands (normalised to 11000 rpm):
/// a flat low band, two rising bands and a tapering top band.
pub fn exhaust_effect(rpm: f64, exhaust: ExhaustType) -> (f64, f64) {
    let n = (rpm / 11000.0).clamp(0.0, 1.0);

    match exhaust {
        ExhaustType::Stock => (1.0, 1.0),
        ExhaustType::YoshimuraAlpha2 => {
            let torque = if n < 0.2 {
                1.02
            } else if n < 0.4 {
                1.03 + 0.02 * (n - 0.2) / 0.2
            } else if n < 0.7 {
                1.05 + 0.05 * (n - 0.4) / 0.3
            } else {
                1.10 - 0.03 * (n - 0.7) / 0.3
            };
            (torque, torque)
        }
        ExhaustType::AkrapovicFullSystem => {
            let torque = if n < 0.2 {
                1.03
            } else if n < 0.4 {
                1.04 + 0.04 * (n - 0.2) / 0.2
            } else if n < 0.7 {
                1.08 + 0.06 * (n - 0.4) / 0.3
            } else {
                1.14 - 0.02 * (n - 0.7) / 0.3
            };
            (torque, torque * 1.01)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATIOS: [f64; 7] = [0.0, 2.438, 1.714, 1.333, 1.111, 0.966, 0.852];

    #[test]
    fn test_air_density_sea_level() {
        let rho = air_density(0.0, 15.0);
        assert!((rho - SEA_LEVEL_AIR_DENSITY).abs() < 0.01, "got {}", rho);
        assert!(air_density(2000.0, 15.0) < rho);
        assert!(air_density(0.0, 35.0) < rho);
    }

    #[test]
    fn test_drag_scales_with_square_of_speed() {
        let d1 = aerodynamic_drag(50.0, 0.35, 0.7, 1.2);
        let d2 = aerodynamic_drag(100.0, 0.35, 0.7, 1.2);
        assert!((d2 / d1 - 4.0).abs() < 1e-9);
        assert_eq!(aerodynamic_drag(0.0, 0.35, 0.7, 1.2), 0.0);
    }

    #[test]
    fn test_rpm_speed_roundtrip() {
        let circ = wheel_circumference(0.43);
        let rpm = rpm_from_speed(60.0, 3, &RATIOS, 3.067, circ);
        let speed = speed_from_rpm(rpm, 3, &RATIOS, 3.067, circ);
        assert!((speed - 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_neutral_transmits_nothing() {
        assert_eq!(wheel_torque_from_engine_torque(60.0, 0, &RATIOS, 3.067, 0.9), 0.0);
        assert_eq!(wheel_torque_from_engine_torque(60.0, 9, &RATIOS, 3.067, 0.9), 0.0);
        assert_eq!(rpm_from_speed(80.0, 0, &RATIOS, 3.067, 1.35), 0.0);
        assert_eq!(speed_from_rpm(5000.0, 0, &RATIOS, 3.067, 1.35), 0.0);
    }

    #[test]
    fn test_shift_points_order() {
        let points = optimal_shift_points(6500.0, 10500.0);
        assert_eq!(points[0], 0.0);
        assert!(points[1] > points[2] && points[2] > points[3]);
        assert!(points[3] > points[4] && points[4] > points[5] && points[5] > points[6]);
        assert!(points[6] > 6500.0);
    }

    #[test]
    fn test_exhaust_effect_bands() {
        assert_eq!(exhaust_effect(6000.0, ExhaustType::Stock), (1.0, 1.0));
        let (low, _) = exhaust_effect(1000.0, ExhaustType::YoshimuraAlpha2);
        let (mid, _) = exhaust_effect(7700.0, ExhaustType::YoshimuraAlpha2);
        assert_eq!(low, 1.02);
        assert!((mid - 1.10).abs() < 1e-9);
        let (t, p) = exhaust_effect(5000.0, ExhaustType::AkrapovicFullSystem);
        assert!(p > t);
    }

    #[test]
    fn test_engine_braking_saturates() {
        let at_3k = engine_braking(3000.0, 649.0, 10.8);
        assert_eq!(engine_braking(9000.0, 649.0, 10.8), at_3k);
        assert!(engine_braking(1000.0, 649.0, 10.8) < at_3k);
    }

    #[test]
    fn test_grade_force_sign() {
        assert_eq!(grade_force(200.0, 0.0), 0.0);
        assert!(grade_force(200.0, 10.0) > 0.0);
        assert!(grade_force(200.0, -10.0) < 0.0);
    }
}
