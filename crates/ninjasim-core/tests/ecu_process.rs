//! ECU processing tests - neutral settings, knock model and tuning writes

use ninjasim_core::calibration::{Calibration, MapType};
use ninjasim_core::ecu::model::{
    knock_risk, volumetric_efficiency, BASE_INJECTION_MS, KNOCK_THRESHOLD,
};
use ninjasim_core::ecu::{Ecu, EcuSettings};
use ninjasim_core::engine::SensorSnapshot;
use ninjasim_core::physics::ExhaustType;
use pretty_assertions::assert_eq;

fn snapshot(rpm: f64, throttle: f64) -> SensorSnapshot {
    SensorSnapshot {
        rpm,
        throttle_position: throttle,
        air_temp: 25.0,
        engine_temp: 90.0,
        manifold_absolute_pressure: 100.0,
        o2_lambda: 1.0,
        speed: 0.0,
        timestamp: 0,
    }
}

fn neutral_ecu() -> Ecu {
    Ecu::new(
        Calibration::ninja650(),
        EcuSettings {
            fuel_trim_pct: 0.0,
            ignition_trim_deg: 0.0,
            temp_compensation_enabled: false,
            exhaust_type: ExhaustType::Stock,
            ..EcuSettings::default()
        },
    )
}

#[test]
fn test_neutral_settings_reproduce_maps() {
    let mut ecu = neutral_ecu();
    let calibration = Calibration::ninja650();
    let mut checked = 0;

    for rpm in [1000.0, 2500.0, 4000.0, 5500.0, 7250.0, 9000.0, 10500.0] {
        for load in [0.0, 15.0, 30.0, 45.0, 60.0, 80.0, 100.0] {
            let command = ecu.process(&snapshot(rpm, load));

            let afr = calibration.afr.get(rpm, load);
            assert!((command.lambda_target * 14.7 - afr).abs() < 1e-9);

            let rpm_factor = (5000.0_f64 / rpm.max(1000.0)).sqrt();
            let expected_fuel = BASE_INJECTION_MS
                * volumetric_efficiency(rpm, load)
                * calibration.fuel.get(rpm, load)
                * rpm_factor;
            assert!((command.fuel_injection_ms - expected_fuel).abs() < 1e-9);

            let ignition = calibration.ignition.get(rpm, load);
            if knock_risk(rpm, load, ignition, 90.0) <= KNOCK_THRESHOLD {
                assert_eq!(command.ignition_advance_deg, ignition);
                checked += 1;
            }
        }
    }
    assert!(checked > 30);
}

#[test]
fn test_knock_risk_monotone() {
    let steps: Vec<f64> = (0..=20).map(|i| i as f64 * 5.0).collect();

    for rpm in [1500.0, 5000.0, 9500.0] {
        for pair in steps.windows(2) {
            assert!(knock_risk(rpm, pair[1], 32.0, 95.0) >= knock_risk(rpm, pair[0], 32.0, 95.0));
        }
        for advance in (30..60).map(|a| a as f64) {
            let later = knock_risk(rpm, 70.0, advance + 1.0, 95.0);
            assert!(later >= knock_risk(rpm, 70.0, advance, 95.0));
        }
        for temp in (90..130).map(|t| t as f64) {
            assert!(knock_risk(rpm, 70.0, 32.0, temp + 1.0) >= knock_risk(rpm, 70.0, 32.0, temp));
        }
    }
}

#[test]
fn test_map_write_changes_output() {
    let mut ecu = neutral_ecu();
    let before = ecu.process(&snapshot(3000.0, 20.0));

    let snap = ecu.set_map_cell(MapType::Ignition, 3100.0, 18.0, 12.0);
    assert_eq!((snap.rpm_breakpoint, snap.load_breakpoint), (3000.0, 20.0));
    assert!(!snap.is_exact());

    let after = ecu.process(&snapshot(3000.0, 20.0));
    assert_eq!(after.ignition_advance_deg, 12.0);
    assert!(after.ignition_advance_deg != before.ignition_advance_deg);

    let exported = ecu.export_calibration();
    assert_eq!(exported[1].map_type, MapType::Ignition);
    assert_eq!(exported[1].values[snap.rpm_index][snap.load_index], 12.0);
}
