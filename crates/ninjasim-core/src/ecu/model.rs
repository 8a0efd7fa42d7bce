//! Breathing and knock models used by the ECU

/// Stoichiometric air-fuel ratio for gasoline
pub const STOICHIOMETRIC_AFR: f64 = 14.7;
/// Knock risk above which timing is pulled
pub const KNOCK_THRESHOLD: f64 = 0.7;

/// Injection time (ms) at stoichiometric mixture and 100 % VE
pub const BASE_INJECTION_MS: f64 = 2.5;

const VE_BASELINE: f64 = 0.85;
const VE_PEAK_RPM: f64 = 5500.0;

/// Volumetric efficiency for an RPM and load (throttle %).
///
/// Peaks mid-range and falls 30 % towards the ends of the rev range; rises
/// linearly with load from 60 % to 100 % of the RPM-dependent value.
pub fn volumetric_efficiency(rpm: f64, load: f64) -> f64 {
    let rpm_factor = 1.0 - 0.3 * ((rpm - VE_PEAK_RPM) / VE_PEAK_RPM).powi(2);
    let load_factor = 0.6 + 0.4 * (load / 100.0);
    VE_BASELINE * rpm_factor * load_factor
}

/// Lugging below 2500 rpm and high piston speed above 7500 rpm both raise risk.
pub fn rpm_knock_factor(rpm: f64) -> f64 {
    if rpm < 2500.0 {
        0.5 - 0.5 * (rpm / 2500.0)
    } else if rpm > 7500.0 {
        (rpm - 7500.0) / 3500.0
    } else {
        0.0
    }
}

/// Knock risk in `[0, 1]` from load, RPM, advance and engine temperature
pub fn knock_risk(rpm: f64, load: f64, ignition_advance: f64, engine_temp: f64) -> f64 {
    let load_factor = (load / 100.0).powi(2);
    let timing_factor = ((ignition_advance - 30.0) / 10.0).max(0.0);
    let temp_factor = ((engine_temp - 90.0) / 30.0).max(0.0);

    let risk = 0.5 * load_factor
        + 0.15 * rpm_knock_factor(rpm)
        + 0.25 * timing_factor
        + 0.1 * temp_factor;

    risk.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ve_peaks_mid_range() {
        let mid = volumetric_efficiency(5500.0, 100.0);
        assert!((mid - 0.85).abs() < 1e-12);
        assert!(volumetric_efficiency(1000.0, 100.0) < mid);
        assert!(volumetric_efficiency(11000.0, 100.0) < mid);
        assert!((volumetric_efficiency(11000.0, 100.0) - 0.85 * 0.7).abs() < 1e-12);
        assert!((volumetric_efficiency(5500.0, 0.0) - 0.85 * 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_rpm_knock_factor_ramps() {
        assert_eq!(rpm_knock_factor(0.0), 0.5);
        assert_eq!(rpm_knock_factor(5000.0), 0.0);
        assert_eq!(rpm_knock_factor(2500.0), 0.0);
        assert_eq!(rpm_knock_factor(7500.0), 0.0);
        assert!((rpm_knock_factor(11000.0) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_knock_risk_clamped() {
        assert_eq!(knock_risk(5000.0, 0.0, 10.0, 80.0), 0.0);
        assert_eq!(knock_risk(11000.0, 100.0, 60.0, 120.0), 1.0);
    }
}
