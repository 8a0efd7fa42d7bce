//! Tuning presets
//!
//! Named trim combinations that can be applied to an ECU in one step.

use serde::Serialize;

/// A preset ECU trim configuration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TuningPreset {
    /// Name used by `by_name`
    pub name: &'static str,
    /// One-line summary
    pub description: &'static str,
    /// Global fuel trim (%)
    pub fuel_trim_pct: f64,
    /// Global ignition trim (degrees)
    pub ignition_trim_deg: f64,
    /// Usage notes
    pub notes: &'static str,
}

const PRESETS: [TuningPreset; 4] = [
    TuningPreset {
        name: "Stock",
        description: "Factory stock tuning",
        fuel_trim_pct: 0.0,
        ignition_trim_deg: 0.0,
        notes: "Factory settings, safe for all conditions",
    },
    TuningPreset {
        name: "Performance",
        description: "Increased power with premium fuel",
        fuel_trim_pct: 2.0,
        ignition_trim_deg: 2.0,
        notes: "Requires 91+ octane fuel, sharper throttle response",
    },
    TuningPreset {
        name: "Economy",
        description: "Optimized for fuel economy",
        fuel_trim_pct: -3.0,
        ignition_trim_deg: 1.0,
        notes: "Slightly less power, better fuel economy",
    },
    TuningPreset {
        name: "Yoshimura Exhaust",
        description: "Tuned for the Yoshimura Alpha 2 exhaust",
        fuel_trim_pct: 3.0,
        ignition_trim_deg: 1.5,
        notes: "Compensates for increased exhaust flow",
    },
];

impl TuningPreset {
    /// All built-in presets
    pub fn all() -> &'static [TuningPreset] {
        &PRESETS
    }

    /// Find a preset by name (case-insensitive)
    pub fn by_name(name: &str) -> Option<&'static TuningPreset> {
        PRESETS.iter().find(|p| p.name.eq_ignore_ascii_case(name.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_name() {
        let preset = TuningPreset::by_name("performance").unwrap();
        assert_eq!(preset.fuel_trim_pct, 2.0);
        assert!(TuningPreset::by_name("Race").is_none());
        assert_eq!(TuningPreset::all().len(), 4);
    }
}
