//! Sensor operating ranges
//!
//! Normal and warning bands for the channels the ECU reads.

use serde::{Deserialize, Serialize};

use crate::engine::SensorSnapshot;

/// A sensor channel with a defined operating range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorChannel {
    /// Engine speed
    Rpm,
    /// Throttle opening
    ThrottlePosition,
    /// Coolant temperature
    EngineTemp,
    /// Manifold absolute pressure
    Map,
    /// Wideband lambda
    O2,
}

impl SensorChannel {
    /// Every channel, in display order
    pub const ALL: [SensorChannel; 5] = [
        SensorChannel::Rpm,
        SensorChannel::ThrottlePosition,
        SensorChannel::EngineTemp,
        SensorChannel::Map,
        SensorChannel::O2,
    ];

    /// Read this channel from a snapshot
    pub fn read(&self, snapshot: &SensorSnapshot) -> f64 {
        match self {
            SensorChannel::Rpm => snapshot.rpm,
            SensorChannel::ThrottlePosition => snapshot.throttle_position,
            SensorChannel::EngineTemp => snapshot.engine_temp,
            SensorChannel::Map => snapshot.manifold_absolute_pressure,
            SensorChannel::O2 => snapshot.o2_lambda,
        }
    }

    /// Operating range for this channel
    pub fn range(&self) -> SensorRange {
        match self {
            SensorChannel::Rpm => SensorRange {
                min: 0.0,
                max: 12000.0,
                low_warn: 800.0,
                high_warn: 11000.0,
                unit: "RPM",
                precision: 0,
            },
            SensorChannel::ThrottlePosition => SensorRange {
                min: 0.0,
                max: 100.0,
                low_warn: 0.0,
                high_warn: 100.0,
                unit: "%",
                precision: 1,
            },
            SensorChannel::EngineTemp => SensorRange {
                min: 0.0,
                max: 150.0,
                low_warn: 60.0,
                high_warn: 110.0,
                unit: "°C",
                precision: 1,
            },
            SensorChannel::Map => SensorRange {
                min: 0.0,
                max: 120.0,
                low_warn: 20.0,
                high_warn: 110.0,
                unit: "kPa",
                precision: 1,
            },
            SensorChannel::O2 => SensorRange {
                min: 0.7,
                max: 1.3,
                low_warn: 0.8,
                high_warn: 1.1,
                unit: "λ",
                precision: 2,
            },
        }
    }
}

/// Where a reading sits relative to its warning band
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorStatus {
    /// Inside the warning band
    Normal,
    /// Below the low warning
    Low,
    /// Above the high warning
    High,
}

/// Physical and warning limits for a sensor
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SensorRange {
    /// Lowest plausible reading
    pub min: f64,
    /// Highest plausible reading
    pub max: f64,
    /// Readings below this warn
    pub low_warn: f64,
    /// Readings above this warn
    pub high_warn: f64,
    /// Display unit
    pub unit: &'static str,
    /// Decimal places for display
    pub precision: usize,
}

impl SensorRange {
    /// Classify a reading against the warning band
    pub fn classify(&self, value: f64) -> SensorStatus {
        if value < self.low_warn {
            SensorStatus::Low
        } else if value > self.high_warn {
            SensorStatus::High
        } else {
            SensorStatus::Normal
        }
    }

    /// Format a reading with this range's precision and unit
    pub fn format(&self, value: f64) -> String {
        format!("{:.*} {}", self.precision, value, self.unit)
    }
}

/// All channels of a snapshot that are outside their warning band
pub fn sensor_warnings(snapshot: &SensorSnapshot) -> Vec<(SensorChannel, SensorStatus)> {
    SensorChannel::ALL
        .iter()
        .filter_map(|channel| {
            let status = channel.range().classify(channel.read(snapshot));
            (status != SensorStatus::Normal).then_some((*channel, status))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_engine_temp() {
        let range = SensorChannel::EngineTemp.range();
        assert_eq!(range.classify(40.0), SensorStatus::Low);
        assert_eq!(range.classify(90.0), SensorStatus::Normal);
        assert_eq!(range.classify(115.0), SensorStatus::High);
        assert_eq!(range.format(92.345), "92.3 °C");
    }

    #[test]
    fn test_snapshot_warnings() {
        let snapshot = SensorSnapshot {
            rpm: 11500.0,
            throttle_position: 100.0,
            air_temp: 25.0,
            engine_temp: 90.0,
            manifold_absolute_pressure: 100.0,
            o2_lambda: 0.75,
            speed: 120.0,
            timestamp: 0,
        };
        let warnings = sensor_warnings(&snapshot);
        assert_eq!(
            warnings,
            vec![
                (SensorChannel::Rpm, SensorStatus::High),
                (SensorChannel::O2, SensorStatus::Low)
            ]
        );
    }
}
