//! Data Logging
//!
//! Records telemetry frames from a running simulation and exports them.

mod format;
mod recorder;

pub use format::{write_csv, CSV_CHANNELS};
pub use recorder::TelemetryLogger;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::simulation::Telemetry;

/// A recorded telemetry frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Time since recording started
    pub timestamp: Duration,
    /// Recorded frame
    pub telemetry: Telemetry,
}

impl LogEntry {
    /// Create a new log entry
    pub fn new(timestamp: Duration, telemetry: Telemetry) -> Self {
        Self {
            timestamp,
            telemetry,
        }
    }
}
