//! # NinjaSim Core Library
//!
//! Closed-loop simulation of a motorcycle engine and its ECU.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Bilinear calibration tables (fuel, ignition, target AFR)
//! - An ECU model turning sensor snapshots into actuator commands
//! - An engine/drivetrain physics model with environmental and wear effects
//! - A fixed-tick simulation loop, synchronous or as an async session
//! - Telemetry recording and CSV export
//!
//! ## Example
//!
//! ```rust,ignore
//! use ninjasim_core::prelude::*;
//!
//! let config = SimulatorConfig::default();
//! let mut sim = Simulation::from_config(&config)?;
//!
//! let telemetry = sim.tick(Some(ControlInput::new(30.0, 1.0, 0)));
//! println!("RPM: {:.0}", telemetry.rpm);
//! ```

pub mod calibration;
pub mod config;
pub mod datalog;
pub mod ecu;
pub mod engine;
pub mod error;
pub mod physics;
pub mod simulation;

pub use error::{Error, Result};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::calibration::{CalibrationMap, CellSnap, LookupTable, MapType};
    pub use crate::config::SimulatorConfig;
    pub use crate::datalog::TelemetryLogger;
    pub use crate::ecu::{Ecu, EcuSettings, EcuStatistics, TuningPreset};
    pub use crate::engine::{
        ActuatorCommand, ChassisSpecs, DrivetrainRegime, Engine, EngineSpecs, Environment,
        SensorSnapshot,
    };
    pub use crate::physics::ExhaustType;
    pub use crate::simulation::{ControlInput, Session, SessionHandle, Simulation, Telemetry};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
