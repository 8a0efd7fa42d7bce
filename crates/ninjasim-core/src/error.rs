//! Crate-level errors

use thiserror::Error;

use crate::calibration::CalibrationError;

/// Errors returned by the simulator
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed calibration table
    #[error("Invalid calibration: {0}")]
    Calibration(#[from] CalibrationError),

    /// Configuration or log file I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration JSON could not be parsed
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration values the physics cannot run with
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The session task has exited
    #[error("Simulation session has stopped")]
    SessionClosed,
}

/// Result alias using the crate [`enum@Error`]
pub type Result<T> = std::result::Result<T, Error>;
