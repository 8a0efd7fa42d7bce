//! Calibration table errors

use thiserror::Error;

/// Errors raised while building or addressing calibration tables
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    /// An axis was given no breakpoints
    #[error("{axis} axis has no breakpoints")]
    EmptyAxis {
        /// "rpm" or "load"
        axis: &'static str,
    },

    /// Breakpoints repeat or go backwards
    #[error("{axis} breakpoints must be strictly increasing (index {index}: {previous} then {value})")]
    NonMonotonicBreakpoints {
        /// "rpm" or "load"
        axis: &'static str,
        /// Index of the offending breakpoint
        index: usize,
        /// Breakpoint before it
        previous: f64,
        /// The offending breakpoint
        value: f64,
    },

    /// NaN or infinity in a breakpoint or cell
    #[error("non-finite {what} at [{row}, {column}]")]
    NonFiniteValue {
        /// "breakpoint" or "cell value"
        what: &'static str,
        /// Row index (0 for breakpoints)
        row: usize,
        /// Column index
        column: usize,
    },

    /// Grid row count differs from the RPM axis length
    #[error("table has {actual} rows, expected {expected} (one per RPM breakpoint)")]
    RowCountMismatch {
        /// RPM breakpoint count
        expected: usize,
        /// Rows supplied
        actual: usize,
    },

    /// A grid row differs from the load axis length
    #[error("row {row} has {actual} columns, expected {expected} (one per load breakpoint)")]
    ColumnCountMismatch {
        /// Row index
        row: usize,
        /// Load breakpoint count
        expected: usize,
        /// Columns supplied
        actual: usize,
    },

    /// Map name that is not fuel, ignition or afr
    #[error("unknown map type '{0}' (expected fuel, ignition or afr)")]
    UnknownMapType(String),
}
