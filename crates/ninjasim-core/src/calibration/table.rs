//! Bilinear lookup table
//!
//! A 2D calibration map indexed by RPM (rows) and load (columns).

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;

use super::CalibrationError;

/// Where a point-tuning write actually landed.
///
/// Writes snap to the nearest breakpoint on each axis; the offsets report how
/// far the requested coordinate was from the cell that was overwritten.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellSnap {
    /// Row index (RPM axis)
    pub rpm_index: usize,
    /// Column index (load axis)
    pub load_index: usize,
    /// RPM breakpoint of the written cell
    pub rpm_breakpoint: f64,
    /// Load breakpoint of the written cell
    pub load_breakpoint: f64,
    /// Requested RPM minus the breakpoint RPM
    pub rpm_offset: f64,
    /// Requested load minus the breakpoint load
    pub load_offset: f64,
}

impl CellSnap {
    /// True when the request matched a breakpoint exactly on both axes
    pub fn is_exact(&self) -> bool {
        self.rpm_offset == 0.0 && self.load_offset == 0.0
    }
}

/// 2D calibration map with RPM rows and load columns
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupTable {
    rpm_breakpoints: Vec<f64>,
    load_breakpoints: Vec<f64>,
    values: Vec<Vec<f64>>,
}

impl LookupTable {
    /// Build a table, validating axes and grid shape.
    ///
    /// `values[i][j]` is the cell at `rpm_breakpoints[i]`, `load_breakpoints[j]`.
    pub fn new(
        rpm_breakpoints: Vec<f64>,
        load_breakpoints: Vec<f64>,
        values: Vec<Vec<f64>>,
    ) -> Result<Self, CalibrationError> {
        validate_axis("rpm", &rpm_breakpoints)?;
        validate_axis("load", &load_breakpoints)?;

        if values.len() != rpm_breakpoints.len() {
            return Err(CalibrationError::RowCountMismatch {
                expected: rpm_breakpoints.len(),
                actual: values.len(),
            });
        }

        for (row, cells) in values.iter().enumerate() {
            if cells.len() != load_breakpoints.len() {
                return Err(CalibrationError::ColumnCountMismatch {
                    row,
                    expected: load_breakpoints.len(),
                    actual: cells.len(),
                });
            }
            if let Some(column) = cells.iter().position(|v| !v.is_finite()) {
                return Err(CalibrationError::NonFiniteValue {
                    what: "cell value",
                    row,
                    column,
                });
            }
        }

        Ok(Self {
            rpm_breakpoints,
            load_breakpoints,
            values,
        })
    }

    /// Build a table from fixed-size built-in data.
    ///
    /// The array types fix the grid shape; the built-in axes are checked by the
    /// calibration tests.
    pub(crate) fn from_grid<const N: usize, const M: usize>(
        rpm_breakpoints: &[f64; N],
        load_breakpoints: &[f64; M],
        values: &[[f64; M]; N],
    ) -> Self {
        debug_assert!(validate_axis("rpm", rpm_breakpoints).is_ok());
        debug_assert!(validate_axis("load", load_breakpoints).is_ok());

        Self {
            rpm_breakpoints: rpm_breakpoints.to_vec(),
            load_breakpoints: load_breakpoints.to_vec(),
            values: values.iter().map(|row| row.to_vec()).collect(),
        }
    }

    /// RPM axis breakpoints
    pub fn rpm_breakpoints(&self) -> &[f64] {
        &self.rpm_breakpoints
    }

    /// Load axis breakpoints
    pub fn load_breakpoints(&self) -> &[f64] {
        &self.load_breakpoints
    }

    /// Grid values, one row per RPM breakpoint
    pub fn values(&self) -> &[Vec<f64>] {
        &self.values
    }

    /// (rows, columns)
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rpm_breakpoints.len(), self.load_breakpoints.len())
    }

    /// Raw cell access by index
    pub fn cell(&self, rpm_index: usize, load_index: usize) -> Option<f64> {
        self.values
            .get(rpm_index)
            .and_then(|row| row.get(load_index))
            .copied()
    }

    /// Interpolated lookup.
    ///
    /// Queries are clamped to the table edges (no extrapolation). A query that
    /// lands on a breakpoint returns the stored value exactly.
    pub fn get(&self, rpm: f64, load: f64) -> f64 {
        let (r0, r1, rf) = find_interval(rpm, &self.rpm_breakpoints);
        let (l0, l1, lf) = find_interval(load, &self.load_breakpoints);

        let v1 = self.values[r0][l0];
        let v2 = self.values[r1][l0];
        let v3 = self.values[r0][l1];
        let v4 = self.values[r1][l1];

        let low_load = v1 + rf * (v2 - v1);
        let high_load = v3 + rf * (v4 - v3);

        let value = low_load + lf * (high_load - low_load);
        tracing::trace!(rpm, load, value, "table lookup");
        value
    }

    /// Overwrite the cell at the nearest breakpoints.
    ///
    /// Neighbouring cells are not smoothed. Non-finite values are ignored so
    /// the grid stays fully populated; the returned snap still reports the cell
    /// that would have been written.
    pub fn set(&mut self, rpm: f64, load: f64, value: f64) -> CellSnap {
        let rpm_index = nearest_index(rpm, &self.rpm_breakpoints);
        let load_index = nearest_index(load, &self.load_breakpoints);

        if value.is_finite() {
            self.values[rpm_index][load_index] = value;
        } else {
            tracing::warn!(rpm, load, "ignoring non-finite calibration write");
        }

        let rpm_breakpoint = self.rpm_breakpoints[rpm_index];
        let load_breakpoint = self.load_breakpoints[load_index];
        CellSnap {
            rpm_index,
            load_index,
            rpm_breakpoint,
            load_breakpoint,
            rpm_offset: rpm - rpm_breakpoint,
            load_offset: load - load_breakpoint,
        }
    }

    /// Scale every cell inside both inclusive ranges by `1 + pct/100`.
    ///
    /// Returns the number of cells modified.
    pub fn modify_region(
        &mut self,
        rpm_range: RangeInclusive<f64>,
        load_range: RangeInclusive<f64>,
        pct: f64,
    ) -> usize {
        let factor = 1.0 + pct / 100.0;
        let mut touched = 0;

        for (row, rpm) in self.values.iter_mut().zip(&self.rpm_breakpoints) {
            if !rpm_range.contains(rpm) {
                continue;
            }
            for (cell, load) in row.iter_mut().zip(&self.load_breakpoints) {
                if load_range.contains(load) {
                    *cell *= factor;
                    touched += 1;
                }
            }
        }

        touched
    }
}

impl<'de> Deserialize<'de> for LookupTable {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            rpm_breakpoints: Vec<f64>,
            load_breakpoints: Vec<f64>,
            values: Vec<Vec<f64>>,
        }

        let raw = Raw::deserialize(deserializer)?;
        LookupTable::new(raw.rpm_breakpoints, raw.load_breakpoints, raw.values)
            .map_err(serde::de::Error::custom)
    }
}

fn validate_axis(axis: &'static str, breakpoints: &[f64]) -> Result<(), CalibrationError> {
    if breakpoints.is_empty() {
        return Err(CalibrationError::EmptyAxis { axis });
    }

    if let Some(column) = breakpoints.iter().position(|v| !v.is_finite()) {
        return Err(CalibrationError::NonFiniteValue {
            what: "breakpoint",
            row: 0,
            column,
        });
    }

    for (i, pair) in breakpoints.windows(2).enumerate() {
        if pair[1] <= pair[0] {
            return Err(CalibrationError::NonMonotonicBreakpoints {
                axis,
                index: i + 1,
                previous: pair[0],
                value: pair[1],
            });
        }
    }

    Ok(())
}

/// Bracketing indices and interpolation factor, clamped to the axis edges.
///
/// An exact breakpoint hit resolves to that breakpoint as the lower corner with
/// a factor of zero.
fn find_interval(value: f64, breakpoints: &[f64]) -> (usize, usize, f64) {
    let last = breakpoints.len() - 1;

    if value.is_nan() || value <= breakpoints[0] {
        return (0, 0, 0.0);
    }
    if value >= breakpoints[last] {
        return (last, last, 0.0);
    }

    for (i, pair) in breakpoints.windows(2).enumerate() {
        let (low, high) = (pair[0], pair[1]);
        if value >= low && value < high {
            let span = high - low;
            let factor = if span == 0.0 { 0.0 } else { (value - low) / span };
            return (i, i + 1, factor);
        }
    }

    (last, last, 0.0)
}

/// Index of the breakpoint closest to `value`; ties go to the lower index.
fn nearest_index(value: f64, breakpoints: &[f64]) -> usize {
    let mut nearest = 0;
    let mut smallest = (value - breakpoints[0]).abs();

    for (i, bp) in breakpoints.iter().enumerate().skip(1) {
        let diff = (value - bp).abs();
        if diff < smallest {
            smallest = diff;
            nearest = i;
        }
    }

    nearest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_table() -> LookupTable {
        LookupTable::new(
            vec![1000.0, 2000.0, 3000.0],
            vec![0.0, 50.0, 100.0],
            vec![
                vec![10.0, 20.0, 30.0],
                vec![20.0, 30.0, 40.0],
                vec![30.0, 40.0, 60.0],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_exact_breakpoints() {
        let table = small_table();
        assert_eq!(table.get(1000.0, 0.0), 10.0);
        assert_eq!(table.get(2000.0, 50.0), 30.0);
        assert_eq!(table.get(3000.0, 100.0), 60.0);
    }

    #[test]
    fn test_midpoint_interpolation() {
        let table = small_table();
        // Centre of the first cell: average of 10, 20, 20, 30
        assert!((table.get(1500.0, 25.0) - 20.0).abs() < 1e-12);
        // Along an edge only one axis interpolates
        assert!((table.get(2500.0, 100.0) - 50.0).abs() < 1e-12);
    }

    #[test]
    fn test_clamps_outside_domain() {
        let table = small_table();
        assert_eq!(table.get(0.0, -20.0), 10.0);
        assert_eq!(table.get(9000.0, 250.0), 60.0);
        assert_eq!(table.get(f64::NAN, 0.0), 10.0);
    }

    #[test]
    fn test_single_breakpoint_axis() {
        let table = LookupTable::new(vec![1000.0], vec![0.0, 100.0], vec![vec![1.0, 3.0]]).unwrap();
        assert!((table.get(5000.0, 50.0) - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_set_snaps_to_nearest() {
        let mut table = small_table();
        let snap = table.set(1900.0, 60.0, 99.0);
        assert_eq!((snap.rpm_index, snap.load_index), (1, 1));
        assert_eq!(snap.rpm_offset, -100.0);
        assert_eq!(snap.load_offset, 10.0);
        assert!(!snap.is_exact());
        assert_eq!(table.cell(1, 1), Some(99.0));
    }

    #[test]
    fn test_set_tie_goes_low() {
        let mut table = small_table();
        let snap = table.set(1500.0, 25.0, 1.0);
        assert_eq!((snap.rpm_index, snap.load_index), (0, 0));
    }

    #[test]
    fn test_set_ignores_nan() {
        let mut table = small_table();
        table.set(1000.0, 0.0, f64::NAN);
        assert_eq!(table.cell(0, 0), Some(10.0));
    }

    #[test]
    fn test_rejects_bad_shapes() {
        assert_eq!(
            LookupTable::new(vec![], vec![0.0], vec![]),
            Err(CalibrationError::EmptyAxis { axis: "rpm" })
        );
        assert!(matches!(
            LookupTable::new(vec![1.0, 1.0], vec![0.0], vec![vec![0.0], vec![0.0]]),
            Err(CalibrationError::NonMonotonicBreakpoints { index: 1, .. })
        ));
        assert!(matches!(
            LookupTable::new(vec![1.0, 2.0], vec![0.0], vec![vec![0.0]]),
            Err(CalibrationError::RowCountMismatch { expected: 2, actual: 1 })
        ));
        assert!(matches!(
            LookupTable::new(vec![1.0], vec![0.0, 1.0], vec![vec![0.0]]),
            Err(CalibrationError::ColumnCountMismatch { row: 0, .. })
        ));
        assert!(matches!(
            LookupTable::new(vec![1.0], vec![0.0], vec![vec![f64::INFINITY]]),
            Err(CalibrationError::NonFiniteValue { .. })
        ));
    }

    #[test]
    fn test_deserialize_validates() {
        let bad = r#"{"rpm_breakpoints":[2.0,1.0],"load_breakpoints":[0.0],"values":[[1.0],[2.0]]}"#;
        assert!(serde_json::from_str::<LookupTable>(bad).is_err());

        let table = small_table();
        let json = serde_json::to_string(&table).unwrap();
        let back: LookupTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back, table);
    }
}
