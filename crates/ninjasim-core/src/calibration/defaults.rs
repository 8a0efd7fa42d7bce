//! Factory calibration for the 649cc parallel twin
//!
//! Rows are RPM (1000..=11000), columns are load / throttle (0..=100 %).

/// RPM breakpoints shared by all factory maps
pub const RPM_BREAKPOINTS: [f64; 11] = [
    1000.0, 2000.0, 3000.0, 4000.0, 5000.0, 6000.0, 7000.0, 8000.0, 9000.0, 10000.0, 11000.0,
];

/// Load breakpoints shared by all factory maps
pub const LOAD_BREAKPOINTS: [f64; 11] = [
    0.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0, 90.0, 100.0,
];

/// Fuel multipliers (1.0 = baseline)
pub const FUEL: [[f64; 11]; 11] = [
    [0.85, 0.88, 0.90, 0.92, 0.94, 0.96, 0.98, 1.00, 1.02, 1.04, 1.06],
    [0.86, 0.89, 0.91, 0.93, 0.95, 0.97, 0.99, 1.01, 1.03, 1.05, 1.07],
    [0.87, 0.90, 0.92, 0.94, 0.96, 0.98, 1.00, 1.02, 1.04, 1.06, 1.08],
    [0.88, 0.91, 0.93, 0.95, 0.97, 0.99, 1.01, 1.03, 1.05, 1.07, 1.09],
    [0.89, 0.92, 0.94, 0.96, 0.98, 1.00, 1.02, 1.04, 1.06, 1.08, 1.10],
    [0.90, 0.93, 0.95, 0.97, 0.99, 1.01, 1.03, 1.05, 1.07, 1.09, 1.11],
    [0.91, 0.94, 0.96, 0.98, 1.00, 1.02, 1.04, 1.06, 1.08, 1.10, 1.12],
    [0.92, 0.95, 0.97, 0.99, 1.01, 1.03, 1.05, 1.07, 1.09, 1.11, 1.13],
    [0.93, 0.96, 0.98, 1.00, 1.02, 1.04, 1.06, 1.08, 1.10, 1.12, 1.14],
    [0.94, 0.97, 0.99, 1.01, 1.03, 1.05, 1.07, 1.09, 1.11, 1.13, 1.15],
    [0.95, 0.98, 1.00, 1.02, 1.04, 1.06, 1.08, 1.10, 1.12, 1.14, 1.16],
];

/// Ignition advance, degrees BTDC
pub const IGNITION: [[f64; 11]; 11] = [
    [10.0, 15.0, 20.0, 25.0, 28.0, 30.0, 32.0, 33.0, 32.0, 30.0, 28.0],
    [12.0, 18.0, 23.0, 28.0, 30.0, 32.0, 34.0, 35.0, 34.0, 32.0, 30.0],
    [15.0, 20.0, 25.0, 30.0, 32.0, 34.0, 36.0, 37.0, 36.0, 34.0, 32.0],
    [18.0, 23.0, 28.0, 32.0, 34.0, 36.0, 38.0, 39.0, 38.0, 36.0, 34.0],
    [20.0, 25.0, 30.0, 34.0, 36.0, 38.0, 40.0, 40.0, 39.0, 37.0, 35.0],
    [22.0, 27.0, 32.0, 36.0, 38.0, 40.0, 41.0, 41.0, 40.0, 38.0, 36.0],
    [24.0, 29.0, 34.0, 38.0, 40.0, 41.0, 42.0, 42.0, 41.0, 39.0, 37.0],
    [25.0, 30.0, 35.0, 39.0, 41.0, 42.0, 43.0, 43.0, 42.0, 40.0, 38.0],
    [25.0, 30.0, 35.0, 39.0, 41.0, 42.0, 43.0, 43.0, 42.0, 40.0, 38.0],
    [24.0, 29.0, 34.0, 38.0, 40.0, 41.0, 42.0, 42.0, 41.0, 39.0, 37.0],
    [22.0, 27.0, 32.0, 36.0, 38.0, 40.0, 41.0, 41.0, 40.0, 38.0, 36.0],
];

/// Target air-fuel ratio
pub const TARGET_AFR: [[f64; 11]; 11] = [
    [14.7, 14.7, 14.7, 14.5, 14.3, 14.1, 13.8, 13.5, 13.2, 12.9, 12.6],
    [14.7, 14.7, 14.7, 14.5, 14.3, 14.1, 13.8, 13.5, 13.2, 12.9, 12.6],
    [14.7, 14.7, 14.7, 14.5, 14.3, 14.1, 13.8, 13.5, 13.2, 12.9, 12.6],
    [14.7, 14.7, 14.7, 14.5, 14.3, 14.1, 13.8, 13.5, 13.2, 12.9, 12.6],
    [14.7, 14.7, 14.6, 14.4, 14.2, 14.0, 13.7, 13.4, 13.1, 12.8, 12.5],
    [14.7, 14.6, 14.5, 14.3, 14.1, 13.9, 13.6, 13.3, 13.0, 12.7, 12.4],
    [14.6, 14.5, 14.4, 14.2, 14.0, 13.8, 13.5, 13.2, 12.9, 12.6, 12.3],
    [14.5, 14.4, 14.3, 14.1, 13.9, 13.7, 13.4, 13.1, 12.8, 12.5, 12.2],
    [14.4, 14.3, 14.2, 14.0, 13.8, 13.6, 13.3, 13.0, 12.7, 12.4, 12.1],
    [14.3, 14.2, 14.1, 13.9, 13.7, 13.5, 13.2, 12.9, 12.6, 12.3, 12.0],
    [14.2, 14.1, 14.0, 13.8, 13.6, 13.4, 13.1, 12.8, 12.5, 12.2, 11.9],
];
