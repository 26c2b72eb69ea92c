// Shared constants for geodetic/cartesian conversion

use std::f64::consts::PI;

/// Degrees to radians conversion factor
pub const DTOR: f64 = PI / 180.0;

/// Radians to degrees conversion factor
pub const RTOD: f64 = 180.0 / PI;

/// Default ellipsoid semi-major axis (km)
pub const DEFAULT_SEMI_MAJOR: f64 = 6378.0;

/// Default ellipsoid semi-minor axis (km)
pub const DEFAULT_SEMI_MINOR: f64 = 6356.0;

/// WGS84 semi-major axis (km)
pub const WGS84_SEMI_MAJOR: f64 = 6378.137;

/// WGS84 semi-minor axis (km): a * (1 - f), f = 1/298.257223563
pub const WGS84_SEMI_MINOR: f64 = 6356.752314245179;

/// Default solver tolerance on the weighted residual norm (dimensionless)
pub const DEFAULT_TOLERANCE: f64 = 1e-12;

/// Default cap on solver steps
pub const DEFAULT_MAX_ITERATIONS: usize = 50;

/// Relative step for finite-difference Jacobians
pub const FD_STEP: f64 = 1e-7;
