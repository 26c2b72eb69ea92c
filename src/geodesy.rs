// Geodesy module - conversions between Cartesian and geodetic coordinates
//
// Provides conversions between:
// - Geodetic (latitude/longitude in degrees, height in ellipsoid units)
// - Earth-centred Cartesian (X, Y, Z) in ellipsoid units
//
// The inverse direction projects the point onto the ellipse in its meridian
// plane by solving a 2x2 nonlinear system; no closed-form latitude
// approximation is involved.

use serde::Serialize;
use tracing::{debug, warn};

use crate::constants::{DTOR, RTOD};
use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, Result};
use crate::point::{CartesianPoint, GeodeticPoint, MeridianPoint};
use crate::projector;
use crate::recover::recover;
use crate::solver::{Iterate, SolverConfig};

/// Largest disagreement (degrees) tolerated between the two longitude formulas
const LONGITUDE_CROSS_CHECK: f64 = 1e-9;

/// Result of a Cartesian to geodetic conversion
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Conversion {
    pub geodetic: GeodeticPoint,
    /// Solver steps taken
    pub iterations: usize,
    /// Residual evaluations, finite-difference ones included
    pub evaluations: usize,
    /// Foot point (p_E, z_E) on the ellipse
    pub foot_point: MeridianPoint,
}

/// Geodetic estimate at one solver iterate
#[derive(Debug, Clone, Copy)]
pub struct TraceEvent {
    pub iteration: usize,
    pub estimate: GeodeticPoint,
    pub residual_norm: f64,
}

/// Longitude in degrees from the half-angle form 2 * atan(y / (x + w)), w = sqrt(x^2 + y^2)
///
/// Stable near the negative x-axis, where the half-angle denominator vanishes
/// and the longitude is +/-180 degrees depending on the sign of y.
///
/// # Errors
/// `DegenerateInput` on the rotation axis (x = y = 0), where longitude is undefined.
pub fn longitude(x: f64, y: f64) -> Result<f64> {
    let w = x.hypot(y);
    if w == 0.0 {
        return Err(GeoError::DegenerateInput(
            "longitude is undefined on the rotation axis (x = y = 0)".to_string(),
        ));
    }

    // Negative x-axis; the sign of y picks the side of the antimeridian
    let denom = x + w;
    if denom == 0.0 {
        return Ok(180.0_f64.copysign(y));
    }
    Ok(2.0 * y.atan2(denom) * RTOD)
}

/// Longitude straight from atan2(y, x). Only used to cross-check `longitude`.
pub fn longitude_direct(x: f64, y: f64) -> f64 {
    y.atan2(x) * RTOD
}

/// Smallest angular separation between two longitudes, in degrees
fn longitude_separation(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}

/// Converts from geodetic coordinates to Cartesian coordinates
///
/// # Arguments
/// * `point` - Latitude/longitude in degrees, height in ellipsoid units
/// * `ellipsoid` - Reference ellipsoid
///
/// # Returns
/// Cartesian (x, y, z) in ellipsoid units
///
/// # Errors
/// `NumericDomain` for non-finite input or latitude outside [-90, 90].
///
/// # Example
/// ```
/// use geocart::{geodetic_to_cartesian, Ellipsoid, GeodeticPoint};
///
/// let xyz = geodetic_to_cartesian(GeodeticPoint::new(0.0, 0.0, 0.0), &Ellipsoid::default()).unwrap();
/// assert!((xyz.x - 6378.0).abs() < 1e-9);
/// ```
pub fn geodetic_to_cartesian(point: GeodeticPoint, ellipsoid: &Ellipsoid) -> Result<CartesianPoint> {
    if !point.is_finite() {
        return Err(GeoError::NumericDomain(format!(
            "geodetic point is not finite: {:?}",
            point
        )));
    }
    if point.latitude.abs() > 90.0 {
        return Err(GeoError::NumericDomain(format!(
            "latitude must lie in [-90, 90] (latitude={})",
            point.latitude
        )));
    }

    let lat_rad = point.latitude * DTOR;
    let lon_rad = point.longitude * DTOR;

    // Precompute trig functions
    let slat = lat_rad.sin();
    let slon = lon_rad.sin();
    let clat = lat_rad.cos();
    let clon = lon_rad.cos();

    // Radius of curvature in prime vertical
    let e2 = ellipsoid.eccentricity_squared();
    let rn = ellipsoid.a() / (1.0 - slat * slat * e2).sqrt();

    let h = point.height;
    Ok(CartesianPoint {
        x: (rn + h) * clat * clon,
        y: (rn + h) * clat * slon,
        z: (rn * (1.0 - e2) + h) * slat,
    })
}

/// Converts from Cartesian coordinates to geodetic coordinates
///
/// Longitude comes from the half-angle formula. Latitude and height come from
/// the orthogonal projection of the point onto the ellipse in its meridian
/// plane, found with the solver selected in `config`.
///
/// # Errors
/// * `InvalidParameter` for an invalid `config`
/// * `NumericDomain` for non-finite input
/// * `DegenerateInput` when x = y = 0
/// * `Convergence` when the solver stops above tolerance
///
/// # Example
/// ```
/// use geocart::{cartesian_to_geodetic, CartesianPoint, Ellipsoid, SolverConfig};
///
/// let conversion = cartesian_to_geodetic(
///     CartesianPoint::new(6378.0, 0.0, 0.0),
///     &Ellipsoid::default(),
///     &SolverConfig::default(),
/// ).unwrap();
/// assert!(conversion.geodetic.height.abs() < 1e-9);
/// ```
pub fn cartesian_to_geodetic(
    point: CartesianPoint,
    ellipsoid: &Ellipsoid,
    config: &SolverConfig,
) -> Result<Conversion> {
    convert(point, ellipsoid, config, None)
}

/// Same as `cartesian_to_geodetic`, reporting the geodetic estimate at every
/// solver iterate to `observer`.
pub fn cartesian_to_geodetic_observed(
    point: CartesianPoint,
    ellipsoid: &Ellipsoid,
    config: &SolverConfig,
    observer: &mut dyn FnMut(&TraceEvent),
) -> Result<Conversion> {
    convert(point, ellipsoid, config, Some(observer))
}

fn convert(
    point: CartesianPoint,
    ellipsoid: &Ellipsoid,
    config: &SolverConfig,
    mut observer: Option<&mut dyn FnMut(&TraceEvent)>,
) -> Result<Conversion> {
    config.validate()?;
    if !point.is_finite() {
        return Err(GeoError::NumericDomain(format!(
            "cartesian point is not finite: {:?}",
            point
        )));
    }

    let lon = longitude(point.x, point.y)?;
    if config.trace {
        let direct = longitude_direct(point.x, point.y);
        debug!(stable = lon, direct = direct, "longitude");
        if longitude_separation(lon, direct) > LONGITUDE_CROSS_CHECK {
            warn!(
                "Longitude formulas disagree: half-angle {} vs direct {}",
                lon, direct
            );
        }
    }

    let target = point.to_meridian();
    let h_ratio = ellipsoid.h();
    let trace = config.trace;

    let mut on_iterate = |it: &Iterate| {
        if !trace && observer.is_none() {
            return;
        }
        let foot = MeridianPoint::new(it.x[0], it.x[1]);
        // Intermediate iterates may sit where latitude is undefined
        let Ok((lat, height)) = recover(h_ratio, &foot, &target) else {
            return;
        };
        let event = TraceEvent {
            iteration: it.iteration,
            estimate: GeodeticPoint::new(lat, lon, height),
            residual_norm: it.residual.norm(),
        };
        if trace {
            debug!(
                iteration = event.iteration,
                latitude = lat,
                longitude = lon,
                height = height,
                residual = event.residual_norm,
                "iterate"
            );
        }
        if let Some(observer) = observer.as_deref_mut() {
            observer(&event);
        }
    };

    let projection = projector::project(
        ellipsoid,
        target,
        config.method.finder(),
        config.tolerance,
        config.max_iterations,
        &mut on_iterate,
    )?;

    let (latitude, height) = recover(h_ratio, &projection.point, &target)?;

    if trace {
        debug!(
            "Final geodetic coordinates ({}, {}, {}) after {} iterations ({} evaluations, {})",
            latitude, lon, height, projection.iterations, projection.evaluations, config.method
        );
    }

    Ok(Conversion {
        geodetic: GeodeticPoint::new(latitude, lon, height),
        iterations: projection.iterations,
        evaluations: projection.evaluations,
        foot_point: projection.point,
    })
}
