// Latitude and height recovery from a point projected onto the ellipse

use crate::constants::RTOD;
use crate::error::{GeoError, Result};
use crate::point::MeridianPoint;

/// Compute geodetic latitude and signed height.
///
/// # Arguments
/// * `h_ratio` - Ellipsoid ratio H = a/b
/// * `projected` - Foot point (p_E, z_E) on the ellipse
/// * `original` - Meridian-plane point (p_G, z_G) being converted
///
/// # Returns
/// (latitude, height) with latitude in degrees. Height is negative when the
/// original point lies inside the ellipse relative to its foot point,
/// i.e. p_G + |z_G| < p_E + |z_E|.
pub fn recover(
    h_ratio: f64,
    projected: &MeridianPoint,
    original: &MeridianPoint,
) -> Result<(f64, f64)> {
    if !(projected.p.is_finite() && projected.z.is_finite()) {
        return Err(GeoError::NumericDomain(format!(
            "projected point is not finite: {:?}",
            projected
        )));
    }

    let latitude = latitude_from_foot_point(h_ratio, projected)?;

    let mut height = original.distance(projected);
    if original.radius_l1() < projected.radius_l1() {
        height = -height;
    }
    if !height.is_finite() {
        return Err(GeoError::NumericDomain(format!(
            "height is not finite for original point {:?}",
            original
        )));
    }

    Ok((latitude, height))
}

/// tan(lat) = H^2 * z_E / p_E; on the rotation axis the limit is +/-90 degrees
fn latitude_from_foot_point(h_ratio: f64, projected: &MeridianPoint) -> Result<f64> {
    if projected.p == 0.0 {
        if projected.z == 0.0 {
            return Err(GeoError::NumericDomain(
                "latitude undefined for a foot point at the ellipsoid centre".to_string(),
            ));
        }
        return Ok(90.0_f64.copysign(projected.z));
    }

    let tan_lat = h_ratio * h_ratio * projected.z / projected.p;
    let latitude = tan_lat.atan() * RTOD;
    if !latitude.is_finite() {
        return Err(GeoError::NumericDomain(format!(
            "latitude is not finite (tan = {})",
            tan_lat
        )));
    }
    Ok(latitude)
}
