// Coordinate types shared by the forward and inverse conversions

use serde::Serialize;

/// Earth-centred Cartesian point, in the same linear unit as the ellipsoid axes
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CartesianPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl CartesianPoint {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Straight-line distance to another point
    #[inline]
    pub fn distance(&self, other: &CartesianPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Reduce to the meridian plane containing this point and the rotation axis
    pub fn to_meridian(&self) -> MeridianPoint {
        MeridianPoint {
            p: self.x.hypot(self.y),
            z: self.z,
        }
    }
}

/// Point in a meridian plane: `p` is the distance from the rotation axis
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeridianPoint {
    pub p: f64,
    pub z: f64,
}

impl MeridianPoint {
    pub fn new(p: f64, z: f64) -> Self {
        Self { p, z }
    }

    #[inline]
    pub fn distance(&self, other: &MeridianPoint) -> f64 {
        (self.p - other.p).hypot(self.z - other.z)
    }

    /// Taxicab "radius" p + |z| used to decide which side of the ellipse a point is on
    #[inline]
    pub fn radius_l1(&self) -> f64 {
        self.p + self.z.abs()
    }
}

/// Geodetic coordinates: angles in degrees, height in the ellipsoid's unit
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeodeticPoint {
    pub latitude: f64,
    pub longitude: f64,
    pub height: f64,
}

impl GeodeticPoint {
    pub fn new(latitude: f64, longitude: f64, height: f64) -> Self {
        Self {
            latitude,
            longitude,
            height,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite() && self.height.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meridian_reduction() {
        let m = CartesianPoint::new(3.0, -4.0, 7.0).to_meridian();
        assert_eq!(m.p, 5.0);
        assert_eq!(m.z, 7.0);
    }

    #[test]
    fn test_distances() {
        let p0 = CartesianPoint::new(4000.0, 0.0, 5000.0);
        let p1 = CartesianPoint::new(4100.0, 0.0, 5000.0);
        assert!((p0.distance(&p1) - 100.0).abs() < 1e-9);
        assert_eq!(p0.distance(&p0), 0.0);

        let m0 = MeridianPoint::new(1.0, 1.0);
        let m1 = MeridianPoint::new(4.0, -3.0);
        assert!((m0.distance(&m1) - 5.0).abs() < 1e-12);
        assert_eq!(m1.radius_l1(), 7.0);
    }

    #[test]
    fn test_finite_checks() {
        assert!(CartesianPoint::new(1.0, 2.0, 3.0).is_finite());
        assert!(!CartesianPoint::new(f64::NAN, 2.0, 3.0).is_finite());
        assert!(!GeodeticPoint::new(0.0, f64::INFINITY, 0.0).is_finite());
    }
}
