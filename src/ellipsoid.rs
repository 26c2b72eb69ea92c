// Reference ellipsoid model
//
// A rotational ellipsoid is fully described by its semi-major axis `a` and
// semi-minor axis `b`. The meridian-plane projection works with the derived
// constants G = b/a, H = a/b and K = a*b, so the ellipse reads G*p^2 + H*z^2 = K.

use crate::constants::{
    DEFAULT_SEMI_MAJOR, DEFAULT_SEMI_MINOR, WGS84_SEMI_MAJOR, WGS84_SEMI_MINOR,
};
use crate::error::{GeoError, Result};

/// Reference ellipsoid parameters. Immutable once constructed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ellipsoid {
    a: f64,
    b: f64,
}

impl Ellipsoid {
    /// Rounded WGS84-like ellipsoid (a = 6378 km, b = 6356 km)
    pub const DEFAULT: Ellipsoid = Ellipsoid {
        a: DEFAULT_SEMI_MAJOR,
        b: DEFAULT_SEMI_MINOR,
    };

    /// WGS84 in kilometres
    pub const WGS84: Ellipsoid = Ellipsoid {
        a: WGS84_SEMI_MAJOR,
        b: WGS84_SEMI_MINOR,
    };

    /// Create an ellipsoid from its semi-axes.
    ///
    /// # Errors
    /// `GeoError::InvalidParameter` unless `a >= b > 0` and both are finite.
    pub fn new(a: f64, b: f64) -> Result<Self> {
        if !a.is_finite() || !b.is_finite() {
            return Err(GeoError::InvalidParameter(format!(
                "semi-axes must be finite (a={}, b={})",
                a, b
            )));
        }
        if b <= 0.0 {
            return Err(GeoError::InvalidParameter(format!(
                "semi-minor axis must be positive (b={})",
                b
            )));
        }
        if a < b {
            return Err(GeoError::InvalidParameter(format!(
                "semi-major axis must not be smaller than semi-minor axis (a={}, b={})",
                a, b
            )));
        }
        Ok(Self { a, b })
    }

    /// Create an ellipsoid from semi-major axis and flattening `f = (a - b) / a`.
    pub fn from_flattening(a: f64, f: f64) -> Result<Self> {
        if !(0.0..1.0).contains(&f) {
            return Err(GeoError::InvalidParameter(format!(
                "flattening must lie in [0, 1) (f={})",
                f
            )));
        }
        Self::new(a, a * (1.0 - f))
    }

    /// Semi-major axis
    pub fn a(&self) -> f64 {
        self.a
    }

    /// Semi-minor axis
    pub fn b(&self) -> f64 {
        self.b
    }

    /// G = b/a
    pub fn g(&self) -> f64 {
        self.b / self.a
    }

    /// H = a/b
    pub fn h(&self) -> f64 {
        self.a / self.b
    }

    /// K = a*b
    pub fn k(&self) -> f64 {
        self.a * self.b
    }

    /// First eccentricity squared: 1 - (b/a)^2
    pub fn eccentricity_squared(&self) -> f64 {
        let g = self.g();
        1.0 - g * g
    }

    pub fn flattening(&self) -> f64 {
        (self.a - self.b) / self.a
    }
}

impl Default for Ellipsoid {
    fn default() -> Self {
        Self::DEFAULT
    }
}
