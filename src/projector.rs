// Orthogonal projection of a meridian-plane point onto the ellipse
//
// Unknowns (p_E, z_E) satisfy
//   f1 = (p_E - p_G) * H * z_E - (z_E - z_G) * G * p_E = 0   (normal passes through target)
//   f2 = G * p_E^2 + H * z_E^2 - K = 0                       (point lies on the ellipse)
//
// The solver sees w_i * f_i with w_i = 1 / (a * |grad f_i|) at the starting
// point, so each weighted residual is roughly a distance to its zero curve
// relative to the semi-major axis. The foot point closest to the target is
// the only root in the target's quadrant (p >= 0, z on the target's side).

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use nalgebra::{Matrix2, Vector2};

use crate::ellipsoid::Ellipsoid;
use crate::error::{GeoError, Result};
use crate::point::MeridianPoint;
use crate::solver::{Iterate, NonlinearSystem, RootFinder};

/// Bisection budget for moving the start along the ellipse arc
const MAX_BRACKET_STEPS: usize = 60;

/// Smallest gradient norm used for weighting, relative to the semi-major axis
const GRADIENT_FLOOR: f64 = 1e-12;

/// The projection system for one target point
#[derive(Debug, Clone)]
pub struct MeridianSystem {
    g: f64,
    h: f64,
    k: f64,
    target: MeridianPoint,
    w1: f64,
    w2: f64,
}

impl MeridianSystem {
    /// Build the system for `target`, weighting both equations at `start`
    pub fn new(ellipsoid: &Ellipsoid, target: MeridianPoint, start: &MeridianPoint) -> Self {
        let mut system = Self {
            g: ellipsoid.g(),
            h: ellipsoid.h(),
            k: ellipsoid.k(),
            target,
            w1: 1.0,
            w2: 1.0,
        };

        let gradients = system.raw_jacobian(start.p, start.z);
        let floor = GRADIENT_FLOOR * ellipsoid.a();
        system.w1 = 1.0 / (ellipsoid.a() * gradients.row(0).norm().max(floor));
        system.w2 = 1.0 / (ellipsoid.a() * gradients.row(1).norm().max(floor));
        system
    }

    /// Unweighted (f1, f2)
    pub fn raw_residual(&self, pe: f64, ze: f64) -> (f64, f64) {
        let MeridianPoint { p: pg, z: zg } = self.target;
        // f1 expanded so that the a*b sized terms cancel exactly
        (
            (self.h - self.g) * pe * ze - self.h * pg * ze + self.g * zg * pe,
            self.g * pe * pe + self.h * ze * ze - self.k,
        )
    }

    fn raw_jacobian(&self, pe: f64, ze: f64) -> Matrix2<f64> {
        let MeridianPoint { p: pg, z: zg } = self.target;
        Matrix2::new(
            (self.h - self.g) * ze + self.g * zg,
            (self.h - self.g) * pe - self.h * pg,
            2.0 * self.g * pe,
            2.0 * self.h * ze,
        )
    }

    /// Whether `point` lies in the target's quadrant
    pub fn in_quadrant(&self, point: &MeridianPoint) -> bool {
        point.p >= 0.0 && point.z * self.target.z >= 0.0
    }
}

impl NonlinearSystem for MeridianSystem {
    fn residual(&self, x: &Vector2<f64>) -> Vector2<f64> {
        let (f1, f2) = self.raw_residual(x[0], x[1]);
        Vector2::new(self.w1 * f1, self.w2 * f2)
    }

    fn jacobian(&self, x: &Vector2<f64>) -> Option<Matrix2<f64>> {
        let mut jacobian = self.raw_jacobian(x[0], x[1]);
        jacobian.row_mut(0).scale_mut(self.w1);
        jacobian.row_mut(1).scale_mut(self.w2);
        Some(jacobian)
    }

    fn admissible(&self, x: &Vector2<f64>) -> bool {
        self.in_quadrant(&MeridianPoint::new(x[0], x[1]))
    }
}

/// A solved foot point and the work it took
#[derive(Debug, Clone, Copy)]
pub struct Projection {
    pub point: MeridianPoint,
    pub iterations: usize,
    pub evaluations: usize,
    /// Weighted residual norm at `point`
    pub residual_norm: f64,
}

/// Scale the target radially onto the ellipsoid: r = 1/|target|, (a*p*r, b*z*r)
///
/// # Errors
/// `DegenerateInput` for the ellipsoid centre, where the direction is undefined.
pub fn initial_guess(ellipsoid: &Ellipsoid, target: &MeridianPoint) -> Result<MeridianPoint> {
    let norm = target.p.hypot(target.z);
    if norm == 0.0 {
        return Err(GeoError::DegenerateInput(
            "point at the ellipsoid centre has no radial initial guess".to_string(),
        ));
    }
    let r = 1.0 / norm;
    Ok(MeridianPoint::new(
        ellipsoid.a() * target.p * r,
        ellipsoid.b() * target.z * r,
    ))
}

/// G*p^2 + H*z^2 - K: zero for points on the ellipse
pub fn ellipse_residual(ellipsoid: &Ellipsoid, point: &MeridianPoint) -> f64 {
    ellipsoid.g() * point.p * point.p + ellipsoid.h() * point.z * point.z - ellipsoid.k()
}

/// Radial guess, moved along the ellipse when it lies outside Newton's reach.
///
/// On the arc (a cos t, b sin t), t in [0, pi/2], the normal condition reads
///   f(t) = (a^2 - b^2) cos t sin t - a p_G sin t + b |z_G| cos t
/// with f(0) >= 0 >= f(pi/2) and a single root in between. Near the centre
/// f has a hump between the radial guess and that root, and Newton heads for
/// a foot point in another quadrant. The bracket is bisected until a Newton
/// step from the current angle stays inside it.
///
/// # Errors
/// `DegenerateInput` for the ellipsoid centre.
pub fn starting_point(ellipsoid: &Ellipsoid, target: &MeridianPoint) -> Result<MeridianPoint> {
    let radial = initial_guess(ellipsoid, target)?;

    let (a, b) = (ellipsoid.a(), ellipsoid.b());
    let c2 = a * a - b * b;
    let (pg, zg) = (target.p, target.z.abs());

    let mut angle = zg.atan2(pg);
    if zg == 0.0 {
        // (a, 0) is the nearest point unless the target is inside the evolute
        if pg * a >= c2 {
            return Ok(radial);
        }
        angle = FRAC_PI_4;
    }

    let (mut lo, mut hi) = (0.0, FRAC_PI_2);
    for _ in 0..MAX_BRACKET_STEPS {
        let (sin, cos) = angle.sin_cos();
        let f = c2 * cos * sin - a * pg * sin + b * zg * cos;
        if f == 0.0 {
            break;
        }
        if f > 0.0 {
            lo = angle;
        } else {
            hi = angle;
        }

        let slope = c2 * (2.0 * angle).cos() - a * pg * cos - b * zg * sin;
        let newton = angle - f / slope;
        if slope != 0.0 && lo < newton && newton < hi {
            break;
        }
        angle = 0.5 * (lo + hi);
    }

    let (sin, cos) = angle.sin_cos();
    let z = if target.z < 0.0 { -b * sin } else { b * sin };
    Ok(MeridianPoint::new(a * cos, z))
}

/// Project `target` orthogonally onto the nearest point of the ellipse of `ellipsoid`.
///
/// # Arguments
/// * `ellipsoid` - Reference ellipsoid
/// * `target` - Meridian-plane point (p_G >= 0)
/// * `finder` - Root-finding strategy
/// * `tolerance` - Threshold on the weighted residual norm
/// * `max_iterations` - Solver step cap
/// * `observer` - Receives every solver iterate
///
/// # Errors
/// * `NumericDomain` for non-finite or negative-radius targets
/// * `DegenerateInput` for the ellipsoid centre
/// * `Convergence` when the solver stops above tolerance, or converges to a
///   foot point outside the target's quadrant
pub fn project(
    ellipsoid: &Ellipsoid,
    target: MeridianPoint,
    finder: &dyn RootFinder,
    tolerance: f64,
    max_iterations: usize,
    observer: &mut dyn FnMut(&Iterate),
) -> Result<Projection> {
    if !(target.p.is_finite() && target.z.is_finite()) {
        return Err(GeoError::NumericDomain(format!(
            "meridian point is not finite: {:?}",
            target
        )));
    }
    if target.p < 0.0 {
        return Err(GeoError::NumericDomain(format!(
            "distance from the rotation axis must be non-negative (p={})",
            target.p
        )));
    }

    let start = starting_point(ellipsoid, &target)?;
    let system = MeridianSystem::new(ellipsoid, target, &start);

    let result = finder.solve(
        &system,
        Vector2::new(start.p, start.z),
        tolerance,
        max_iterations,
        observer,
    );

    if !result.converged {
        return Err(GeoError::Convergence {
            method: finder.name().to_string(),
            iterations: result.iterations,
            residual: result.residual_norm,
        });
    }

    let point = MeridianPoint::new(result.solution[0], result.solution[1]);
    if !system.in_quadrant(&point) {
        // Orthogonal, but not the nearest foot point
        return Err(GeoError::Convergence {
            method: finder.name().to_string(),
            iterations: result.iterations,
            residual: result.residual_norm,
        });
    }

    Ok(Projection {
        point,
        iterations: result.iterations,
        evaluations: result.evaluations,
        residual_norm: result.residual_norm,
    })
}
