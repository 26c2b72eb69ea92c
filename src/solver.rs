// Root finding for two-variable nonlinear systems
//
// Solvers are interchangeable strategies behind `RootFinder`. Each one
// iterates from an initial guess until the residual norm drops to the
// tolerance or the iteration cap is hit, and reports which happened.

use std::fmt;

use nalgebra::{Matrix2, Vector2};
use tracing::debug;

use crate::constants::{DEFAULT_MAX_ITERATIONS, DEFAULT_TOLERANCE, FD_STEP};
use crate::error::{GeoError, Result};

/// Levenberg-Marquardt damping schedule
const LM_INITIAL_DAMPING: f64 = 1e-3;
const LM_MIN_DAMPING: f64 = 1e-12;
const LM_MAX_DAMPING: f64 = 1e12;
const LM_MAX_DAMPING_STEPS: usize = 30;

/// How many times a step may be halved to stay inside the admissible region
const MAX_STEP_HALVINGS: usize = 30;

/// A system of two equations in two unknowns
pub trait NonlinearSystem {
    /// Evaluate the residual vector at `x`
    fn residual(&self, x: &Vector2<f64>) -> Vector2<f64>;

    /// Analytic Jacobian at `x`, if the system has one.
    /// Solvers fall back to forward differences when this returns `None`.
    fn jacobian(&self, _x: &Vector2<f64>) -> Option<Matrix2<f64>> {
        None
    }

    /// Whether the solver may step to `x`. Every point is admissible by default.
    fn admissible(&self, _x: &Vector2<f64>) -> bool {
        true
    }
}

/// One solver iterate, handed to the observer before the convergence check
#[derive(Debug, Clone, Copy)]
pub struct Iterate {
    pub iteration: usize,
    pub x: Vector2<f64>,
    pub residual: Vector2<f64>,
}

/// Outcome of a root-finding run
#[derive(Debug, Clone)]
pub struct RootFindResult {
    /// Last iterate (the root when `converged`)
    pub solution: Vector2<f64>,
    /// Number of steps taken
    pub iterations: usize,
    /// Number of residual evaluations, finite-difference ones included
    pub evaluations: usize,
    /// Residual norm at `solution`
    pub residual_norm: f64,
    pub converged: bool,
}

/// Capability interface for nonlinear root finders
pub trait RootFinder {
    /// Human-readable solver name, used in errors and logs
    fn name(&self) -> &'static str;

    /// Solve `system(x) = 0` starting from `initial_guess`.
    ///
    /// # Arguments
    /// * `system` - Residual function with optional Jacobian
    /// * `initial_guess` - Starting point
    /// * `tolerance` - Convergence threshold on the residual 2-norm
    /// * `max_iterations` - Maximum number of steps
    /// * `observer` - Called once per iterate, including the initial guess
    fn solve(
        &self,
        system: &dyn NonlinearSystem,
        initial_guess: Vector2<f64>,
        tolerance: f64,
        max_iterations: usize,
        observer: &mut dyn FnMut(&Iterate),
    ) -> RootFindResult;
}

/// Counts residual evaluations and supplies a Jacobian for every system
struct Evaluator<'a> {
    system: &'a dyn NonlinearSystem,
    evaluations: usize,
}

impl<'a> Evaluator<'a> {
    fn new(system: &'a dyn NonlinearSystem) -> Self {
        Self {
            system,
            evaluations: 0,
        }
    }

    fn residual(&mut self, x: &Vector2<f64>) -> Vector2<f64> {
        self.evaluations += 1;
        self.system.residual(x)
    }

    fn jacobian(&mut self, x: &Vector2<f64>, fx: &Vector2<f64>) -> Matrix2<f64> {
        match self.system.jacobian(x) {
            Some(jacobian) => jacobian,
            None => self.finite_difference_jacobian(x, fx),
        }
    }

    /// Forward-difference Jacobian, step scaled to the magnitude of each coordinate
    fn finite_difference_jacobian(&mut self, x: &Vector2<f64>, fx: &Vector2<f64>) -> Matrix2<f64> {
        let mut jacobian = Matrix2::zeros();
        for j in 0..2 {
            let delta = FD_STEP * x[j].abs().max(1.0);
            let mut x_plus = *x;
            x_plus[j] += delta;
            let f_plus = self.residual(&x_plus);

            for i in 0..2 {
                jacobian[(i, j)] = (f_plus[i] - fx[i]) / delta;
            }
        }
        jacobian
    }

    fn finish(
        self,
        solution: Vector2<f64>,
        residual: Vector2<f64>,
        iterations: usize,
        converged: bool,
    ) -> RootFindResult {
        RootFindResult {
            solution,
            iterations,
            evaluations: self.evaluations,
            residual_norm: residual.norm(),
            converged,
        }
    }
}

/// Take `step` from `x`, halving it until the result is admissible
fn admissible_step(
    system: &dyn NonlinearSystem,
    x: &Vector2<f64>,
    step: &Vector2<f64>,
) -> Option<Vector2<f64>> {
    let mut scale = 1.0;
    for _ in 0..MAX_STEP_HALVINGS {
        let candidate = x + step * scale;
        if system.admissible(&candidate) {
            return Some(candidate);
        }
        scale *= 0.5;
    }
    None
}

/// Newton-Raphson with the analytic (or finite-difference) Jacobian.
/// Steps that would leave the admissible region are halved.
#[derive(Debug, Clone, Copy, Default)]
pub struct Newton;

impl RootFinder for Newton {
    fn name(&self) -> &'static str {
        "Newton"
    }

    fn solve(
        &self,
        system: &dyn NonlinearSystem,
        initial_guess: Vector2<f64>,
        tolerance: f64,
        max_iterations: usize,
        observer: &mut dyn FnMut(&Iterate),
    ) -> RootFindResult {
        let mut eval = Evaluator::new(system);
        let mut x = initial_guess;
        let mut f = eval.residual(&x);
        let mut iterations = 0;

        loop {
            observer(&Iterate { iteration: iterations, x, residual: f });

            let residual_norm = f.norm();
            if residual_norm <= tolerance {
                return eval.finish(x, f, iterations, true);
            }
            if !residual_norm.is_finite() || iterations >= max_iterations {
                break;
            }

            // J * dx = -f
            let jacobian = eval.jacobian(&x, &f);
            let Some(step) = jacobian.lu().solve(&(-f)) else {
                debug!("Newton: singular Jacobian at iteration {}", iterations);
                break;
            };

            let Some(x_new) = admissible_step(system, &x, &step) else {
                debug!("Newton: no admissible step at iteration {}", iterations);
                break;
            };

            x = x_new;
            f = eval.residual(&x);
            iterations += 1;
        }

        eval.finish(x, f, iterations, false)
    }
}

/// Broyden's "good" method: rank-one secant updates of an approximate Jacobian.
///
/// The approximation is seeded with the system's Jacobian at the initial
/// guess (finite differences if it has none), then never re-evaluated.
#[derive(Debug, Clone, Copy, Default)]
pub struct Broyden;

impl RootFinder for Broyden {
    fn name(&self) -> &'static str {
        "Broyden"
    }

    fn solve(
        &self,
        system: &dyn NonlinearSystem,
        initial_guess: Vector2<f64>,
        tolerance: f64,
        max_iterations: usize,
        observer: &mut dyn FnMut(&Iterate),
    ) -> RootFindResult {
        let mut eval = Evaluator::new(system);
        let mut x = initial_guess;
        let mut f = eval.residual(&x);
        let mut approx_jacobian = eval.jacobian(&x, &f);
        let mut iterations = 0;

        loop {
            observer(&Iterate { iteration: iterations, x, residual: f });

            let residual_norm = f.norm();
            if residual_norm <= tolerance {
                return eval.finish(x, f, iterations, true);
            }
            if !residual_norm.is_finite() || iterations >= max_iterations {
                break;
            }

            let Some(step) = approx_jacobian.lu().solve(&(-f)) else {
                debug!("Broyden: singular Jacobian approximation at iteration {}", iterations);
                break;
            };

            let Some(x_new) = admissible_step(system, &x, &step) else {
                debug!("Broyden: no admissible step at iteration {}", iterations);
                break;
            };
            let step = x_new - x;
            let f_new = eval.residual(&x_new);

            // B += (y - B s) s^T / (s^T s)
            let step_sq = step.dot(&step);
            if step_sq > 0.0 {
                let y = f_new - f;
                approx_jacobian += (y - approx_jacobian * step) * step.transpose() / step_sq;
            }

            x = x_new;
            f = f_new;
            iterations += 1;
        }

        eval.finish(x, f, iterations, false)
    }
}

/// Levenberg-Marquardt: Gauss-Newton with adaptive diagonal damping.
///
/// The damping follows the gain ratio between the actual and the predicted
/// reduction of |f|^2 (Nielsen's update). Inadmissible trial points count
/// as rejected steps.
#[derive(Debug, Clone, Copy, Default)]
pub struct LevenbergMarquardt;

impl RootFinder for LevenbergMarquardt {
    fn name(&self) -> &'static str {
        "Levenberg-Marquardt"
    }

    fn solve(
        &self,
        system: &dyn NonlinearSystem,
        initial_guess: Vector2<f64>,
        tolerance: f64,
        max_iterations: usize,
        observer: &mut dyn FnMut(&Iterate),
    ) -> RootFindResult {
        let mut eval = Evaluator::new(system);
        let mut x = initial_guess;
        let mut f = eval.residual(&x);
        let mut lambda = LM_INITIAL_DAMPING;
        let mut growth = 2.0;
        let mut iterations = 0;

        loop {
            observer(&Iterate { iteration: iterations, x, residual: f });

            let residual_norm = f.norm();
            if residual_norm <= tolerance {
                return eval.finish(x, f, iterations, true);
            }
            if !residual_norm.is_finite() || iterations >= max_iterations {
                break;
            }

            // (J^T J + λ diag(J^T J)) Δx = -J^T r
            let jacobian = eval.jacobian(&x, &f);
            let jt = jacobian.transpose();
            let jtj = jt * jacobian;
            let jtr = jt * f;
            let residual_sq = residual_norm * residual_norm;

            let mut accepted = false;
            for _ in 0..LM_MAX_DAMPING_STEPS {
                let mut jtj_damped = jtj;
                for i in 0..2 {
                    jtj_damped[(i, i)] *= 1.0 + lambda;
                }

                if let Some(step) = jtj_damped.lu().solve(&(-jtr)) {
                    let x_new = x + step;
                    if system.admissible(&x_new) {
                        let f_new = eval.residual(&x_new);
                        let predicted = residual_sq - (f + jacobian * step).norm_squared();
                        let actual = residual_sq - f_new.norm_squared();

                        if predicted > 0.0 && actual > 0.0 {
                            // Good step, accept it and relax damping by the gain ratio
                            let rho = actual / predicted;
                            let factor = (1.0 - (2.0 * rho - 1.0).powi(3)).max(1.0 / 3.0);
                            lambda = (lambda * factor).max(LM_MIN_DAMPING);
                            growth = 2.0;
                            x = x_new;
                            f = f_new;
                            accepted = true;
                            break;
                        }
                    }
                }

                lambda *= growth;
                growth *= 2.0;
                if lambda > LM_MAX_DAMPING {
                    break;
                }
            }

            if !accepted {
                debug!(
                    "Levenberg-Marquardt: no improving step at iteration {} (damping {:e})",
                    iterations, lambda
                );
                break;
            }
            iterations += 1;
        }

        eval.finish(x, f, iterations, false)
    }
}

/// Built-in solver selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SolverMethod {
    #[default]
    Newton,
    Broyden,
    #[value(alias = "lm")]
    LevenbergMarquardt,
}

impl SolverMethod {
    pub fn finder(self) -> &'static dyn RootFinder {
        match self {
            SolverMethod::Newton => &Newton,
            SolverMethod::Broyden => &Broyden,
            SolverMethod::LevenbergMarquardt => &LevenbergMarquardt,
        }
    }
}

impl fmt::Display for SolverMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.finder().name())
    }
}

/// Options for the Cartesian to geodetic solve
#[derive(Debug, Clone, PartialEq)]
pub struct SolverConfig {
    pub method: SolverMethod,
    /// Threshold on the weighted residual norm (dimensionless)
    pub tolerance: f64,
    pub max_iterations: usize,
    /// Emit every iterate as a DEBUG event
    pub trace: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            method: SolverMethod::default(),
            tolerance: DEFAULT_TOLERANCE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            trace: false,
        }
    }
}

impl SolverConfig {
    pub fn with_method(method: SolverMethod) -> Self {
        Self {
            method,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(GeoError::InvalidParameter(format!(
                "tolerance must be positive and finite (tolerance={})",
                self.tolerance
            )));
        }
        if self.max_iterations == 0 {
            return Err(GeoError::InvalidParameter(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOLERANCE: f64 = 1e-12;

    /// Circle of radius 2 intersected with the line x = y; root at (√2, √2)
    struct CircleLine {
        analytic: bool,
    }

    impl NonlinearSystem for CircleLine {
        fn residual(&self, x: &Vector2<f64>) -> Vector2<f64> {
            Vector2::new(x[0] * x[0] + x[1] * x[1] - 4.0, x[0] - x[1])
        }

        fn jacobian(&self, x: &Vector2<f64>) -> Option<Matrix2<f64>> {
            self.analytic
                .then(|| Matrix2::new(2.0 * x[0], 2.0 * x[1], 1.0, -1.0))
        }
    }

    /// x^2 + 1 = 0 has no real root and a singular Jacobian at x = 0
    struct NoRealRoot;

    impl NonlinearSystem for NoRealRoot {
        fn residual(&self, x: &Vector2<f64>) -> Vector2<f64> {
            Vector2::new(x[0] * x[0] + 1.0, x[1])
        }

        fn jacobian(&self, x: &Vector2<f64>) -> Option<Matrix2<f64>> {
            Some(Matrix2::new(2.0 * x[0], 0.0, 0.0, 1.0))
        }
    }

    /// ln(x) = 0, y = 0; only defined for x > 0
    struct Logarithm {
        restricted: bool,
    }

    impl NonlinearSystem for Logarithm {
        fn residual(&self, x: &Vector2<f64>) -> Vector2<f64> {
            Vector2::new(x[0].ln(), x[1])
        }

        fn jacobian(&self, x: &Vector2<f64>) -> Option<Matrix2<f64>> {
            Some(Matrix2::new(1.0 / x[0], 0.0, 0.0, 1.0))
        }

        fn admissible(&self, x: &Vector2<f64>) -> bool {
            !self.restricted || x[0] > 0.0
        }
    }

    fn assert_root(result: &RootFindResult) {
        let root = std::f64::consts::SQRT_2;
        assert!(result.converged, "did not converge: {:?}", result);
        assert!(result.residual_norm <= TOLERANCE);
        assert!((result.solution[0] - root).abs() < 1e-9, "x = {}", result.solution[0]);
        assert!((result.solution[1] - root).abs() < 1e-9, "y = {}", result.solution[1]);
    }

    #[test]
    fn test_all_methods_find_root() {
        for method in [
            SolverMethod::Newton,
            SolverMethod::Broyden,
            SolverMethod::LevenbergMarquardt,
        ] {
            let result = method.finder().solve(
                &CircleLine { analytic: true },
                Vector2::new(1.5, 1.2),
                TOLERANCE,
                50,
                &mut |_| {},
            );
            assert_root(&result);
            assert!(result.iterations <= 50, "{} took {} iterations", method, result.iterations);
        }
    }

    #[test]
    fn test_finite_difference_jacobian() {
        for method in [
            SolverMethod::Newton,
            SolverMethod::Broyden,
            SolverMethod::LevenbergMarquardt,
        ] {
            let result = method.finder().solve(
                &CircleLine { analytic: false },
                Vector2::new(1.0, 0.5),
                TOLERANCE,
                50,
                &mut |_| {},
            );
            assert_root(&result);
        }
    }

    #[test]
    fn test_newton_evaluation_count() {
        let result = Newton.solve(
            &CircleLine { analytic: true },
            Vector2::new(1.0, 0.5),
            TOLERANCE,
            50,
            &mut |_| {},
        );
        assert_root(&result);
        // One residual per step plus the initial guess
        assert_eq!(result.evaluations, result.iterations + 1);

        let fd = Newton.solve(
            &CircleLine { analytic: false },
            Vector2::new(1.0, 0.5),
            TOLERANCE,
            50,
            &mut |_| {},
        );
        assert!(fd.evaluations > fd.iterations + 1);
    }

    #[test]
    fn test_observer_sees_every_iterate() {
        let mut seen = Vec::new();
        let result = Newton.solve(
            &CircleLine { analytic: true },
            Vector2::new(1.0, 0.5),
            TOLERANCE,
            50,
            &mut |it| seen.push(it.iteration),
        );
        assert_eq!(seen.len(), result.iterations + 1);
        assert_eq!(seen[0], 0);
        assert_eq!(*seen.last().unwrap(), result.iterations);
    }

    #[test]
    fn test_exact_initial_guess_takes_no_steps() {
        let root = std::f64::consts::SQRT_2;
        let result = Broyden.solve(
            &CircleLine { analytic: true },
            Vector2::new(root, root),
            1e-9,
            50,
            &mut |_| {},
        );
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_iteration_cap_reports_failure() {
        let result = Newton.solve(
            &CircleLine { analytic: true },
            Vector2::new(100.0, -3.0),
            TOLERANCE,
            1,
            &mut |_| {},
        );
        assert!(!result.converged);
        assert_eq!(result.iterations, 1);
        assert!(result.residual_norm > TOLERANCE);
    }

    #[test]
    fn test_singular_jacobian_reports_failure() {
        for method in [
            SolverMethod::Newton,
            SolverMethod::Broyden,
            SolverMethod::LevenbergMarquardt,
        ] {
            let result = method.finder().solve(
                &NoRealRoot,
                Vector2::new(0.0, 1.0),
                TOLERANCE,
                50,
                &mut |_| {},
            );
            assert!(!result.converged, "{} claimed convergence", method);
            assert!(result.iterations <= 50);
        }
    }

    #[test]
    fn test_steps_stay_admissible() {
        // The full Newton step from x = 3 lands at x < 0
        for method in [
            SolverMethod::Newton,
            SolverMethod::Broyden,
            SolverMethod::LevenbergMarquardt,
        ] {
            let mut left_domain = false;
            let result = method.finder().solve(
                &Logarithm { restricted: true },
                Vector2::new(3.0, 0.5),
                TOLERANCE,
                50,
                &mut |it| left_domain |= it.x[0] <= 0.0,
            );
            assert!(result.converged, "{}: {:?}", method, result);
            assert!(!left_domain, "{} stepped outside x > 0", method);
            assert!((result.solution[0] - 1.0).abs() < 1e-9);
        }

        let unrestricted = Newton.solve(
            &Logarithm { restricted: false },
            Vector2::new(3.0, 0.5),
            TOLERANCE,
            50,
            &mut |_| {},
        );
        assert!(!unrestricted.converged);
    }

    #[test]
    fn test_method_names() {
        assert_eq!(SolverMethod::Newton.to_string(), "Newton");
        assert_eq!(SolverMethod::Broyden.to_string(), "Broyden");
        assert_eq!(SolverMethod::LevenbergMarquardt.to_string(), "Levenberg-Marquardt");
    }

    #[test]
    fn test_config_validation() {
        assert!(SolverConfig::default().validate().is_ok());

        let mut config = SolverConfig::default();
        config.tolerance = 0.0;
        assert!(matches!(config.validate(), Err(GeoError::InvalidParameter(_))));

        config.tolerance = f64::NAN;
        assert!(config.validate().is_err());

        let config = SolverConfig {
            max_iterations: 0,
            ..SolverConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
