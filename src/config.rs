use clap::{Parser, ValueEnum};

use crate::constants::{
    DEFAULT_MAX_ITERATIONS, DEFAULT_SEMI_MAJOR, DEFAULT_SEMI_MINOR, DEFAULT_TOLERANCE,
};
use crate::ellipsoid::Ellipsoid;
use crate::error::Result;
use crate::point::CartesianPoint;
use crate::solver::{SolverConfig, SolverMethod};

/// Report format for the command-line driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Geodetic/Cartesian round-trip converter
///
/// Reads latitude, longitude and height (prompting for any that are missing),
/// converts them to Cartesian coordinates and back, and prints the comparison.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lat: Option<f64>,

    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    pub lon: Option<f64>,

    /// Height above the ellipsoid, in the unit of the semi-axes
    #[arg(long, allow_negative_numbers = true)]
    pub height: Option<f64>,

    /// Convert a Cartesian point to geodetic coordinates instead of round-tripping.
    #[arg(
        long,
        num_args = 3,
        value_names = ["X", "Y", "Z"],
        allow_negative_numbers = true,
        conflicts_with_all = ["lat", "lon", "height"]
    )]
    pub cartesian: Option<Vec<f64>>,

    /// Ellipsoid semi-major axis
    #[arg(short = 'a', long, default_value_t = DEFAULT_SEMI_MAJOR)]
    pub semi_major: f64,

    /// Ellipsoid semi-minor axis
    #[arg(short = 'b', long, default_value_t = DEFAULT_SEMI_MINOR)]
    pub semi_minor: f64,

    /// Root-finding method for the Cartesian to geodetic solve
    #[arg(long, value_enum, default_value_t = SolverMethod::Newton)]
    pub method: SolverMethod,

    /// Convergence threshold on the weighted residual norm
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    pub tolerance: f64,

    /// Maximum number of solver iterations
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    pub max_iterations: usize,

    /// Log the geodetic estimate at every solver iteration
    #[arg(long, default_value_t = false)]
    pub trace: bool,

    /// Verbose logging (DEBUG level)
    #[arg(long, short, default_value_t = false)]
    pub verbose: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

impl Config {
    pub fn ellipsoid(&self) -> Result<Ellipsoid> {
        Ellipsoid::new(self.semi_major, self.semi_minor)
    }

    pub fn solver_config(&self) -> Result<SolverConfig> {
        let config = SolverConfig {
            method: self.method,
            tolerance: self.tolerance,
            max_iterations: self.max_iterations,
            trace: self.trace,
        };
        config.validate()?;
        Ok(config)
    }

    /// The `--cartesian` point, if one was given
    pub fn cartesian_point(&self) -> Option<CartesianPoint> {
        match self.cartesian.as_deref() {
            Some(&[x, y, z]) => Some(CartesianPoint::new(x, y, z)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GeoError;

    #[test]
    fn test_defaults() {
        let config = Config::try_parse_from(["geocart"]).unwrap();
        assert_eq!(config.lat, None);
        assert_eq!(config.cartesian_point(), None);
        assert_eq!(config.ellipsoid().unwrap(), Ellipsoid::default());
        assert_eq!(config.solver_config().unwrap(), SolverConfig::default());
        assert_eq!(config.format, OutputFormat::Text);
    }

    #[test]
    fn test_negative_coordinates() {
        let config = Config::try_parse_from([
            "geocart", "--lat", "-33.9", "--lon", "18.4", "--height", "-0.5",
        ])
        .unwrap();
        assert_eq!(config.lat, Some(-33.9));
        assert_eq!(config.lon, Some(18.4));
        assert_eq!(config.height, Some(-0.5));
    }

    #[test]
    fn test_cartesian_and_solver_options() {
        let config = Config::try_parse_from([
            "geocart",
            "--cartesian",
            "-6378",
            "0",
            "10",
            "--method",
            "lm",
            "--tolerance",
            "1e-10",
            "--max-iterations",
            "20",
            "--trace",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(config.cartesian_point(), Some(CartesianPoint::new(-6378.0, 0.0, 10.0)));

        let solver = config.solver_config().unwrap();
        assert_eq!(solver.method, SolverMethod::LevenbergMarquardt);
        assert_eq!(solver.tolerance, 1e-10);
        assert_eq!(solver.max_iterations, 20);
        assert!(solver.trace);
        assert_eq!(config.format, OutputFormat::Json);
    }

    #[test]
    fn test_cartesian_conflicts_with_geodetic() {
        assert!(Config::try_parse_from(["geocart", "--cartesian", "1", "2", "3", "--lat", "4"]).is_err());
        assert!(Config::try_parse_from(["geocart", "--cartesian", "1", "2"]).is_err());
    }

    #[test]
    fn test_invalid_values_surface_as_errors() {
        let config = Config::try_parse_from(["geocart", "-a", "6000", "-b", "6500"]).unwrap();
        assert!(matches!(config.ellipsoid(), Err(GeoError::InvalidParameter(_))));

        let config = Config::try_parse_from(["geocart", "--max-iterations", "0"]).unwrap();
        assert!(matches!(config.solver_config(), Err(GeoError::InvalidParameter(_))));
    }
}
