pub mod constants;
pub mod error;
pub mod ellipsoid;
pub mod point;
pub mod solver;
pub mod projector;
pub mod recover;
pub mod geodesy;
pub mod config;
pub mod input;
pub mod output;

pub use ellipsoid::Ellipsoid;
pub use error::GeoError;
pub use geodesy::{
    cartesian_to_geodetic, cartesian_to_geodetic_observed, geodetic_to_cartesian, Conversion,
    TraceEvent,
};
pub use point::{CartesianPoint, GeodeticPoint, MeridianPoint};
pub use solver::{RootFindResult, RootFinder, SolverConfig, SolverMethod};
