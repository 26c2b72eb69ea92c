use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    /// Malformed ellipsoid or solver configuration
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Longitude or initial guess undefined for the input point
    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("{method} solver did not converge after {iterations} iterations (residual {residual:e})")]
    Convergence {
        method: String,
        iterations: usize,
        residual: f64,
    },

    /// Non-finite input or an out-of-domain evaluation
    #[error("Numeric domain error: {0}")]
    NumericDomain(String),
}

pub type Result<T> = std::result::Result<T, GeoError>;
