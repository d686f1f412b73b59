//! Error types for toroid analysis runs.
//!
//! Every variant is terminal for the current run: none of them depends on
//! timing or external systems, so there is nothing to retry.

use thiserror::Error;

/// Result type alias using the toroid [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while meshing, assembling, solving or post-processing.
#[derive(Error, Debug)]
pub enum Error {
    /// Non-positive radius or thickness, minor radius not below the major
    /// radius, or a resolution below 2.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// An element's Jacobian determinant is non-positive at an evaluation point.
    #[error("degenerate element {element}: Jacobian determinant {det_j:e}")]
    DegenerateElement { element: usize, det_j: f64 },

    /// The constrained system cannot be solved uniquely.
    #[error("singular system: {0}")]
    SingularSystem(String),

    /// Non-finite or out-of-domain scalar input.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// Solver plumbing errors (size mismatches, symbolic analysis).
    #[error("solver error: {0}")]
    Solver(String),

    /// Unreadable analysis configuration.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),
}

impl Error {
    /// Short machine-friendly name of the error class.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidGeometry(_) => "InvalidGeometryError",
            Error::DegenerateElement { .. } => "DegenerateElementError",
            Error::SingularSystem(_) => "SingularSystemError",
            Error::InputValidation(_) => "InputValidationError",
            Error::Solver(_) => "SolverError",
            Error::Config(_) => "ConfigError",
        }
    }
}
