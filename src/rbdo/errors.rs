//! rbdo::errors — failures of design optimization runs.
//!
//! Conventions
//! -----------
//! - Bound problems are reported before the first evaluation
//!   ([`RbdoError::InfeasibleBounds`], [`RbdoError::InitialGuessOutOfBounds`]).
//! - A failed FORM/PMA solve at any trial design aborts the run as
//!   [`RbdoError::Reliability`]; it is never read as a satisfied constraint.
//! - Running out of iterations is a status on the outcome, turned into
//!   [`RbdoError::NotConverged`] only on request.
use crate::{
    model::errors::ModelError,
    optimization::{constrained::ConstrainedStatus, errors::OptError},
    reliability::errors::ReliabilityError,
};

/// Result alias for design optimization.
pub type RbdoResult<T> = Result<T, RbdoError>;

#[derive(Debug, Clone, PartialEq)]
pub enum RbdoError {
    // ---- Setup ----
    /// `lower > upper` or a NaN bound.
    InfeasibleBounds { variable: String, lower: f64, upper: f64 },

    /// Initial guess outside its bounds or non-finite.
    InitialGuessOutOfBounds { variable: String, value: f64, lower: f64, upper: f64 },

    /// Vector length does not match the number of design variables.
    DimensionMismatch { what: &'static str, expected: usize, found: usize },

    /// Deterministic optimization needs a model without random variables.
    RandomVariablesPresent { count: usize },

    // ---- Fitting ----
    /// A requested output has no column in the data.
    MissingColumn { name: String },

    /// Fit data is malformed (shape, duplicate or non-finite entries).
    InvalidFitData { reason: &'static str },

    /// Every variable is either in the data or fixed.
    NothingToFit,

    // ---- Run ----
    /// The run ended without meeting its tolerances.
    NotConverged { status: ConstrainedStatus, max_violation: f64, outer_iterations: usize },

    // ---- Layers ----
    Model(ModelError),
    Reliability(ReliabilityError),
    Optimization(OptError),
}

impl std::error::Error for RbdoError {}

impl std::fmt::Display for RbdoError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RbdoError::InfeasibleBounds { variable, lower, upper } => {
                write!(f, "Infeasible bounds for '{variable}': [{lower}, {upper}]")
            }
            RbdoError::InitialGuessOutOfBounds { variable, value, lower, upper } => write!(
                f,
                "Initial guess {value} for '{variable}' lies outside [{lower}, {upper}]"
            ),
            RbdoError::DimensionMismatch { what, expected, found } => {
                write!(f, "Dimension mismatch for {what}: expected {expected}, found {found}")
            }
            RbdoError::RandomVariablesPresent { count } => write!(
                f,
                "Deterministic optimization requires a model without random variables ({count} declared)"
            ),
            RbdoError::MissingColumn { name } => {
                write!(f, "Output '{name}' has no column in the fit data")
            }
            RbdoError::InvalidFitData { reason } => write!(f, "Invalid fit data: {reason}"),
            RbdoError::NothingToFit => write!(
                f,
                "No variables left to fit: every variable is a data column or fixed"
            ),
            RbdoError::NotConverged { status, max_violation, outer_iterations } => write!(
                f,
                "Design optimization did not converge ({status:?}) after {outer_iterations} outer \
                 iterations; max violation {max_violation}"
            ),
            RbdoError::Model(err) => write!(f, "Model error: {err}"),
            RbdoError::Reliability(err) => write!(f, "Reliability error: {err}"),
            RbdoError::Optimization(err) => write!(f, "Optimization error: {err}"),
        }
    }
}

impl From<ModelError> for RbdoError {
    fn from(err: ModelError) -> RbdoError {
        RbdoError::Model(err)
    }
}

impl From<ReliabilityError> for RbdoError {
    fn from(err: ReliabilityError) -> RbdoError {
        RbdoError::Reliability(err)
    }
}

impl From<OptError> for RbdoError {
    fn from(err: OptError) -> RbdoError {
        RbdoError::Optimization(err)
    }
}
