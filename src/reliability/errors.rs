//! reliability::errors — failures of FORM/PMA solves and Monte Carlo runs.
//!
//! Purpose
//! -------
//! Give every reliability failure an explicit value so that a non-converged
//! FORM solve can never be mistaken for a satisfied constraint.
//!
//! Conventions
//! -----------
//! - Configuration problems (`InvalidBeta`, `InvalidTolerance`, ...) are
//!   raised before any model evaluation.
//! - [`ReliabilityError::NonConvergence`] carries the last iterate, its
//!   limit-state value and the KKT residual so callers can inspect or log
//!   the failed solve.
//! - Model errors (unknown outputs, transform failures outside a solve)
//!   pass through unchanged as [`ReliabilityError::Model`].
use crate::model::errors::ModelError;

/// Result alias for reliability operations.
pub type ReliabilityResult<T> = Result<T, ReliabilityError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ReliabilityError {
    // ---- Configuration ----
    /// Reliability index must be finite and strictly positive.
    InvalidBeta { value: f64 },

    /// Target failure probability must lie in (0, 0.5).
    InvalidPof { value: f64 },

    /// Solver tolerance must be finite and strictly positive.
    InvalidTolerance { name: &'static str, value: f64 },

    /// Iteration cap must be at least one.
    InvalidMaxIter { value: usize },

    /// Monte Carlo needs at least one sample.
    InvalidSampleSize { n: usize },

    /// Required Monte Carlo size is non-finite or above the sample cap.
    SampleSizeTooLarge { required: f64, cap: usize },

    /// Monte Carlo was asked for no limit states.
    EmptyLimitStates,

    // ---- FORM/PMA ----
    /// No finite limit-state value at the start point or any perturbation of it.
    UndefinedStart { limit_state: String, attempts: usize },

    /// The z-gradient is undefined even with one-sided differences.
    UndefinedGradient { limit_state: String, index: usize },

    /// The solve stopped without meeting its tolerances.
    NonConvergence {
        limit_state: String,
        iterations: usize,
        last_z: Vec<f64>,
        last_g: f64,
        residual: f64,
        reason: &'static str,
    },

    // ---- Model ----
    Model(ModelError),
}

impl std::error::Error for ReliabilityError {}

impl std::fmt::Display for ReliabilityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Configuration ----
            ReliabilityError::InvalidBeta { value } => {
                write!(f, "Invalid reliability index {value}: must be finite and positive")
            }
            ReliabilityError::InvalidPof { value } => {
                write!(f, "Invalid target failure probability {value}: must lie in (0, 0.5)")
            }
            ReliabilityError::InvalidTolerance { name, value } => {
                write!(f, "Invalid {name} = {value}: must be finite and positive")
            }
            ReliabilityError::InvalidMaxIter { value } => {
                write!(f, "Invalid iteration cap {value}: must be at least 1")
            }
            ReliabilityError::InvalidSampleSize { n } => {
                write!(f, "Invalid Monte Carlo sample size {n}: must be at least 1")
            }
            ReliabilityError::SampleSizeTooLarge { required, cap } => write!(
                f,
                "Monte Carlo sample size {required} exceeds the cap of {cap} samples"
            ),
            ReliabilityError::EmptyLimitStates => write!(f, "No limit states requested"),

            // ---- FORM/PMA ----
            ReliabilityError::UndefinedStart { limit_state, attempts } => write!(
                f,
                "Limit state '{limit_state}' is undefined at the start point and {attempts} perturbations"
            ),
            ReliabilityError::UndefinedGradient { limit_state, index } => write!(
                f,
                "Limit state '{limit_state}' has an undefined derivative along coordinate {index}"
            ),
            ReliabilityError::NonConvergence {
                limit_state,
                iterations,
                last_g,
                residual,
                reason,
                ..
            } => write!(
                f,
                "FORM/PMA for '{limit_state}' did not converge after {iterations} iterations \
                 ({reason}); last g = {last_g}, residual = {residual}"
            ),

            // ---- Model ----
            ReliabilityError::Model(err) => write!(f, "Model error: {err}"),
        }
    }
}

impl From<ModelError> for ReliabilityError {
    fn from(err: ModelError) -> ReliabilityError {
        ReliabilityError::Model(err)
    }
}
