//! Errors for probabilistic model construction, evaluation and the
//! isoprobabilistic transform.
//!
//! ## Conventions
//! - Structural problems (unknown names, duplicate declarations, cycles,
//!   invalid copulas) are raised by the builder, never during solving.
//! - Transform and evaluation errors carry the variable or function name so
//!   a failed FORM step can be traced back to its cause.
use statrs::distribution::{ExpError, LogNormalError, NormalError, UniformError, WeibullError};

/// Result alias for model operations that may produce [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    // ---- Declarations ----
    /// Names must be non-empty.
    EmptyName { context: &'static str },

    /// A variable name was declared twice.
    DuplicateVariable { name: String },

    /// A name was declared as both deterministic and random.
    VariableBothDetAndRand { name: String },

    /// A name is repeated inside a single declaration.
    RepeatedName { context: &'static str, name: String },

    /// A function output reuses an existing variable name.
    OutputShadowsVariable { function: String, output: String },

    /// Two functions declare the same output.
    DuplicateOutput { output: String, first: String, second: String },

    /// A function consumes a name that is neither a variable nor an output.
    UnknownInput { function: String, input: String },

    /// The function graph contains a cycle through these functions.
    CyclicDependency { functions: Vec<String> },

    /// Sensitivity tags must be -1, 0 or +1.
    InvalidSensitivity { value: i8 },

    // ---- Variables ----
    /// Bounds must satisfy `lower <= upper` and neither may be NaN.
    InvalidBounds { name: String, lower: f64, upper: f64 },

    /// Nominal value is missing, non-finite, or outside the bounds.
    InvalidNominal { name: String, value: f64, reason: &'static str },

    /// Marginal distribution parameters rejected by the distribution family.
    InvalidMarginal { family: &'static str, reason: String },

    // ---- Copulas ----
    /// A copula block names something that is not a random variable.
    CopulaUnknownVariable { variable: String },

    /// A random variable appears in more than one copula block.
    CopulaOverlap { variable: String },

    /// Correlation matrix entry is malformed.
    InvalidCorrelation { row: usize, col: usize, value: f64, reason: &'static str },

    /// Correlation matrix has no Cholesky factor.
    CorrelationNotPositiveDefinite,

    // ---- Evaluation ----
    /// Requested output is not produced by any function.
    UnknownOutput { name: String },

    /// Named deterministic or random variable does not exist.
    UnknownVariable { name: String },

    /// Input vector has the wrong length.
    DimensionMismatch { what: &'static str, expected: usize, found: usize },

    /// A function returned a different number of values than it declared.
    OutputArity { function: String, expected: usize, found: usize },

    /// Input value is NaN or infinite.
    NonFiniteInput { what: &'static str, index: usize, value: f64 },

    // ---- Transform ----
    /// The standard-normal ↔ physical map is undefined at this value.
    TransformOutOfDomain { variable: String, value: f64, reason: &'static str },

    /// Probability outside `(0, 1)` passed to a quantile.
    InvalidProbability { value: f64 },
}

impl std::error::Error for ModelError {}

impl std::fmt::Display for ModelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ---- Declarations ----
            ModelError::EmptyName { context } => write!(f, "Empty name in {context}"),
            ModelError::DuplicateVariable { name } => {
                write!(f, "Variable '{name}' is declared more than once")
            }
            ModelError::VariableBothDetAndRand { name } => {
                write!(f, "Variable '{name}' is declared both deterministic and random")
            }
            ModelError::RepeatedName { context, name } => {
                write!(f, "Name '{name}' is repeated in {context}")
            }
            ModelError::OutputShadowsVariable { function, output } => {
                write!(f, "Function '{function}' output '{output}' is already a variable")
            }
            ModelError::DuplicateOutput { output, first, second } => {
                write!(f, "Output '{output}' is declared by both '{first}' and '{second}'")
            }
            ModelError::UnknownInput { function, input } => {
                write!(f, "Function '{function}' consumes unknown input '{input}'")
            }
            ModelError::CyclicDependency { functions } => {
                write!(f, "Cyclic dependency among functions: {}", functions.join(", "))
            }
            ModelError::InvalidSensitivity { value } => {
                write!(f, "Invalid sensitivity tag {value}: expected -1, 0 or +1")
            }

            // ---- Variables ----
            ModelError::InvalidBounds { name, lower, upper } => {
                write!(f, "Invalid bounds for '{name}': [{lower}, {upper}]")
            }
            ModelError::InvalidNominal { name, value, reason } => {
                write!(f, "Invalid nominal value {value} for '{name}': {reason}")
            }
            ModelError::InvalidMarginal { family, reason } => {
                write!(f, "Invalid {family} marginal: {reason}")
            }

            // ---- Copulas ----
            ModelError::CopulaUnknownVariable { variable } => {
                write!(f, "Copula references '{variable}', which is not a random variable")
            }
            ModelError::CopulaOverlap { variable } => {
                write!(f, "Random variable '{variable}' appears in more than one copula")
            }
            ModelError::InvalidCorrelation { row, col, value, reason } => {
                write!(f, "Invalid correlation entry ({row}, {col}) = {value}: {reason}")
            }
            ModelError::CorrelationNotPositiveDefinite => {
                write!(f, "Correlation matrix is not positive definite")
            }

            // ---- Evaluation ----
            ModelError::UnknownOutput { name } => write!(f, "Unknown output '{name}'"),
            ModelError::UnknownVariable { name } => write!(f, "Unknown variable '{name}'"),
            ModelError::DimensionMismatch { what, expected, found } => {
                write!(f, "Dimension mismatch for {what}: expected {expected}, found {found}")
            }
            ModelError::OutputArity { function, expected, found } => {
                write!(f, "Function '{function}' returned {found} values, expected {expected}")
            }
            ModelError::NonFiniteInput { what, index, value } => {
                write!(f, "Non-finite {what} at index {index}: {value}")
            }

            // ---- Transform ----
            ModelError::TransformOutOfDomain { variable, value, reason } => {
                write!(f, "Transform undefined for '{variable}' at {value}: {reason}")
            }
            ModelError::InvalidProbability { value } => {
                write!(f, "Probability {value} is outside (0, 1)")
            }
        }
    }
}

impl From<NormalError> for ModelError {
    fn from(err: NormalError) -> ModelError {
        ModelError::InvalidMarginal { family: "normal", reason: err.to_string() }
    }
}

impl From<LogNormalError> for ModelError {
    fn from(err: LogNormalError) -> ModelError {
        ModelError::InvalidMarginal { family: "lognormal", reason: err.to_string() }
    }
}

impl From<UniformError> for ModelError {
    fn from(err: UniformError) -> ModelError {
        ModelError::InvalidMarginal { family: "uniform", reason: err.to_string() }
    }
}

impl From<WeibullError> for ModelError {
    fn from(err: WeibullError) -> ModelError {
        ModelError::InvalidMarginal { family: "weibull", reason: err.to_string() }
    }
}

impl From<ExpError> for ModelError {
    fn from(err: ExpError) -> ModelError {
        ModelError::InvalidMarginal { family: "exponential", reason: err.to_string() }
    }
}
