//! reliability — reliability targets, FORM/PMA and Monte Carlo verification.
//!
//! Purpose
//! -------
//! Turn a limit state of a [`Model`](crate::model::Model) into a
//! reliability measure at a fixed design: the first-order performance
//! measure `g*(d)` at a target index β, or an empirical failure fraction.
//!
//! Key behaviors
//! -------------
//! - [`form_pma`]: minimum of `g` on the β-sphere in standard-normal space,
//!   with explicit errors for undefined starts and non-convergence.
//! - [`monte_carlo_failure_rate`] / [`verify_design`]: seeded sampling
//!   through the same transform, for validation only.
//!
//! Conventions
//! -----------
//! - `g > 0` is safe; `g* ≥ 0` is read as "constraint satisfied".
//! - Solves are independent; nothing is cached across calls.
pub mod errors;
pub mod form_pma;
pub mod monte_carlo;
pub mod options;
pub mod target;

pub use self::errors::{ReliabilityError, ReliabilityResult};
pub use self::form_pma::{form_pma, form_pma_from, FormOutcome};
pub use self::monte_carlo::{
    monte_carlo_failure_rate, recommended_sample_size, verify_design, FailureRate,
    MonteCarloEstimate, VerificationReport,
};
pub use self::options::FormOptions;
pub use self::target::{ReliabilityTarget, MAX_SAMPLE_SIZE};

pub mod prelude {
    pub use super::{
        form_pma, monte_carlo_failure_rate, FormOptions, FormOutcome, ReliabilityError,
        ReliabilityResult, ReliabilityTarget,
    };
}
