//! optimization — argmin-backed minimization, bound transforms, and a
//! unified error surface.
//!
//! Purpose
//! -------
//! Provide the numerical optimization layer used by reliability-based design:
//! an Argmin L-BFGS minimizer, numerically stable box transforms, and an
//! augmented-Lagrangian solver for constrained problems, all reporting
//! through one error enum.
//!
//! Key behaviors
//! -------------
//! - [`minimizer`]: smooth unconstrained minimization with configurable line
//!   search and finite-difference fallbacks.
//! - [`numerical_stability`]: stable scalar maps and [`BoxTransform`](numerical_stability::BoxTransform).
//! - [`constrained`]: `min f(x)` s.t. bounds, `c(x) ≥ 0`, `h(x) = 0`.
//! - [`errors`]: [`OptError`](errors::OptError) / [`OptResult`](errors::OptResult),
//!   including recovery of crate errors that travelled through Argmin.
//!
//! Conventions
//! -----------
//! - Points, gradients and Jacobians use `ndarray` aliases from
//!   [`minimizer::types`].
//! - Public entrypoints that can fail return `OptResult<T>`; callers never
//!   see raw Argmin errors.
//! - Progress is reported through `tracing` at debug level only.

pub mod constrained;
pub mod errors;
pub mod minimizer;
pub mod numerical_stability;

// ---- Optional convenience prelude for downstream crates -------------------

pub mod prelude {
    pub use super::constrained::{
        minimize_constrained, ConstrainedOptions, ConstrainedOutcome, ConstrainedProblem,
        ConstrainedStatus,
    };
    pub use super::errors::{OptError, OptResult};
    pub use super::minimizer::{minimize, MinimizeOptions, Objective, OptimOutcome, Point};
    pub use super::numerical_stability::BoxTransform;
}
