//! constrained — bound, inequality and equality constrained minimization.
//!
//! Purpose
//! -------
//! Solve `min f(x)` subject to `lower ≤ x ≤ upper`, `c(x) ≥ 0`, `h(x) = 0`
//! for smooth `f`, `c`, `h` by an augmented-Lagrangian outer loop whose
//! subproblems are solved with the L-BFGS [`minimize`](super::minimizer::minimize)
//! in box-transformed coordinates.
//!
//! Downstream usage
//! ----------------
//! - The RBDO driver implements [`ConstrainedProblem`] with reliability
//!   constraints `g*_i(d) ≥ 0` and supplies envelope-theorem Jacobians.
//! - The deterministic design optimizer uses the default finite-difference
//!   derivatives.

pub mod augmented_lagrangian;
pub mod traits;

pub use self::augmented_lagrangian::minimize_constrained;
pub use self::traits::{
    ConstrainedOptions, ConstrainedOutcome, ConstrainedProblem, ConstrainedStatus,
};
