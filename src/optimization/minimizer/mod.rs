//! minimizer — argmin-powered smooth unconstrained minimization.
//!
//! Purpose
//! -------
//! Provide an Argmin-backed L-BFGS layer for **minimizing** smooth scalar
//! functions `f(x)`. Callers implement a single trait, [`Objective`], and
//! invoke [`minimize`] with a configurable line search, tolerances and
//! finite-difference fallbacks.
//!
//! Key behaviors
//! -------------
//! - Bridge user objectives into Argmin via [`adapter::ArgMinAdapter`].
//! - Expose a single entrypoint [`minimize`] that validates the initial
//!   guess with [`Objective::check`], selects a solver via [`builders`],
//!   executes it via [`run::run_lbfgs`] and normalizes the result into an
//!   [`OptimOutcome`].
//! - Provide finite-difference gradients and Jacobians in [`finite_diff`]
//!   for functions without analytic derivatives.
//!
//! Invariants & assumptions
//! ------------------------
//! - [`Objective::value`] and [`Objective::grad`] report undefined points as
//!   recoverable [`OptError`](crate::optimization::errors::OptError) values,
//!   never panics.
//! - Configuration types ([`Tolerances`], [`MinimizeOptions`]) are validated
//!   on construction.
//!
//! Conventions
//! -----------
//! - Points live in an unconstrained space as [`Point`] (`Array1<f64>`).
//!   Box bounds are handled one layer up by
//!   [`BoxTransform`](crate::optimization::numerical_stability::BoxTransform).
//! - `OptimOutcome::converged` is `true` only for tolerance-based stops.
//!
//! Downstream usage
//! ----------------
//! - The augmented-Lagrangian solver in
//!   [`constrained`](crate::optimization::constrained) minimizes each
//!   subproblem through [`minimize`].
//!
//! Testing notes
//! -------------
//! - Unit tests cover validation, gradient fallback in [`adapter`] and
//!   [`finite_diff`], option parsing in [`traits`], and end-to-end runs in
//!   [`api`].

pub mod adapter;
pub mod api;
pub mod builders;
pub mod finite_diff;
pub mod run;
pub mod traits;
pub mod types;
pub mod validation;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::api::minimize;
pub use self::finite_diff::{fd_gradient, fd_jacobian};
pub use self::traits::{LineSearcher, MinimizeOptions, Objective, OptimOutcome, Tolerances};
pub use self::types::{Cost, FnEvalMap, Grad, Jacobian, Point, DEFAULT_LBFGS_MEM};
