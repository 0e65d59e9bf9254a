//! rbdo — reliability-based and deterministic design optimization.
//!
//! Purpose
//! -------
//! Choose values of a model's deterministic variables that minimize a cost
//! while every reliability constraint `g*_i(d) ≥ 0` holds at its target β.
//!
//! Key behaviors
//! -------------
//! - [`rbdo_solve`]: augmented-Lagrangian outer loop over the design box;
//!   each evaluation runs FORM/PMA per constraint, warm-started from the
//!   previous design point, with envelope-theorem constraint gradients.
//! - [`eval_min`]: the same solver over plain model outputs for models
//!   without random variables.
//! - [`eval_nls`]: least-squares fit of model variables to observed data,
//!   over the same solver with only box bounds.
//! - [`eval_grad_fd`]: finite-difference gradients of every output.
//!
//! Invariants & assumptions
//! ------------------------
//! - A FORM/PMA failure at any trial design aborts the run with that error.
//! - The cost of an output-based [`CostFn`] is evaluated with random
//!   variables at their medians.
//!
//! Conventions
//! -----------
//! - Design vectors are `Array1<f64>` in deterministic declaration order;
//!   outcomes also carry them keyed by name.
//! - Progress is logged through `tracing`: `info` at the start and end of
//!   each run, `debug` per outer iteration from the solver.
pub mod bounds;
pub mod deterministic;
pub mod errors;
pub(crate) mod problem;
pub mod solve;

pub use self::bounds::DesignBounds;
pub use self::deterministic::{
    eval_grad_fd, eval_min, eval_nls, DeterministicOutcome, FitData, NlsOutcome, OutputGradient,
};
pub use self::errors::{RbdoError, RbdoResult};
pub use self::solve::{
    rbdo_solve, ConstraintReport, CostFn, RbdoOptions, RbdoOutcome, ReliabilityConstraint,
};

pub mod prelude {
    pub use super::{
        eval_grad_fd, eval_min, eval_nls, rbdo_solve, CostFn, DesignBounds, FitData, RbdoError,
        RbdoOptions, RbdoOutcome, RbdoResult, ReliabilityConstraint,
    };
}
