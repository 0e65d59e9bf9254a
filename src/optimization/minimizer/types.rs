//! minimizer::types — shared numeric aliases and solver wiring.
//!
//! Purpose
//! -------
//! Centralize the core numeric types and solver aliases used by the
//! minimizer. By defining these in one place, the rest of the optimization
//! code can stay agnostic to `ndarray` and Argmin generics and can more
//! easily evolve if the backend changes.
//!
//! Key behaviors
//! -------------
//! - Define canonical aliases for decision vectors, gradients, and scalar
//!   costs (`Point`, `Grad`, `Cost`).
//! - Provide a standard map type for Argmin function-evaluation counters
//!   (`FnEvalMap`).
//! - Expose pre-wired L-BFGS solver aliases for the two supported line
//!   searches, using the common `(Point, Grad, Cost)` numeric shapes.
//!
//! Conventions
//! -----------
//! - `Point` and `Grad` are column vectors whose length equals the number of
//!   free (unconstrained) coordinates seen by the solver.
//! - `DEFAULT_LBFGS_MEM` encodes the typical history size for L-BFGS;
//!   callers may override this via per-run options.
use argmin::solver::{
    linesearch::{HagerZhangLineSearch, MoreThuenteLineSearch},
    quasinewton::LBFGS,
};
use ndarray::{Array1, Array2};
use std::collections::HashMap;

/// Decision vector handed to the solver.
pub type Point = Array1<f64>;

/// Gradient vector `∇f(x)`, matching the shape of `Point`.
pub type Grad = Array1<f64>;

/// Dense Jacobian; one row per function, one column per coordinate.
pub type Jacobian = Array2<f64>;

/// Scalar objective value minimized by the solver.
pub type Cost = f64;

/// Function-evaluation counters as reported by the solver.
///
/// Maps human-readable counter names (e.g., `"cost_count"`) to counts.
pub type FnEvalMap = HashMap<String, u64>;

/// Default history size (`m`) for L-BFGS runs.
pub const DEFAULT_LBFGS_MEM: usize = 7;

/// Hager–Zhang line search specialized to this crate’s numeric types.
pub type HagerZhangLS = HagerZhangLineSearch<Point, Grad, Cost>;

/// More–Thuente line search specialized to this crate’s numeric types.
pub type MoreThuenteLS = MoreThuenteLineSearch<Point, Grad, Cost>;

/// L-BFGS solver wired to the Hager–Zhang line search.
pub type LbfgsHagerZhang = LBFGS<HagerZhangLS, Point, Grad, Cost>;

/// L-BFGS solver wired to the More–Thuente line search.
pub type LbfgsMoreThuente = LBFGS<MoreThuenteLS, Point, Grad, Cost>;
