//! numerical_stability — numerically robust transforms for bounded search.
//!
//! Purpose
//! -------
//! Collect numerically stable scalar transforms and the [`BoxTransform`]
//! reparameterization that lets an unconstrained quasi-Newton solver search
//! over a box of design variables.
//!
//! Key behaviors
//! -------------
//! - Stable scalar maps (`safe_softplus`, `safe_softplus_inv`,
//!   `safe_logistic`, `safe_logit`) that never overflow for finite input.
//! - [`BoxTransform`] maps ℝⁿ onto `[lower, upper]` coordinate-wise and
//!   exposes the diagonal chain-rule factor for gradients.
//!
//! Invariants & assumptions
//! ------------------------
//! - Bounds are validated on construction; afterwards every map is total on
//!   finite input.
//! - This module never logs or touches global state.

pub mod transformations;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::transformations::{
    safe_logistic, safe_logit, safe_softplus, safe_softplus_inv, BoxTransform, LOGIT_EPS,
};
