//! Problem trait, options and outcome for bound- and
//! inequality/equality-constrained minimization.
//!
//! Sign convention: inequality constraints are satisfied when `c_i(x) ≥ 0`,
//! equality constraints when `h_j(x) = 0`.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        finite_diff::{fd_gradient, fd_jacobian},
        traits::{LineSearcher, MinimizeOptions, Tolerances},
        types::{Grad, Jacobian, Point},
    },
};
use ndarray::Array1;

/// A smooth constrained minimization problem.
///
/// Required: the dimension, the number of inequality constraints, the cost
/// and the inequality values. Everything else has a default: no equality
/// constraints, and central finite-difference derivatives (forward near
/// points where the functions are undefined).
pub trait ConstrainedProblem {
    fn dim(&self) -> usize;
    fn n_ineq(&self) -> usize;
    fn n_eq(&self) -> usize {
        0
    }

    fn cost(&self, x: &Point) -> OptResult<f64>;
    fn ineq(&self, x: &Point) -> OptResult<Vec<f64>>;
    fn eq(&self, _x: &Point) -> OptResult<Vec<f64>> {
        Ok(Vec::new())
    }

    fn cost_grad(&self, x: &Point) -> OptResult<Grad> {
        fd_gradient(x, &|p: &Point| self.cost(p))
    }

    /// `n_ineq × dim`; row `i` is `∇c_i(x)`.
    fn ineq_jacobian(&self, x: &Point) -> OptResult<Jacobian> {
        fd_jacobian(x, self.n_ineq(), &|p: &Point| self.ineq(p))
    }

    /// `n_eq × dim`; row `j` is `∇h_j(x)`.
    fn eq_jacobian(&self, x: &Point) -> OptResult<Jacobian> {
        fd_jacobian(x, self.n_eq(), &|p: &Point| self.eq(p))
    }
}

/// Outer-loop settings for the augmented-Lagrangian solver.
///
/// - `inner`: options for each L-BFGS subproblem solve.
/// - `tol_feasibility`: largest accepted constraint/complementarity violation.
/// - `tol_step`: relative design change between outer iterations below which
///   a feasible iterate is accepted even if the inner solve stopped early.
/// - `rho_init`, `rho_growth`, `rho_max`: penalty schedule.
/// - `max_outer`: cap on multiplier updates.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedOptions {
    pub inner: MinimizeOptions,
    pub tol_feasibility: f64,
    pub tol_step: f64,
    pub rho_init: f64,
    pub rho_growth: f64,
    pub rho_max: f64,
    pub max_outer: usize,
}

impl ConstrainedOptions {
    /// Build validated outer-loop options.
    ///
    /// # Errors
    /// - [`OptError::InvalidTolFeasibility`] for a non-finite or non-positive
    ///   `tol_feasibility` or `tol_step`.
    /// - [`OptError::InvalidPenalty`] unless `0 < rho_init ≤ rho_max` and
    ///   `rho_growth > 1`, all finite.
    /// - [`OptError::InvalidMaxIter`] if `max_outer == 0`.
    pub fn new(
        inner: MinimizeOptions, tol_feasibility: f64, tol_step: f64, rho_init: f64,
        rho_growth: f64, rho_max: f64, max_outer: usize,
    ) -> OptResult<Self> {
        for tol in [tol_feasibility, tol_step] {
            if !tol.is_finite() || tol <= 0.0 {
                return Err(OptError::InvalidTolFeasibility {
                    tol,
                    reason: "Tolerance must be finite and positive.",
                });
            }
        }
        if !rho_init.is_finite() || rho_init <= 0.0 {
            return Err(OptError::InvalidPenalty {
                value: rho_init,
                reason: "Initial penalty must be finite and positive.",
            });
        }
        if !rho_growth.is_finite() || rho_growth <= 1.0 {
            return Err(OptError::InvalidPenalty {
                value: rho_growth,
                reason: "Penalty growth factor must exceed one.",
            });
        }
        if !rho_max.is_finite() || rho_max < rho_init {
            return Err(OptError::InvalidPenalty {
                value: rho_max,
                reason: "Penalty cap must be finite and at least the initial penalty.",
            });
        }
        if max_outer == 0 {
            return Err(OptError::InvalidMaxIter {
                max_iter: max_outer,
                reason: "Outer iteration cap must be greater than zero.",
            });
        }
        Ok(Self { inner, tol_feasibility, tol_step, rho_init, rho_growth, rho_max, max_outer })
    }
}

impl Default for ConstrainedOptions {
    fn default() -> Self {
        Self {
            inner: MinimizeOptions {
                tols: Tolerances { tol_grad: Some(1e-7), tol_cost: Some(1e-12), max_iter: Some(200) },
                line_searcher: LineSearcher::MoreThuente,
                verbose: false,
                lbfgs_mem: None,
            },
            tol_feasibility: 1e-6,
            tol_step: 1e-6,
            rho_init: 10.0,
            rho_growth: 10.0,
            rho_max: 1e8,
            max_outer: 50,
        }
    }
}

/// How the outer loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstrainedStatus {
    /// Feasible within tolerance and stationary.
    Converged,
    /// `max_outer` reached without meeting the convergence test.
    MaxOuterIterations,
    /// Penalty at its cap and the violation stopped decreasing.
    Stalled,
}

/// Result of [`minimize_constrained`](super::minimize_constrained).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstrainedOutcome {
    pub x: Point,
    pub cost: f64,
    pub ineq: Array1<f64>,
    pub eq: Array1<f64>,
    pub ineq_multipliers: Array1<f64>,
    pub eq_multipliers: Array1<f64>,
    /// `max(max_i max(0, −c_i), max_j |h_j|)` at `x`.
    pub max_violation: f64,
    pub status: ConstrainedStatus,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
}

impl ConstrainedOutcome {
    pub fn converged(&self) -> bool {
        self.status == ConstrainedStatus::Converged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // Inconsistent penalty schedules and tolerances are rejected.
    fn constrained_options_validate_schedule() {
        let inner = MinimizeOptions::default();
        assert!(ConstrainedOptions::new(inner.clone(), 1e-6, 1e-6, 10.0, 10.0, 1e8, 50).is_ok());
        assert!(matches!(
            ConstrainedOptions::new(inner.clone(), 0.0, 1e-6, 10.0, 10.0, 1e8, 50),
            Err(OptError::InvalidTolFeasibility { .. })
        ));
        assert!(matches!(
            ConstrainedOptions::new(inner.clone(), 1e-6, 1e-6, 10.0, 1.0, 1e8, 50),
            Err(OptError::InvalidPenalty { value, .. }) if value == 1.0
        ));
        assert!(matches!(
            ConstrainedOptions::new(inner.clone(), 1e-6, 1e-6, 10.0, 10.0, 1.0, 50),
            Err(OptError::InvalidPenalty { .. })
        ));
        assert!(matches!(
            ConstrainedOptions::new(inner, 1e-6, 1e-6, 10.0, 10.0, 1e8, 0),
            Err(OptError::InvalidMaxIter { .. })
        ));
    }
}
