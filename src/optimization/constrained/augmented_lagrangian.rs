//! Augmented-Lagrangian outer loop over box-transformed L-BFGS subproblems.
//!
//! Purpose
//! -------
//! Minimize `f(x)` subject to `lower ≤ x ≤ upper`, `c(x) ≥ 0` and
//! `h(x) = 0`. Bounds are removed by [`BoxTransform`]; the general
//! constraints enter through the (Powell–Hestenes–Rockafellar) augmented
//! Lagrangian
//!
//! ```text
//! L(x; λ, μ, ρ) = f(x)
//!     + Σ_i (1/2ρ)·[max(0, λ_i − ρ c_i(x))² − λ_i²]
//!     + Σ_j (−μ_j h_j(x) + ρ/2 · h_j(x)²)
//! ```
//!
//! which is minimized over the unconstrained coordinates with [`minimize`].
//!
//! Key behaviors
//! -------------
//! - Multipliers: `λ_i ← max(0, λ_i − ρ c_i)`, `μ_j ← μ_j − ρ h_j`.
//! - The penalty grows by `rho_growth` whenever the violation measure fails
//!   to shrink by a factor of four, up to `rho_max`.
//! - If an inner solve fails (line search breakdown, evaluation error), the
//!   best point evaluated during that solve is used instead; an error is
//!   only returned when no point could be evaluated at all.
//!
//! Invariants & assumptions
//! ------------------------
//! - The initial guess must lie inside the box; it may violate `c` and `h`.
//! - `cost`/`ineq`/`eq` are evaluated once per distinct point per
//!   subproblem; the last evaluation is cached because L-BFGS requests the
//!   value and gradient at the same point back to back.
use crate::optimization::{
    constrained::traits::{
        ConstrainedOptions, ConstrainedOutcome, ConstrainedProblem, ConstrainedStatus,
    },
    errors::{OptError, OptResult},
    minimizer::{
        api::minimize,
        traits::Objective,
        types::{Grad, Point},
    },
    numerical_stability::BoxTransform,
};
use ndarray::Array1;
use std::cell::RefCell;

#[derive(Debug, Clone)]
struct Evaluated {
    x: Point,
    cost: f64,
    ineq: Array1<f64>,
    eq: Array1<f64>,
}

fn evaluate<P: ConstrainedProblem>(problem: &P, x: &Point) -> OptResult<Evaluated> {
    let cost = problem.cost(x)?;
    if !cost.is_finite() {
        return Err(OptError::NonFiniteCost { value: cost });
    }
    let ineq = problem.ineq(x)?;
    if ineq.len() != problem.n_ineq() {
        return Err(OptError::DimensionMismatch {
            what: "inequality constraints",
            expected: problem.n_ineq(),
            found: ineq.len(),
        });
    }
    let eq = problem.eq(x)?;
    if eq.len() != problem.n_eq() {
        return Err(OptError::DimensionMismatch {
            what: "equality constraints",
            expected: problem.n_eq(),
            found: eq.len(),
        });
    }
    let values = ineq.iter().chain(eq.iter()).enumerate();
    for (index, &value) in values {
        if !value.is_finite() {
            return Err(OptError::ConstraintEvaluation {
                index,
                text: format!("non-finite constraint value {value}"),
            });
        }
    }
    Ok(Evaluated { x: x.clone(), cost, ineq: Array1::from(ineq), eq: Array1::from(eq) })
}

/// One augmented-Lagrangian subproblem in unconstrained coordinates.
struct Subproblem<'a, P: ConstrainedProblem> {
    problem: &'a P,
    transform: &'a BoxTransform,
    lambda: &'a Array1<f64>,
    mu: &'a Array1<f64>,
    rho: f64,
    last: RefCell<Option<Evaluated>>,
    best: RefCell<Option<(f64, Point)>>,
}

impl<'a, P: ConstrainedProblem> Subproblem<'a, P> {
    fn evaluated(&self, x: &Point) -> OptResult<Evaluated> {
        if let Some(hit) = self.last.borrow().as_ref().filter(|e| &e.x == x) {
            return Ok(hit.clone());
        }
        let fresh = evaluate(self.problem, x)?;
        *self.last.borrow_mut() = Some(fresh.clone());
        Ok(fresh)
    }

    fn lagrangian(&self, e: &Evaluated) -> f64 {
        let rho = self.rho;
        let ineq_term: f64 = e
            .ineq
            .iter()
            .zip(self.lambda.iter())
            .map(|(&c, &l)| ((l - rho * c).max(0.0).powi(2) - l * l) / (2.0 * rho))
            .sum();
        let eq_term: f64 =
            e.eq.iter().zip(self.mu.iter()).map(|(&h, &m)| -m * h + 0.5 * rho * h * h).sum();
        e.cost + ineq_term + eq_term
    }

    fn best_point(&self) -> Option<Point> {
        self.best.borrow().as_ref().map(|(_, u)| u.clone())
    }
}

impl<'a, P: ConstrainedProblem> Objective for Subproblem<'a, P> {
    fn value(&self, u: &Point) -> OptResult<f64> {
        let x = self.transform.to_bounded(u);
        let e = self.evaluated(&x)?;
        let value = self.lagrangian(&e);
        let mut best = self.best.borrow_mut();
        if value.is_finite() && best.as_ref().map_or(true, |(b, _)| value < *b) {
            *best = Some((value, u.clone()));
        }
        Ok(value)
    }

    fn grad(&self, u: &Point) -> OptResult<Grad> {
        let x = self.transform.to_bounded(u);
        let e = self.evaluated(&x)?;
        let mut gx = self.problem.cost_grad(&x)?;
        if self.problem.n_ineq() > 0 {
            let jac = self.problem.ineq_jacobian(&x)?;
            check_shape(&jac, self.problem.n_ineq(), x.len())?;
            let weights: Array1<f64> = e
                .ineq
                .iter()
                .zip(self.lambda.iter())
                .map(|(&c, &l)| -(l - self.rho * c).max(0.0))
                .collect();
            gx = gx + jac.t().dot(&weights);
        }
        if self.problem.n_eq() > 0 {
            let jac = self.problem.eq_jacobian(&x)?;
            check_shape(&jac, self.problem.n_eq(), x.len())?;
            let weights: Array1<f64> =
                e.eq.iter().zip(self.mu.iter()).map(|(&h, &m)| -m + self.rho * h).collect();
            gx = gx + jac.t().dot(&weights);
        }
        Ok(gx * self.transform.jacobian_diag(u))
    }
}

fn check_shape(jac: &ndarray::Array2<f64>, rows: usize, cols: usize) -> OptResult<()> {
    if jac.dim() != (rows, cols) {
        return Err(OptError::JacobianDimMismatch { expected: (rows, cols), found: jac.dim() });
    }
    Ok(())
}

fn max_violation(e: &Evaluated) -> f64 {
    let ineq = e.ineq.iter().map(|&c| (-c).max(0.0));
    let eq = e.eq.iter().map(|&h| h.abs());
    ineq.chain(eq).fold(0.0, f64::max)
}

/// Minimize a [`ConstrainedProblem`] over the box `[lower, upper]`.
///
/// Parameters
/// ----------
/// - `problem`: cost and constraints.
/// - `x0`: initial guess inside the box (constraints may be violated).
/// - `lower`, `upper`: per-coordinate bounds; infinite entries are allowed
///   and `lower == upper` fixes a coordinate.
/// - `opts`: outer-loop and inner-solver settings.
///
/// Returns
/// -------
/// A [`ConstrainedOutcome`] whose `status` distinguishes convergence from
/// running out of outer iterations or stalling at the penalty cap. Not
/// converging is a status, not an error.
///
/// Errors
/// ------
/// - [`OptError::DimensionMismatch`] if `x0` or the bounds do not match
///   `problem.dim()`.
/// - [`OptError::InfeasibleBounds`] / [`OptError::InitialGuessOutOfBounds`]
///   from the box validation.
/// - Evaluation errors at the initial guess, or from an inner solve that
///   failed before evaluating any point.
pub fn minimize_constrained<P: ConstrainedProblem>(
    problem: &P, x0: &Point, lower: &[f64], upper: &[f64], opts: &ConstrainedOptions,
) -> OptResult<ConstrainedOutcome> {
    let n = problem.dim();
    for (what, found) in [("initial guess", x0.len()), ("lower bounds", lower.len())] {
        if found != n {
            return Err(OptError::DimensionMismatch { what, expected: n, found });
        }
    }
    let transform = BoxTransform::new(lower, upper)?;
    let mut u = transform.to_unbounded(x0)?;
    let mut current = evaluate(problem, &transform.to_bounded(&u))?;

    let mut lambda = Array1::<f64>::zeros(problem.n_ineq());
    let mut mu = Array1::<f64>::zeros(problem.n_eq());
    let mut rho = opts.rho_init;
    let mut prev_measure = f64::INFINITY;
    let mut inner_iterations = 0;
    let mut status = ConstrainedStatus::MaxOuterIterations;
    let mut outer = 0;

    while outer < opts.max_outer {
        outer += 1;
        let sub = Subproblem {
            problem,
            transform: &transform,
            lambda: &lambda,
            mu: &mu,
            rho,
            last: RefCell::new(None),
            best: RefCell::new(None),
        };
        let (u_next, inner_converged) = match minimize(&sub, u.clone(), &opts.inner) {
            Ok(out) => {
                inner_iterations += out.iterations;
                (out.x_hat, out.converged)
            }
            Err(err) => match sub.best_point() {
                Some(best) => {
                    tracing::debug!(outer, error = %err, "inner solve failed; using best point seen");
                    (best, false)
                }
                None => return Err(err),
            },
        };
        drop(sub);

        let next = evaluate(problem, &transform.to_bounded(&u_next))?;
        let step = next
            .x
            .iter()
            .zip(current.x.iter())
            .map(|(a, b)| (a - b).abs() / (1.0 + b.abs()))
            .fold(0.0, f64::max);

        for (l, &c) in lambda.iter_mut().zip(next.ineq.iter()) {
            *l = (*l - rho * c).max(0.0);
        }
        for (m, &h) in mu.iter_mut().zip(next.eq.iter()) {
            *m -= rho * h;
        }
        let measure = next
            .ineq
            .iter()
            .zip(lambda.iter())
            .map(|(&c, &l)| c.min(l / rho).abs())
            .chain(next.eq.iter().map(|h| h.abs()))
            .fold(0.0, f64::max);

        tracing::debug!(
            outer,
            rho,
            cost = next.cost,
            violation = measure,
            step,
            inner_converged,
            "augmented Lagrangian iteration"
        );

        u = u_next;
        current = next;

        if measure <= opts.tol_feasibility && (inner_converged || step <= opts.tol_step) {
            status = ConstrainedStatus::Converged;
            break;
        }
        if measure > 0.25 * prev_measure {
            if rho >= opts.rho_max && step <= opts.tol_step {
                status = ConstrainedStatus::Stalled;
                break;
            }
            rho = (rho * opts.rho_growth).min(opts.rho_max);
        }
        prev_measure = measure;
    }

    let max_violation = max_violation(&current);
    Ok(ConstrainedOutcome {
        x: current.x,
        cost: current.cost,
        ineq: current.ineq,
        eq: current.eq,
        ineq_multipliers: lambda,
        eq_multipliers: mu,
        max_violation,
        status,
        outer_iterations: outer,
        inner_iterations,
    })
}
