//! Reliability-based design optimization driver.
//!
//! `min cost(d)` over the design box subject to `g*_i(d) ≥ 0` for every
//! reliability constraint, where `g*_i` is the FORM/PMA performance measure
//! at the constraint's target β. The outer problem is solved by the
//! augmented-Lagrangian method in
//! [`constrained`](crate::optimization::constrained).
use crate::{
    model::model::Model,
    optimization::{
        constrained::{minimize_constrained, ConstrainedOptions, ConstrainedStatus},
        minimizer::Point,
    },
    rbdo::{
        bounds::DesignBounds,
        errors::{RbdoError, RbdoResult},
        problem::RbdoProblem,
    },
    reliability::{FormOptions, ReliabilityTarget},
};
use ndarray::Array1;
use std::{collections::BTreeMap, sync::Arc};
use tracing::info;

/// Objective of a design optimization.
#[derive(Clone)]
pub enum CostFn {
    /// A model output, evaluated with the random variables at their medians.
    Output(String),
    /// A function of the design vector alone.
    Custom(Arc<dyn Fn(&Array1<f64>) -> f64 + Send + Sync>),
}

impl CostFn {
    pub fn output(name: &str) -> Self {
        CostFn::Output(name.to_string())
    }

    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&Array1<f64>) -> f64 + Send + Sync + 'static,
    {
        CostFn::Custom(Arc::new(f))
    }

    pub(crate) fn evaluate(
        &self, model: &Model, det: &Array1<f64>, rand: &Array1<f64>,
    ) -> RbdoResult<f64> {
        match self {
            CostFn::Output(name) => Ok(model.evaluate_output(name, det, rand)?),
            CostFn::Custom(f) => Ok(f(det)),
        }
    }
}

impl std::fmt::Debug for CostFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostFn::Output(name) => f.debug_tuple("Output").field(name).finish(),
            CostFn::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// `g*(d) ≥ 0` for one limit state at one reliability target.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliabilityConstraint {
    pub limit_state: String,
    pub target: ReliabilityTarget,
}

impl ReliabilityConstraint {
    pub fn new(limit_state: &str, target: ReliabilityTarget) -> Self {
        Self { limit_state: limit_state.to_string(), target }
    }

    /// Shorthand for a β target.
    ///
    /// # Errors
    /// [`RbdoError::Reliability`] for a non-positive or non-finite β.
    pub fn from_beta(limit_state: &str, beta: f64) -> RbdoResult<Self> {
        Ok(Self::new(limit_state, ReliabilityTarget::from_beta(beta)?))
    }
}

/// Options of [`rbdo_solve`].
///
/// The default turns off the alternate-start check of FORM/PMA: every outer
/// evaluation is warm-started from the previous design point, and the check
/// would double the cost of each solve.
#[derive(Debug, Clone, PartialEq)]
pub struct RbdoOptions {
    pub constrained: ConstrainedOptions,
    pub form: FormOptions,
}

impl Default for RbdoOptions {
    fn default() -> Self {
        Self {
            constrained: ConstrainedOptions::default(),
            form: FormOptions { check_alternate_start: false, ..FormOptions::default() },
        }
    }
}

/// State of one reliability constraint at the returned design.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintReport {
    pub limit_state: String,
    pub beta: f64,
    pub g_star: f64,
    /// Multiplier of the constraint at the last outer iteration.
    pub multiplier: f64,
    pub design_point: Array1<f64>,
    pub physical_point: Array1<f64>,
    pub start_sensitive: bool,
}

impl ConstraintReport {
    pub fn satisfied(&self) -> bool {
        self.g_star >= 0.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RbdoOutcome {
    pub design: Array1<f64>,
    pub named_design: BTreeMap<String, f64>,
    pub cost: f64,
    pub constraints: Vec<ConstraintReport>,
    pub status: ConstrainedStatus,
    /// Largest constraint violation `max(0, −g*_i)` at the design.
    pub max_violation: f64,
    pub outer_iterations: usize,
    pub inner_iterations: usize,
    /// FORM/PMA solves run, summed over constraints.
    pub form_solves: usize,
}

impl RbdoOutcome {
    pub fn converged(&self) -> bool {
        self.status == ConstrainedStatus::Converged
    }

    /// Turn a non-converged outcome into an error.
    ///
    /// # Errors
    /// [`RbdoError::NotConverged`] unless the status is `Converged`.
    pub fn require_converged(self) -> RbdoResult<Self> {
        if self.converged() {
            Ok(self)
        } else {
            Err(RbdoError::NotConverged {
                status: self.status,
                max_violation: self.max_violation,
                outer_iterations: self.outer_iterations,
            })
        }
    }
}

/// rbdo_solve — cheapest design whose reliability constraints hold.
///
/// Parameters
/// ----------
/// - `model`: probabilistic model; its deterministic variables are the design.
/// - `cost`: objective, see [`CostFn`].
/// - `constraints`: one `g*_i(d) ≥ 0` per entry. May be empty.
/// - `bounds`: design box; `x0` must lie inside it.
/// - `options`: outer solver and FORM/PMA settings.
///
/// Returns
/// -------
/// The last design of the outer loop with its cost, constraint reports and
/// status. A run that stops on its iteration cap is returned with that status;
/// use [`RbdoOutcome::require_converged`] to treat it as an error.
///
/// Errors
/// ------
/// - [`RbdoError::DimensionMismatch`] / [`RbdoError::InitialGuessOutOfBounds`]
///   before any evaluation.
/// - [`RbdoError::Model`] for unknown outputs in `cost` or `constraints`.
/// - [`RbdoError::Reliability`] if FORM/PMA fails at any trial design.
/// - [`RbdoError::Optimization`] for solver failures not caused by an
///   evaluation.
///
/// The first evaluation error of the run is the one returned, even when it
/// came from a finite-difference step or a line-search trial that the
/// minimizer stepped back from and would otherwise have recovered. A model
/// that is undefined on part of the design box can therefore abort a run
/// whose iterates never leave the defined region; narrow `bounds` to the
/// defined region in that case.
pub fn rbdo_solve(
    model: &Model, cost: &CostFn, constraints: &[ReliabilityConstraint], bounds: &DesignBounds,
    x0: &Array1<f64>, options: &RbdoOptions,
) -> RbdoResult<RbdoOutcome> {
    if bounds.lower().len() != model.n_det() {
        return Err(RbdoError::DimensionMismatch {
            what: "design bounds",
            expected: model.n_det(),
            found: bounds.lower().len(),
        });
    }
    bounds.check_guess(x0)?;
    if let CostFn::Output(name) = cost {
        model.output_index(name)?;
    }
    for c in constraints {
        model.output_index(&c.limit_state)?;
    }

    info!(
        model = model.name(),
        constraints = constraints.len(),
        x0 = ?x0.to_vec(),
        "starting reliability-based design optimization"
    );
    let problem = RbdoProblem::new(model, cost, constraints, &options.form)?;
    let result =
        minimize_constrained(&problem, x0, bounds.lower(), bounds.upper(), &options.constrained);
    if let Some(err) = problem.failure.take() {
        return Err(err);
    }
    let out = result?;

    let design: Point = out.x;
    let outcomes = problem.outcomes(&design)?;
    let reports: Vec<ConstraintReport> = outcomes
        .into_iter()
        .zip(out.ineq_multipliers.iter())
        .map(|(o, &multiplier)| ConstraintReport {
            limit_state: o.limit_state,
            beta: o.beta,
            g_star: o.g_star,
            multiplier,
            design_point: o.design_point,
            physical_point: o.physical_point,
            start_sensitive: o.start_sensitive,
        })
        .collect();

    info!(
        status = ?out.status,
        cost = out.cost,
        max_violation = out.max_violation,
        outer_iterations = out.outer_iterations,
        form_solves = problem.form_solves(),
        "reliability-based design optimization finished"
    );
    Ok(RbdoOutcome {
        named_design: bounds.name_design(&design),
        design,
        cost: out.cost,
        constraints: reports,
        status: out.status,
        max_violation: out.max_violation,
        outer_iterations: out.outer_iterations,
        inner_iterations: out.inner_iterations,
        form_solves: problem.form_solves(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        model::{builder::ModelBuilder, marginals::Marginal, variables::Sensitivity},
        reliability::ReliabilityError,
    };
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // Scope
    // -----
    // A linear limit state whose RBDO optimum is known in closed form, the
    // abort path when FORM/PMA fails, and setup errors.

    /// g = a + b − 5 + x with x ~ N(0, 1); g* = a + b − 5 − β.
    fn linear_model() -> Model {
        ModelBuilder::new("linear")
            .deterministic("a", 0.0, 10.0)
            .unwrap()
            .deterministic("b", 0.0, 10.0)
            .unwrap()
            .random("x", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .function("g", &["a", "b", "x"], &["g"], |v| vec![v[0] + v[1] - 5.0 + v[2]])
            .unwrap()
            .function("broken", &["a", "x"], &["never"], |_| vec![f64::NAN])
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The solver finds the closed-form optimum of a quadratic cost under an
    // active linear reliability constraint.
    //
    // Given
    // -----
    // - min a² + b² s.t. g*(a, b) ≥ 0 at β = 2, start (5, 1).
    //
    // Expect
    // ------
    // - a = b = 3.5, cost 24.5, g* ≈ 0 and a positive multiplier.
    fn linear_rbdo_reaches_closed_form_optimum() {
        // Arrange
        let model = linear_model();
        let cost = CostFn::custom(|d| d[0] * d[0] + d[1] * d[1]);
        let constraints = [ReliabilityConstraint::from_beta("g", 2.0).unwrap()];
        let bounds = DesignBounds::from_model(&model);

        // Act
        let out = rbdo_solve(
            &model,
            &cost,
            &constraints,
            &bounds,
            &array![5.0, 1.0],
            &RbdoOptions::default(),
        )
        .unwrap();

        // Assert
        assert!(out.converged());
        assert_abs_diff_eq!(out.design[0], 3.5, epsilon = 1e-3);
        assert_abs_diff_eq!(out.design[1], 3.5, epsilon = 1e-3);
        assert_abs_diff_eq!(out.cost, 24.5, epsilon = 1e-2);
        assert_abs_diff_eq!(out.constraints[0].g_star, 0.0, epsilon = 1e-4);
        assert!(out.constraints[0].multiplier > 0.0);
        assert_eq!(out.named_design["a"], out.design[0]);
        assert!(out.form_solves >= 1);
    }

    #[test]
    // Purpose
    // -------
    // A limit state that is undefined everywhere aborts the run with the
    // reliability error instead of reading as a satisfied constraint.
    fn failing_form_solve_aborts_the_run() {
        let model = linear_model();
        let constraints = [ReliabilityConstraint::from_beta("never", 2.0).unwrap()];
        let res = rbdo_solve(
            &model,
            &CostFn::custom(|d| d.sum()),
            &constraints,
            &DesignBounds::from_model(&model),
            &array![5.0, 5.0],
            &RbdoOptions::default(),
        );
        assert!(matches!(
            res,
            Err(RbdoError::Reliability(ReliabilityError::UndefinedStart { .. }))
        ));
    }

    #[test]
    // Purpose
    // -------
    // Guesses outside the box, unknown outputs and wrong lengths fail before
    // the first evaluation.
    fn setup_errors_precede_evaluation() {
        let model = linear_model();
        let bounds = DesignBounds::from_model(&model);
        let constraints = [ReliabilityConstraint::from_beta("g", 2.0).unwrap()];
        let opts = RbdoOptions::default();
        let cost = CostFn::output("g");

        assert!(matches!(
            rbdo_solve(&model, &cost, &constraints, &bounds, &array![11.0, 1.0], &opts),
            Err(RbdoError::InitialGuessOutOfBounds { .. })
        ));
        assert!(matches!(
            rbdo_solve(&model, &cost, &constraints, &bounds, &array![1.0], &opts),
            Err(RbdoError::DimensionMismatch { .. })
        ));
        assert!(matches!(
            rbdo_solve(&model, &CostFn::output("zz"), &constraints, &bounds, &array![1.0, 1.0], &opts),
            Err(RbdoError::Model(_))
        ));
        assert!(matches!(
            ReliabilityConstraint::from_beta("g", -1.0),
            Err(RbdoError::Reliability(ReliabilityError::InvalidBeta { .. }))
        ));
    }

    #[test]
    // Purpose
    // -------
    // A run cut short by its outer cap reports the status, and
    // `require_converged` turns it into an error.
    fn capped_run_reports_status() {
        let model = linear_model();
        let mut opts = RbdoOptions::default();
        opts.constrained.max_outer = 1;
        let out = rbdo_solve(
            &model,
            &CostFn::custom(|d| d[0] * d[0] + d[1] * d[1]),
            &[ReliabilityConstraint::from_beta("g", 2.0).unwrap()],
            &DesignBounds::from_model(&model),
            &array![5.0, 1.0],
            &opts,
        )
        .unwrap();
        if !out.converged() {
            assert!(matches!(out.require_converged(), Err(RbdoError::NotConverged { .. })));
        }
    }
}
