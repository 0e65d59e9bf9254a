//! Constrained problems handed to the augmented-Lagrangian solver.
//!
//! - [`RbdoProblem`]: cost at the random median, inequality constraints
//!   `g*_i(d) ≥ 0` from FORM/PMA, and envelope-theorem Jacobians.
//! - [`DeterministicProblem`]: model outputs as cost and constraints, no
//!   random variables.
//!
//! Both report evaluation failures to the solver as
//! `OptError::ConstraintEvaluation` and keep the first underlying error in a
//! [`FirstFailure`] slot so the driver can surface it unchanged.
use crate::{
    model::model::{Model, OutputSelection},
    optimization::{
        constrained::ConstrainedProblem,
        errors::{OptError, OptResult},
        minimizer::{fd_gradient, Grad, Jacobian, Point},
    },
    rbdo::{
        errors::{RbdoError, RbdoResult},
        solve::{CostFn, ReliabilityConstraint},
    },
    reliability::{form_pma, form_pma_from, FormOptions, FormOutcome},
};
use ndarray::{Array1, Array2, ArrayView1};
use std::cell::{Cell, RefCell};

/// First error raised while the solver was evaluating a problem.
#[derive(Debug, Default)]
pub(crate) struct FirstFailure(RefCell<Option<RbdoError>>);

impl FirstFailure {
    /// Pass `Ok` through; record the first `Err` and hand the solver an
    /// `OptError` in its place.
    pub(crate) fn capture<T>(&self, result: RbdoResult<T>, index: usize) -> OptResult<T> {
        result.map_err(|err| {
            let text = err.to_string();
            let mut slot = self.0.borrow_mut();
            if slot.is_none() {
                *slot = Some(err);
            }
            OptError::ConstraintEvaluation { index, text }
        })
    }

    pub(crate) fn take(&self) -> Option<RbdoError> {
        self.0.borrow_mut().take()
    }
}

pub(crate) struct RbdoProblem<'a> {
    model: &'a Model,
    cost: &'a CostFn,
    constraints: &'a [ReliabilityConstraint],
    form: &'a FormOptions,
    rand_median: Array1<f64>,
    last: RefCell<Option<(Point, Vec<FormOutcome>)>>,
    warm: RefCell<Vec<Option<Array1<f64>>>>,
    form_solves: Cell<usize>,
    pub(crate) failure: FirstFailure,
}

impl<'a> RbdoProblem<'a> {
    pub(crate) fn new(
        model: &'a Model, cost: &'a CostFn, constraints: &'a [ReliabilityConstraint],
        form: &'a FormOptions,
    ) -> RbdoResult<Self> {
        Ok(Self {
            model,
            cost,
            constraints,
            form,
            rand_median: model.rand_median()?,
            last: RefCell::new(None),
            warm: RefCell::new(vec![None; constraints.len()]),
            form_solves: Cell::new(0),
            failure: FirstFailure::default(),
        })
    }

    pub(crate) fn form_solves(&self) -> usize {
        self.form_solves.get()
    }

    pub(crate) fn cost_at(&self, d: &Point) -> RbdoResult<f64> {
        self.cost.evaluate(self.model, d, &self.rand_median)
    }

    /// FORM/PMA outcomes of every constraint at `d`, warm-started from the
    /// previous design points. The last design is cached.
    pub(crate) fn outcomes(&self, d: &Point) -> RbdoResult<Vec<FormOutcome>> {
        if let Some((x, outcomes)) = self.last.borrow().as_ref() {
            if x == d {
                return Ok(outcomes.clone());
            }
        }
        let mut outcomes = Vec::with_capacity(self.constraints.len());
        for (i, c) in self.constraints.iter().enumerate() {
            let warm = self.warm.borrow()[i].clone();
            let outcome = match warm {
                Some(z) => form_pma_from(self.model, &c.limit_state, d, c.target, self.form, &z),
                None => form_pma(self.model, &c.limit_state, d, c.target, self.form),
            }?;
            self.warm.borrow_mut()[i] = Some(outcome.design_point.clone());
            outcomes.push(outcome);
        }
        self.form_solves.set(self.form_solves.get() + self.constraints.len());
        *self.last.borrow_mut() = Some((d.clone(), outcomes.clone()));
        Ok(outcomes)
    }
}

impl ConstrainedProblem for RbdoProblem<'_> {
    fn dim(&self) -> usize {
        self.model.n_det()
    }

    fn n_ineq(&self) -> usize {
        self.constraints.len()
    }

    fn cost(&self, x: &Point) -> OptResult<f64> {
        self.failure.capture(self.cost_at(x), 0)
    }

    fn ineq(&self, x: &Point) -> OptResult<Vec<f64>> {
        let outcomes = self.failure.capture(self.outcomes(x), 0)?;
        Ok(outcomes.iter().map(|o| o.g_star).collect())
    }

    /// Envelope identity for PMA: `∂g*/∂d = ∂g/∂d` at the fixed design
    /// point `x*(d)`.
    fn ineq_jacobian(&self, x: &Point) -> OptResult<Jacobian> {
        let outcomes = self.failure.capture(self.outcomes(x), 0)?;
        let mut jac = Jacobian::zeros((self.constraints.len(), x.len()));
        for (i, (c, outcome)) in self.constraints.iter().zip(&outcomes).enumerate() {
            let g_at = |p: &Point| -> OptResult<f64> {
                let g = self
                    .model
                    .evaluate_output(&c.limit_state, p, &outcome.physical_point)
                    .map_err(RbdoError::from);
                self.failure.capture(g, i)
            };
            let row: Grad = fd_gradient(x, &g_at)?;
            jac.row_mut(i).assign(&row);
        }
        Ok(jac)
    }
}

/// Deterministic outputs of a model as cost and constraints.
pub(crate) struct DeterministicProblem<'a> {
    model: &'a Model,
    minimize: &'a str,
    geq: &'a [&'a str],
    eq: &'a [&'a str],
    no_random: Array1<f64>,
    pub(crate) failure: FirstFailure,
}

impl<'a> DeterministicProblem<'a> {
    pub(crate) fn new(
        model: &'a Model, minimize: &'a str, geq: &'a [&'a str], eq: &'a [&'a str],
    ) -> Self {
        Self { model, minimize, geq, eq, no_random: Array1::zeros(0), failure: FirstFailure::default() }
    }

    fn outputs(&self, x: &Point, names: &[&str]) -> RbdoResult<Vec<f64>> {
        let all = self.model.evaluate(x, &self.no_random)?;
        Ok(names.iter().map(|n| all.get(*n).copied().unwrap_or(f64::NAN)).collect())
    }
}

impl ConstrainedProblem for DeterministicProblem<'_> {
    fn dim(&self) -> usize {
        self.model.n_det()
    }

    fn n_ineq(&self) -> usize {
        self.geq.len()
    }

    fn n_eq(&self) -> usize {
        self.eq.len()
    }

    fn cost(&self, x: &Point) -> OptResult<f64> {
        let value = self.model.evaluate_output(self.minimize, x, &self.no_random);
        self.failure.capture(value.map_err(RbdoError::from), 0)
    }

    fn ineq(&self, x: &Point) -> OptResult<Vec<f64>> {
        self.failure.capture(self.outputs(x, self.geq), 0)
    }

    fn eq(&self, x: &Point) -> OptResult<Vec<f64>> {
        self.failure.capture(self.outputs(x, self.eq), 0)
    }
}

/// Where one model variable takes its value while fitting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Source {
    /// Column of the data matrix.
    Column(usize),
    Fixed(f64),
    /// Coordinate of the fitted vector.
    Fitted(usize),
}

impl Source {
    fn value(self, row: ArrayView1<f64>, theta: &Point) -> f64 {
        match self {
            Source::Column(c) => row[c],
            Source::Fixed(v) => v,
            Source::Fitted(k) => theta[k],
        }
    }
}

/// Mean squared error of selected outputs against data columns, as a
/// function of the fitted variables. No general constraints; the box comes
/// from the caller.
pub(crate) struct NlsProblem<'a> {
    model: &'a Model,
    data: &'a Array2<f64>,
    det: Vec<Source>,
    rand: Vec<Source>,
    selection: OutputSelection,
    /// Data column of each selected output, in selection order.
    targets: Vec<usize>,
    n_fit: usize,
    pub(crate) failure: FirstFailure,
}

impl<'a> NlsProblem<'a> {
    pub(crate) fn new(
        model: &'a Model, data: &'a Array2<f64>, det: Vec<Source>, rand: Vec<Source>,
        selection: OutputSelection, targets: Vec<usize>,
    ) -> Self {
        let n_fit =
            det.iter().chain(&rand).filter(|s| matches!(s, Source::Fitted(_))).count();
        Self { model, data, det, rand, selection, targets, n_fit, failure: FirstFailure::default() }
    }

    pub(crate) fn mse(&self, theta: &Point) -> RbdoResult<f64> {
        let mut sum = 0.0;
        for row in self.data.rows() {
            let det: Array1<f64> = self.det.iter().map(|s| s.value(row, theta)).collect();
            let rand: Array1<f64> = self.rand.iter().map(|s| s.value(row, theta)).collect();
            let values = self.model.evaluate_selection(&self.selection, &det, &rand)?;
            sum += values.iter().zip(&self.targets).map(|(v, &c)| (v - row[c]).powi(2)).sum::<f64>();
        }
        Ok(sum / (self.data.nrows() * self.targets.len()) as f64)
    }
}

impl ConstrainedProblem for NlsProblem<'_> {
    fn dim(&self) -> usize {
        self.n_fit
    }

    fn n_ineq(&self) -> usize {
        0
    }

    fn cost(&self, x: &Point) -> OptResult<f64> {
        self.failure.capture(self.mse(x), 0)
    }

    fn ineq(&self, _x: &Point) -> OptResult<Vec<f64>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scope
    // -----
    // The first-error slot shared by every problem in this module.

    #[test]
    // Purpose
    // -------
    // The slot keeps the first error of a run even after later evaluations
    // succeed or fail differently, and empties once taken.
    //
    // Given
    // -----
    // - An error, a success, then a second error, captured in that order.
    //
    // Expect
    // ------
    // - Each error reaches the solver as `ConstraintEvaluation` with its
    //   index; `take` yields the first error once, then `None`.
    fn first_failure_keeps_the_earliest_error() {
        // Arrange
        let slot = FirstFailure::default();
        let first = RbdoError::RandomVariablesPresent { count: 1 };
        let second = RbdoError::RandomVariablesPresent { count: 2 };

        // Act
        let a = slot.capture::<f64>(Err(first.clone()), 3);
        let b = slot.capture(Ok(1.5), 0);
        let c = slot.capture::<f64>(Err(second), 4);

        // Assert
        assert!(matches!(a, Err(OptError::ConstraintEvaluation { index: 3, .. })));
        assert_eq!(b, Ok(1.5));
        assert!(matches!(c, Err(OptError::ConstraintEvaluation { index: 4, .. })));
        assert_eq!(slot.take(), Some(first));
        assert_eq!(slot.take(), None);
    }
}
