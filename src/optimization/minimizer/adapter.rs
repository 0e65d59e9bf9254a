//! Adapter that exposes a user `Objective` as an `argmin` problem.
//!
//! The cost handed to `argmin` is the objective itself. Analytic gradients
//! are validated and passed through; missing gradients fall back to
//! [`fd_gradient`].
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        finite_diff::fd_gradient,
        traits::Objective,
        types::{Cost, Grad, Point},
        validation::validate_grad,
    },
};
use argmin::core::{CostFunction, Error, Gradient};

/// Bridges a user `Objective` to `argmin`'s `CostFunction` and `Gradient`.
#[derive(Debug, Clone)]
pub struct ArgMinAdapter<'a, F: Objective> {
    pub f: &'a F,
}

impl<'a, F: Objective> ArgMinAdapter<'a, F> {
    pub fn new(f: &'a F) -> Self {
        Self { f }
    }

    fn finite_cost(&self, x: &Point) -> OptResult<Cost> {
        let output = self.f.value(x)?;
        if !output.is_finite() {
            return Err(OptError::NonFiniteCost { value: output });
        }
        Ok(output)
    }
}

impl<'a, F: Objective> CostFunction for ArgMinAdapter<'a, F> {
    type Param = Point;
    type Output = Cost;

    /// Evaluate `f(x)`.
    ///
    /// # Errors
    /// Propagates any `OptError` from the user's `value`, and returns
    /// `NonFiniteCost` if the value is not finite.
    fn cost(&self, x: &Self::Param) -> Result<Self::Output, Error> {
        Ok(self.finite_cost(x)?)
    }
}

impl<'a, F: Objective> Gradient for ArgMinAdapter<'a, F> {
    type Param = Point;
    type Gradient = Grad;

    /// Evaluate `∇f(x)`.
    ///
    /// Behavior:
    /// - If the user implements `grad`, the result is validated and returned.
    /// - On `GradientNotImplemented`, a finite-difference gradient of the
    ///   cost is computed (central first, forward as fallback).
    ///
    /// # Errors
    /// - Propagates user errors from `grad` other than `GradientNotImplemented`.
    /// - Propagates cost evaluation errors raised during finite differencing.
    fn gradient(&self, x: &Self::Param) -> Result<Self::Gradient, Error> {
        match self.f.grad(x) {
            Ok(g) => {
                validate_grad(&g, x.len())?;
                Ok(g)
            }
            Err(OptError::GradientNotImplemented) => {
                let cost = |p: &Point| self.finite_cost(p);
                Ok(fd_gradient(x, &cost)?)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    struct Bowl;

    impl Objective for Bowl {
        fn value(&self, x: &Point) -> OptResult<f64> {
            Ok(x.dot(x))
        }
    }

    struct BadGrad;

    impl Objective for BadGrad {
        fn value(&self, _x: &Point) -> OptResult<f64> {
            Ok(0.0)
        }

        fn grad(&self, _x: &Point) -> OptResult<Grad> {
            Ok(array![f64::NAN])
        }
    }

    #[test]
    // Purpose
    // -------
    // Without an analytic gradient the adapter differentiates the cost.
    fn gradient_falls_back_to_finite_differences() {
        let f = Bowl;
        let adapter = ArgMinAdapter::new(&f);
        let g = adapter.gradient(&array![1.0, -2.0]).unwrap();
        assert_abs_diff_eq!(g[0], 2.0, epsilon = 1e-5);
        assert_abs_diff_eq!(g[1], -4.0, epsilon = 1e-5);
    }

    #[test]
    // Purpose
    // -------
    // Analytic gradients are validated; a NaN entry surfaces as
    // `InvalidGradient` after crossing the argmin error boundary.
    fn invalid_analytic_gradient_is_rejected() {
        let f = BadGrad;
        let adapter = ArgMinAdapter::new(&f);
        let err = adapter.gradient(&array![0.0]).unwrap_err();
        assert!(matches!(OptError::from(err), OptError::InvalidGradient { index: 0, .. }));
    }
}
