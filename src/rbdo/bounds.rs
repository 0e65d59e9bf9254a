//! Design-variable boxes.
use crate::{
    model::model::Model,
    rbdo::errors::{RbdoError, RbdoResult},
};
use ndarray::Array1;

/// Box `[lower, upper]` over the deterministic variables of a model, in
/// declaration order.
#[derive(Debug, Clone, PartialEq)]
pub struct DesignBounds {
    names: Vec<String>,
    lower: Vec<f64>,
    upper: Vec<f64>,
}

impl DesignBounds {
    /// The bounds declared on the model.
    pub fn from_model(model: &Model) -> Self {
        let (lower, upper) = model.det_bounds();
        let names = model.deterministic_vars().iter().map(|d| d.name().to_string()).collect();
        Self { names, lower, upper }
    }

    /// Custom bounds, typically narrower than the model's.
    ///
    /// # Errors
    /// - [`RbdoError::DimensionMismatch`] if a vector length differs from the
    ///   number of deterministic variables.
    /// - [`RbdoError::InfeasibleBounds`] for `lower > upper` or a NaN entry.
    pub fn new(model: &Model, lower: Vec<f64>, upper: Vec<f64>) -> RbdoResult<Self> {
        let n = model.n_det();
        for (what, found) in [("lower bounds", lower.len()), ("upper bounds", upper.len())] {
            if found != n {
                return Err(RbdoError::DimensionMismatch { what, expected: n, found });
            }
        }
        let bounds = Self {
            names: model.deterministic_vars().iter().map(|d| d.name().to_string()).collect(),
            lower,
            upper,
        };
        for i in 0..n {
            let (lo, hi) = (bounds.lower[i], bounds.upper[i]);
            if lo.is_nan() || hi.is_nan() || lo > hi {
                return Err(RbdoError::InfeasibleBounds {
                    variable: bounds.names[i].clone(),
                    lower: lo,
                    upper: hi,
                });
            }
        }
        Ok(bounds)
    }

    pub fn lower(&self) -> &[f64] {
        &self.lower
    }

    pub fn upper(&self) -> &[f64] {
        &self.upper
    }

    /// Check that `x0` has the right length and lies inside the box.
    ///
    /// # Errors
    /// [`RbdoError::DimensionMismatch`] or [`RbdoError::InitialGuessOutOfBounds`].
    pub fn check_guess(&self, x0: &Array1<f64>) -> RbdoResult<()> {
        if x0.len() != self.lower.len() {
            return Err(RbdoError::DimensionMismatch {
                what: "initial guess",
                expected: self.lower.len(),
                found: x0.len(),
            });
        }
        for (i, &value) in x0.iter().enumerate() {
            let (lower, upper) = (self.lower[i], self.upper[i]);
            if !value.is_finite() || value < lower || value > upper {
                return Err(RbdoError::InitialGuessOutOfBounds {
                    variable: self.names[i].clone(),
                    value,
                    lower,
                    upper,
                });
            }
        }
        Ok(())
    }

    /// Name each entry of a design vector.
    pub fn name_design(&self, x: &Array1<f64>) -> std::collections::BTreeMap<String, f64> {
        self.names.iter().cloned().zip(x.iter().copied()).collect()
    }
}
