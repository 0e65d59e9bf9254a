//! Validation helpers for the minimizer.
//!
//! - **Tolerance checks**: [`verify_tol_grad`], [`verify_tol_cost`] ensure
//!   numeric tolerances are finite and strictly positive when provided.
//! - **Gradient validation**: [`validate_grad`] enforces correct dimension
//!   and finite entries.
//! - **Solutions**: [`validate_solution`] ensures a candidate minimizer
//!   exists and contains only finite values.
//! - **Objective values**: [`validate_value`] checks cost outputs for
//!   finiteness.
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::types::{Grad, Point},
};

/// Validate the optional gradient‐norm tolerance.
///
/// - Accepts `None` (no stopping rule on gradient).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolGrad`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_grad(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolGrad { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate the optional cost‐change tolerance (for convergence).
///
/// - Accepts `None` (no stopping rule on cost change).
/// - If `Some`, the value must be **finite** and **strictly positive**.
///
/// # Errors
/// Returns [`OptError::InvalidTolCost`] if the value is non-finite or ≤ 0.0.
pub fn verify_tol_cost(tol: Option<f64>) -> OptResult<()> {
    if let Some(tol) = tol {
        if !tol.is_finite() {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be finite." });
        }
        if tol <= 0.0 {
            return Err(OptError::InvalidTolCost { tol, reason: "Tolerance must be positive." });
        }
    }
    Ok(())
}

/// Validate a gradient vector against dimension and finiteness.
///
/// # Errors
/// - [`OptError::GradientDimMismatch`] if length does not match `dim`.
/// - [`OptError::InvalidGradient`] with the index/value/reason of the first
///   offending element.
pub fn validate_grad(grad: &Grad, dim: usize) -> OptResult<()> {
    if grad.len() != dim {
        return Err(OptError::GradientDimMismatch { expected: dim, found: grad.len() });
    }
    for (index, &value) in grad.iter().enumerate() {
        if !value.is_finite() {
            return Err(OptError::InvalidGradient {
                index,
                value,
                reason: "Gradient elements must be finite.",
            });
        }
    }
    Ok(())
}

/// Validate and unwrap a solver's best point.
///
/// # Errors
/// - [`OptError::MissingSolution`] if no vector was provided.
/// - [`OptError::InvalidSolution`] if any element is non-finite.
pub fn validate_solution(x_hat: Option<Point>) -> OptResult<Point> {
    match x_hat {
        Some(x) => {
            for (index, &value) in x.iter().enumerate() {
                if !value.is_finite() {
                    return Err(OptError::InvalidSolution {
                        index,
                        value,
                        reason: "Solution entries must be finite.",
                    });
                }
            }
            Ok(x)
        }
        None => Err(OptError::MissingSolution),
    }
}

/// Validate that a scalar cost value is finite.
///
/// # Errors
/// Returns [`OptError::NonFiniteCost`] if the value is `NaN` or infinite.
pub fn validate_value(value: f64) -> OptResult<()> {
    if !value.is_finite() {
        return Err(OptError::NonFiniteCost { value });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // Non-positive and non-finite tolerances are rejected with the
    // matching variant; `None` is accepted.
    fn tolerance_checks_reject_bad_values() {
        assert!(verify_tol_grad(None).is_ok());
        assert!(matches!(verify_tol_grad(Some(0.0)), Err(OptError::InvalidTolGrad { .. })));
        assert!(matches!(
            verify_tol_cost(Some(f64::INFINITY)),
            Err(OptError::InvalidTolCost { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // `validate_grad` reports the first non-finite entry and length
    // mismatches.
    //
    // Given
    // -----
    // - A gradient `[1, NaN, inf]` and a length-2 gradient for `dim = 3`.
    //
    // Expect
    // ------
    // - `InvalidGradient { index: 1, .. }` and `GradientDimMismatch`.
    fn validate_grad_reports_first_offender() {
        // Arrange
        let bad = array![1.0, f64::NAN, f64::INFINITY];
        let short = array![1.0, 2.0];

        // Act
        let bad_err = validate_grad(&bad, 3).expect_err("NaN must be rejected");
        let short_err = validate_grad(&short, 3).expect_err("length mismatch must be rejected");

        // Assert
        assert!(matches!(bad_err, OptError::InvalidGradient { index: 1, .. }));
        assert_eq!(short_err, OptError::GradientDimMismatch { expected: 3, found: 2 });
    }

    #[test]
    // Purpose
    // -------
    // Missing or non-finite solutions never pass as results.
    fn validate_solution_rejects_missing_and_non_finite() {
        assert_eq!(validate_solution(None), Err(OptError::MissingSolution));
        assert!(matches!(
            validate_solution(Some(array![0.0, f64::NAN])),
            Err(OptError::InvalidSolution { index: 1, .. })
        ));
        assert_eq!(validate_solution(Some(array![1.0])).unwrap(), array![1.0]);
    }
}
