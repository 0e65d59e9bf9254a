//! Gaussian copula blocks.
//!
//! A block correlates a set of random variables through a correlation
//! matrix `R = L Lᵀ`. In standard-normal space the independent coordinates
//! `z` and the correlated coordinates `w` are related by `w = L z`; each
//! `w_i` is then pushed through its marginal.
//!
//! Random variables outside every block are governed by the independence
//! copula (`w = z` componentwise).
use crate::model::errors::{ModelError, ModelResult};
use nalgebra::{DMatrix, DVector};
use ndarray::Array2;

const SYMMETRY_TOL: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct GaussianCopula {
    variables: Vec<String>,
    correlation: Array2<f64>,
    chol: DMatrix<f64>,
}

impl GaussianCopula {
    /// Validate a correlation matrix and factor it.
    ///
    /// Variable names are checked against the model later, by the builder.
    ///
    /// # Errors
    /// - [`ModelError::RepeatedName`] / [`ModelError::EmptyName`] for bad names.
    /// - [`ModelError::DimensionMismatch`] if the matrix is not `k × k`.
    /// - [`ModelError::InvalidCorrelation`] for a non-unit diagonal, an
    ///   off-diagonal outside `(−1, 1)`, or asymmetry.
    /// - [`ModelError::CorrelationNotPositiveDefinite`] if Cholesky fails.
    pub fn new(variables: &[&str], correlation: Array2<f64>) -> ModelResult<Self> {
        let k = variables.len();
        for (i, name) in variables.iter().enumerate() {
            if name.is_empty() {
                return Err(ModelError::EmptyName { context: "copula" });
            }
            if variables[..i].contains(name) {
                return Err(ModelError::RepeatedName {
                    context: "copula",
                    name: name.to_string(),
                });
            }
        }
        let shape =
            [("correlation rows", correlation.nrows()), ("correlation columns", correlation.ncols())];
        for (what, found) in shape {
            if found != k {
                return Err(ModelError::DimensionMismatch { what, expected: k, found });
            }
        }
        for i in 0..k {
            for j in 0..k {
                let value = correlation[[i, j]];
                if i == j {
                    if value != 1.0 {
                        return Err(ModelError::InvalidCorrelation {
                            row: i,
                            col: j,
                            value,
                            reason: "diagonal entries must equal one",
                        });
                    }
                } else if !(value > -1.0 && value < 1.0) {
                    return Err(ModelError::InvalidCorrelation {
                        row: i,
                        col: j,
                        value,
                        reason: "off-diagonal entries must lie in (-1, 1)",
                    });
                } else if (value - correlation[[j, i]]).abs() > SYMMETRY_TOL {
                    return Err(ModelError::InvalidCorrelation {
                        row: i,
                        col: j,
                        value,
                        reason: "matrix must be symmetric",
                    });
                }
            }
        }
        let mut dense = DMatrix::<f64>::zeros(k, k);
        for i in 0..k {
            for j in 0..k {
                dense[(i, j)] = correlation[[i, j]];
            }
        }
        let chol = dense
            .cholesky()
            .ok_or(ModelError::CorrelationNotPositiveDefinite)?
            .l();
        Ok(Self { variables: variables.iter().map(|s| s.to_string()).collect(), correlation, chol })
    }

    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    pub fn correlation(&self) -> &Array2<f64> {
        &self.correlation
    }

    /// `w = L z` for this block's coordinates (in block order).
    pub fn correlate(&self, z: &[f64]) -> Vec<f64> {
        let z = DVector::from_column_slice(z);
        (&self.chol * z).iter().copied().collect()
    }

    /// `z = L⁻¹ w` for this block's coordinates (in block order).
    pub fn decorrelate(&self, w: &[f64]) -> Vec<f64> {
        let mut z = DVector::from_column_slice(w);
        // L has a strictly positive diagonal, so the solve cannot fail.
        if !self.chol.solve_lower_triangular_mut(&mut z) {
            return vec![f64::NAN; w.len()];
        }
        z.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    // Purpose
    // -------
    // `decorrelate` inverts `correlate`, and the factor reproduces R.
    //
    // Given
    // -----
    // - A 3×3 correlation matrix with mixed signs.
    //
    // Expect
    // ------
    // - L Lᵀ = R and decorrelate(correlate(z)) = z.
    fn correlate_round_trips_and_factor_matches() {
        // Arrange
        let r = array![[1.0, 0.5, -0.2], [0.5, 1.0, 0.3], [-0.2, 0.3, 1.0]];
        let cop = GaussianCopula::new(&["a", "b", "c"], r.clone()).unwrap();
        let z = [0.7, -1.3, 2.0];

        // Act
        let w = cop.correlate(&z);
        let back = cop.decorrelate(&w);
        let rr = &cop.chol * cop.chol.transpose();

        // Assert
        for i in 0..3 {
            assert_abs_diff_eq!(back[i], z[i], epsilon = 1e-12);
            for j in 0..3 {
                assert_abs_diff_eq!(rr[(i, j)], r[[i, j]], epsilon = 1e-12);
            }
        }
        assert_abs_diff_eq!(w[0], z[0], epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Malformed matrices are rejected with a precise reason.
    fn new_rejects_invalid_matrices() {
        assert!(matches!(
            GaussianCopula::new(&["a", "b"], array![[1.0, 0.2], [0.3, 1.0]]),
            Err(ModelError::InvalidCorrelation { reason: "matrix must be symmetric", .. })
        ));
        assert!(matches!(
            GaussianCopula::new(&["a", "b"], array![[2.0, 0.0], [0.0, 1.0]]),
            Err(ModelError::InvalidCorrelation { row: 0, col: 0, .. })
        ));
        assert!(matches!(
            GaussianCopula::new(&["a", "a"], array![[1.0, 0.0], [0.0, 1.0]]),
            Err(ModelError::RepeatedName { .. })
        ));
        assert_eq!(
            GaussianCopula::new(
                &["a", "b", "c"],
                array![[1.0, 0.9, -0.9], [0.9, 1.0, 0.9], [-0.9, 0.9, 1.0]]
            ),
            Err(ModelError::CorrelationNotPositiveDefinite)
        );
    }
}
