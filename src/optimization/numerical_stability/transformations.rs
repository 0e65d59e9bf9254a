//! Numerical stability utilities and box-bound reparameterization.
//!
//! Provides safe implementations of the nonlinear transforms that map an
//! unconstrained optimizer coordinate `u ∈ ℝ` onto a bounded design
//! coordinate, using explicit cutoffs (`|x| > 20.0`) to keep `f64`
//! arithmetic in a well-conditioned regime.
//!
//! # Provided items
//! - [`LOGIT_EPS`]: clamp used before taking logits of interval fractions.
//! - [`safe_softplus`] / [`safe_softplus_inv`]: ℝ ↔ (0, ∞).
//! - [`safe_logistic`] / [`safe_logit`]: ℝ ↔ (0, 1).
//! - [`BoxTransform`]: per-coordinate map from ℝⁿ onto a box
//!   `[lower, upper]`, with its diagonal Jacobian.
use crate::optimization::errors::{OptError, OptResult};
use ndarray::Array1;

/// Clamp applied to interval fractions before [`safe_logit`], so that an
/// initial guess sitting exactly on a bound maps to a finite coordinate.
pub const LOGIT_EPS: f64 = 1e-10;

/// Numerically stable softplus: `softplus(x) = ln(1 + exp(x))`.
pub fn safe_softplus(x: f64) -> f64 {
    if x > 20.0 {
        x
    } else {
        x.exp().ln_1p()
    }
}

/// Stable inverse of softplus on `(0, ∞)`: `t = ln(exp(x) - 1)`.
///
/// `x` must be finite and `> 0`.
pub fn safe_softplus_inv(x: f64) -> f64 {
    if x > 20.0 {
        x
    } else {
        x.exp_m1().ln()
    }
}

/// Numerically stable logistic `σ(x) = 1 / (1 + exp(-x))`.
///
/// Evaluated through `exp(-|x|)` so neither tail overflows.
pub fn safe_logistic(x: f64) -> f64 {
    if x >= 0.0 {
        1.0 / (1.0 + (-x).exp())
    } else {
        let e = x.exp();
        e / (1.0 + e)
    }
}

/// Logit `ln(p / (1 - p))` with `p` clamped to `[LOGIT_EPS, 1 - LOGIT_EPS]`.
pub fn safe_logit(p: f64) -> f64 {
    let p = p.clamp(LOGIT_EPS, 1.0 - LOGIT_EPS);
    p.ln() - (-p).ln_1p()
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum BoundKind {
    /// `lower == upper`; the coordinate never moves.
    Fixed(f64),
    /// `lower + (upper - lower)·σ(u)`.
    Interval { lower: f64, width: f64 },
    /// `lower + softplus(u)`.
    Lower(f64),
    /// `upper - softplus(u)`.
    Upper(f64),
    /// `u`.
    Free,
}

/// Smooth bijection from ℝⁿ onto the interior of a box.
///
/// Each coordinate picks its map from which bounds are finite:
///
/// | bounds            | map                                |
/// |-------------------|------------------------------------|
/// | both, equal       | fixed at the common value          |
/// | both              | `lo + (hi − lo)·σ(u)`              |
/// | lower only        | `lo + softplus(u)`                 |
/// | upper only        | `hi − softplus(u)`                 |
/// | none              | identity                           |
///
/// Fixed coordinates still occupy a slot in `u` (their entry is ignored) so
/// that unconstrained and constrained vectors share one indexing.
#[derive(Debug, Clone, PartialEq)]
pub struct BoxTransform {
    kinds: Vec<BoundKind>,
}

impl BoxTransform {
    /// Build a transform from per-coordinate bounds.
    ///
    /// # Errors
    /// - [`OptError::DimensionMismatch`] if `lower` and `upper` differ in length.
    /// - [`OptError::InfeasibleBounds`] if any `lower > upper`, either
    ///   endpoint is NaN, or a zero-width bound is infinite.
    pub fn new(lower: &[f64], upper: &[f64]) -> OptResult<Self> {
        if lower.len() != upper.len() {
            return Err(OptError::DimensionMismatch {
                what: "upper bounds",
                expected: lower.len(),
                found: upper.len(),
            });
        }
        let mut kinds = Vec::with_capacity(lower.len());
        for (index, (&lo, &hi)) in lower.iter().zip(upper).enumerate() {
            if lo.is_nan() || hi.is_nan() || lo > hi || (lo == hi && !lo.is_finite()) {
                return Err(OptError::InfeasibleBounds { index, lower: lo, upper: hi });
            }
            let kind = match (lo.is_finite(), hi.is_finite()) {
                _ if lo == hi => BoundKind::Fixed(lo),
                (true, true) => BoundKind::Interval { lower: lo, width: hi - lo },
                (true, false) => BoundKind::Lower(lo),
                (false, true) => BoundKind::Upper(hi),
                (false, false) => BoundKind::Free,
            };
            kinds.push(kind);
        }
        Ok(Self { kinds })
    }

    pub fn dim(&self) -> usize {
        self.kinds.len()
    }

    /// Map an unconstrained vector onto the box.
    pub fn to_bounded(&self, u: &Array1<f64>) -> Array1<f64> {
        self.kinds
            .iter()
            .zip(u.iter())
            .map(|(kind, &ui)| match *kind {
                BoundKind::Fixed(v) => v,
                BoundKind::Interval { lower, width } => lower + width * safe_logistic(ui),
                BoundKind::Lower(lo) => lo + safe_softplus(ui),
                BoundKind::Upper(hi) => hi - safe_softplus(ui),
                BoundKind::Free => ui,
            })
            .collect()
    }

    /// Map a point of the box to unconstrained coordinates.
    ///
    /// Points on a finite bound are nudged inside (`LOGIT_EPS` for intervals,
    /// a floor of `1e-12` for half-lines) so the result is finite.
    ///
    /// # Errors
    /// - [`OptError::DimensionMismatch`] on a length mismatch.
    /// - [`OptError::InitialGuessOutOfBounds`] if `x` is outside the box.
    pub fn to_unbounded(&self, x: &Array1<f64>) -> OptResult<Array1<f64>> {
        if x.len() != self.dim() {
            return Err(OptError::DimensionMismatch {
                what: "point",
                expected: self.dim(),
                found: x.len(),
            });
        }
        let mut u = Array1::zeros(x.len());
        for (index, (kind, &xi)) in self.kinds.iter().zip(x.iter()).enumerate() {
            let (lo, hi) = self.bounds_of(kind);
            if !xi.is_finite() || xi < lo || xi > hi {
                return Err(OptError::InitialGuessOutOfBounds {
                    index,
                    value: xi,
                    lower: lo,
                    upper: hi,
                });
            }
            u[index] = match *kind {
                BoundKind::Fixed(_) => 0.0,
                BoundKind::Interval { lower, width } => safe_logit((xi - lower) / width),
                BoundKind::Lower(lo) => safe_softplus_inv((xi - lo).max(1e-12)),
                BoundKind::Upper(hi) => safe_softplus_inv((hi - xi).max(1e-12)),
                BoundKind::Free => xi,
            };
        }
        Ok(u)
    }

    /// Diagonal of `∂x/∂u` at `u`; zero for fixed coordinates.
    pub fn jacobian_diag(&self, u: &Array1<f64>) -> Array1<f64> {
        self.kinds
            .iter()
            .zip(u.iter())
            .map(|(kind, &ui)| match *kind {
                BoundKind::Fixed(_) => 0.0,
                BoundKind::Interval { width, .. } => {
                    let s = safe_logistic(ui);
                    width * s * (1.0 - s)
                }
                BoundKind::Lower(_) => safe_logistic(ui),
                BoundKind::Upper(_) => -safe_logistic(ui),
                BoundKind::Free => 1.0,
            })
            .collect()
    }

    fn bounds_of(&self, kind: &BoundKind) -> (f64, f64) {
        match *kind {
            BoundKind::Fixed(v) => (v, v),
            BoundKind::Interval { lower, width } => (lower, lower + width),
            BoundKind::Lower(lo) => (lo, f64::INFINITY),
            BoundKind::Upper(hi) => (f64::NEG_INFINITY, hi),
            BoundKind::Free => (f64::NEG_INFINITY, f64::INFINITY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // Scope
    // -----
    // Scalar transforms against naïve formulas and the BoxTransform
    // bijection, Jacobian, and validation paths.

    #[test]
    // Purpose
    // -------
    // Stable transforms agree with naïve formulas on a safe grid and stay
    // finite in the tails.
    fn scalar_transforms_match_naive_formulas() {
        for x in [-5.0_f64, -0.3, 0.0, 0.7, 4.0] {
            assert_abs_diff_eq!(safe_softplus(x), (1.0 + x.exp()).ln(), epsilon = 1e-12);
            assert_abs_diff_eq!(safe_logistic(x), 1.0 / (1.0 + (-x).exp()), epsilon = 1e-12);
            assert_abs_diff_eq!(safe_logit(safe_logistic(x)), x, epsilon = 1e-9);
            assert_abs_diff_eq!(safe_softplus_inv(safe_softplus(x)), x, epsilon = 1e-9);
        }
        assert!(safe_logistic(-800.0).is_finite());
        assert_eq!(safe_softplus(800.0), 800.0);
    }

    #[test]
    // Purpose
    // -------
    // Interior points round-trip through every bound kind.
    //
    // Given
    // -----
    // - Bounds: [0, 10], [1, ∞), (−∞, 2], (−∞, ∞), [4, 4].
    // - Point (2.5, 3, −1, 7, 4).
    //
    // Expect
    // ------
    // - to_bounded(to_unbounded(x)) == x.
    fn box_transform_round_trips_interior_points() {
        // Arrange
        let inf = f64::INFINITY;
        let tr = BoxTransform::new(&[0.0, 1.0, -inf, -inf, 4.0], &[10.0, inf, 2.0, inf, 4.0])
            .unwrap();
        let x = array![2.5, 3.0, -1.0, 7.0, 4.0];

        // Act
        let back = tr.to_bounded(&tr.to_unbounded(&x).unwrap());

        // Assert
        for i in 0..x.len() {
            assert_abs_diff_eq!(back[i], x[i], epsilon = 1e-9);
        }
    }

    #[test]
    // Purpose
    // -------
    // `jacobian_diag` matches a finite-difference derivative of `to_bounded`.
    fn box_transform_jacobian_matches_finite_differences() {
        // Arrange
        let tr = BoxTransform::new(&[0.0, 1.0, 5.0], &[10.0, f64::INFINITY, 5.0]).unwrap();
        let u = array![0.3, -1.2, 0.0];
        let h = 1e-6;

        // Act
        let diag = tr.jacobian_diag(&u);

        // Assert
        for i in 0..u.len() {
            let mut up = u.clone();
            let mut dn = u.clone();
            up[i] += h;
            dn[i] -= h;
            let fd = (tr.to_bounded(&up)[i] - tr.to_bounded(&dn)[i]) / (2.0 * h);
            assert_abs_diff_eq!(diag[i], fd, epsilon = 1e-6);
        }
    }

    #[test]
    // Purpose
    // -------
    // Invalid boxes and out-of-box points are rejected with their index.
    fn box_transform_validates_inputs() {
        assert_eq!(
            BoxTransform::new(&[0.0, 3.0], &[1.0, 2.0]),
            Err(OptError::InfeasibleBounds { index: 1, lower: 3.0, upper: 2.0 })
        );
        let tr = BoxTransform::new(&[0.0], &[1.0]).unwrap();
        assert!(matches!(
            tr.to_unbounded(&array![1.5]),
            Err(OptError::InitialGuessOutOfBounds { index: 0, .. })
        ));
        // A point sitting on a bound maps to a finite coordinate.
        assert!(tr.to_unbounded(&array![1.0]).unwrap()[0].is_finite());
    }
}
