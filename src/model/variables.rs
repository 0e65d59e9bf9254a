//! Deterministic and random variable declarations.
use crate::model::{
    errors::{ModelError, ModelResult},
    marginals::Marginal,
};

/// Sign of `∂g/∂x` for a random variable, used to aim the FORM/PMA start
/// and to pick conservative quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sensitivity {
    /// Increasing the variable increases the limit state (+1).
    Increases,
    /// Increasing the variable decreases the limit state (−1).
    Decreases,
    /// No known effect (0).
    Unknown,
}

impl Sensitivity {
    pub fn sign(self) -> f64 {
        match self {
            Sensitivity::Increases => 1.0,
            Sensitivity::Decreases => -1.0,
            Sensitivity::Unknown => 0.0,
        }
    }
}

impl TryFrom<i8> for Sensitivity {
    type Error = ModelError;

    fn try_from(value: i8) -> ModelResult<Self> {
        match value {
            1 => Ok(Sensitivity::Increases),
            -1 => Ok(Sensitivity::Decreases),
            0 => Ok(Sensitivity::Unknown),
            _ => Err(ModelError::InvalidSensitivity { value }),
        }
    }
}

/// A design variable with box bounds and a nominal value.
///
/// `lower == upper` fixes the variable. Infinite bounds are allowed but
/// then the nominal must be given explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicVar {
    name: String,
    lower: f64,
    upper: f64,
    nominal: f64,
}

impl DeterministicVar {
    /// Variable with nominal at the interval midpoint.
    ///
    /// # Errors
    /// - [`ModelError::EmptyName`] for an empty name.
    /// - [`ModelError::InvalidBounds`] if `lower > upper` or either is NaN.
    /// - [`ModelError::InvalidNominal`] if either bound is infinite.
    pub fn new(name: &str, lower: f64, upper: f64) -> ModelResult<Self> {
        let mid = 0.5 * (lower + upper);
        if lower.is_finite() && upper.is_finite() {
            Self::with_nominal(name, lower, upper, mid)
        } else {
            check_bounds(name, lower, upper)?;
            Err(ModelError::InvalidNominal {
                name: name.to_string(),
                value: mid,
                reason: "unbounded variables need an explicit nominal value",
            })
        }
    }

    /// # Errors
    /// As [`DeterministicVar::new`], plus [`ModelError::InvalidNominal`] if
    /// `nominal` is non-finite or outside `[lower, upper]`.
    pub fn with_nominal(name: &str, lower: f64, upper: f64, nominal: f64) -> ModelResult<Self> {
        check_bounds(name, lower, upper)?;
        if !nominal.is_finite() || nominal < lower || nominal > upper {
            return Err(ModelError::InvalidNominal {
                name: name.to_string(),
                value: nominal,
                reason: "nominal must be finite and inside the bounds",
            });
        }
        Ok(Self { name: name.to_string(), lower, upper, nominal })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    pub fn nominal(&self) -> f64 {
        self.nominal
    }
}

fn check_bounds(name: &str, lower: f64, upper: f64) -> ModelResult<()> {
    if name.is_empty() {
        return Err(ModelError::EmptyName { context: "deterministic variable" });
    }
    if lower.is_nan() || upper.is_nan() || lower > upper {
        return Err(ModelError::InvalidBounds { name: name.to_string(), lower, upper });
    }
    Ok(())
}

/// A random variable: marginal plus sensitivity tag.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomVar {
    name: String,
    marginal: Marginal,
    sensitivity: Sensitivity,
}

impl RandomVar {
    /// # Errors
    /// [`ModelError::EmptyName`] for an empty name.
    pub fn new(name: &str, marginal: Marginal, sensitivity: Sensitivity) -> ModelResult<Self> {
        if name.is_empty() {
            return Err(ModelError::EmptyName { context: "random variable" });
        }
        Ok(Self { name: name.to_string(), marginal, sensitivity })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn marginal(&self) -> &Marginal {
        &self.marginal
    }

    pub fn sensitivity(&self) -> Sensitivity {
        self.sensitivity
    }

    /// Quantile chosen so the variable sits on its unfavourable side:
    /// `q` for `Increases`, `1 − q` for `Decreases`, the median otherwise.
    ///
    /// With `q` small (e.g. 0.01) this is the classic "conservative"
    /// characteristic value.
    ///
    /// # Errors
    /// [`ModelError::InvalidProbability`] if `q ∉ (0, 1)`.
    pub fn conservative(&self, q: f64) -> ModelResult<f64> {
        match self.sensitivity {
            Sensitivity::Increases => self.marginal.quantile(q),
            Sensitivity::Decreases => self.marginal.quantile(1.0 - q),
            Sensitivity::Unknown => {
                if !(q > 0.0 && q < 1.0) {
                    return Err(ModelError::InvalidProbability { value: q });
                }
                Ok(self.marginal.median())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    // Purpose
    // -------
    // Tags parse from {-1, 0, 1} only.
    fn sensitivity_parses_from_i8() {
        assert_eq!(Sensitivity::try_from(-1).unwrap(), Sensitivity::Decreases);
        assert_eq!(Sensitivity::try_from(0).unwrap().sign(), 0.0);
        assert_eq!(Sensitivity::try_from(2), Err(ModelError::InvalidSensitivity { value: 2 }));
    }

    #[test]
    // Purpose
    // -------
    // Bounds and nominal values are validated; the default nominal is the
    // midpoint and zero-width bounds are accepted.
    fn deterministic_var_validates_bounds_and_nominal() {
        assert_eq!(DeterministicVar::new("w", 2.0, 4.0).unwrap().nominal(), 3.0);
        assert_eq!(DeterministicVar::new("k", 1.0, 1.0).unwrap().nominal(), 1.0);
        assert!(matches!(
            DeterministicVar::new("w", 4.0, 2.0),
            Err(ModelError::InvalidBounds { .. })
        ));
        assert!(matches!(
            DeterministicVar::new("w", 0.0, f64::INFINITY),
            Err(ModelError::InvalidNominal { .. })
        ));
        assert!(DeterministicVar::with_nominal("w", 0.0, f64::INFINITY, 5.0).is_ok());
        assert!(matches!(
            DeterministicVar::with_nominal("w", 0.0, 1.0, 2.0),
            Err(ModelError::InvalidNominal { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Conservative quantiles move against the tagged direction.
    //
    // Given
    // -----
    // - N(0, 1) tagged +1, −1, 0 and q = 0.01.
    //
    // Expect
    // ------
    // - ≈ −2.326, +2.326, 0.
    fn conservative_quantile_follows_sensitivity() {
        let m = Marginal::normal(0.0, 1.0).unwrap();
        let up = RandomVar::new("a", m, Sensitivity::Increases).unwrap();
        let down = RandomVar::new("b", m, Sensitivity::Decreases).unwrap();
        let flat = RandomVar::new("c", m, Sensitivity::Unknown).unwrap();
        assert_abs_diff_eq!(up.conservative(0.01).unwrap(), -2.3263478740, epsilon = 1e-8);
        assert_abs_diff_eq!(down.conservative(0.01).unwrap(), 2.3263478740, epsilon = 1e-8);
        assert_eq!(flat.conservative(0.01).unwrap(), 0.0);
    }
}
