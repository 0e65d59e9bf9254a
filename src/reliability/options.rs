//! FORM/PMA solver settings.
use crate::reliability::errors::{ReliabilityError, ReliabilityResult};

/// Settings for [`form_pma`](super::form_pma::form_pma).
///
/// - `tol_g`: relative change of `g` between accepted full steps.
/// - `tol_z`: change of the iterate between accepted full steps, relative to β.
/// - `tol_kkt`: `‖z − z_target‖ / β`, where `z_target = −β ∇g / ‖∇g‖`.
/// - `max_iter`: cap on accepted or rejected outer iterations.
/// - `max_halvings`: arc-step halvings before a step is given up.
/// - `check_alternate_start`: re-solve from a second start and flag results
///   that depend on the start.
/// - `max_perturbations`, `perturbation_seed`: random restarts when the
///   limit state is undefined at the start point.
#[derive(Debug, Clone, PartialEq)]
pub struct FormOptions {
    pub tol_g: f64,
    pub tol_z: f64,
    pub tol_kkt: f64,
    pub max_iter: usize,
    pub max_halvings: usize,
    pub check_alternate_start: bool,
    pub max_perturbations: usize,
    pub perturbation_seed: u64,
}

impl FormOptions {
    /// # Errors
    /// - [`ReliabilityError::InvalidTolerance`] for a non-positive or
    ///   non-finite tolerance.
    /// - [`ReliabilityError::InvalidMaxIter`] if `max_iter == 0`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tol_g: f64, tol_z: f64, tol_kkt: f64, max_iter: usize, max_halvings: usize,
        check_alternate_start: bool, max_perturbations: usize, perturbation_seed: u64,
    ) -> ReliabilityResult<Self> {
        for (name, value) in [("tol_g", tol_g), ("tol_z", tol_z), ("tol_kkt", tol_kkt)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ReliabilityError::InvalidTolerance { name, value });
            }
        }
        if max_iter == 0 {
            return Err(ReliabilityError::InvalidMaxIter { value: max_iter });
        }
        Ok(Self {
            tol_g,
            tol_z,
            tol_kkt,
            max_iter,
            max_halvings,
            check_alternate_start,
            max_perturbations,
            perturbation_seed,
        })
    }
}

impl Default for FormOptions {
    fn default() -> Self {
        Self {
            tol_g: 1e-9,
            tol_z: 1e-7,
            tol_kkt: 1e-6,
            max_iter: 200,
            max_halvings: 30,
            check_alternate_start: true,
            max_perturbations: 20,
            perturbation_seed: 0x5eed,
        }
    }
}
