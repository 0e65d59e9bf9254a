//! reliability::form_pma — first-order reliability, performance measure approach.
//!
//! Purpose
//! -------
//! For a limit state `g(d, X)`, a fixed design `d` and a target index `β`,
//! compute
//!
//! ```text
//! g*(d) = min g(d, T⁻¹(z))   subject to   ‖z‖₂ = β
//! ```
//!
//! together with the minimizer `z*` (the design point) and its physical
//! image `x* = T⁻¹(z*)`. `g*(d) ≥ 0` is the first-order reliability
//! constraint `P[g(d, X) ≤ 0] ≤ Φ(−β)`.
//!
//! Key behaviors
//! -------------
//! - Works on the limit state's random support only (closed under copula
//!   blocks); every other random variable sits at its median.
//! - Advanced-mean-value iteration: from `z`, the next candidate is
//!   `z_target = −β ∇g(z) / ‖∇g(z)‖`. Candidates are taken along the great
//!   arc from `z` toward `z_target`, halving the arc step until `g` does not
//!   increase, so every accepted iterate is defined and no worse than the
//!   last.
//! - Start: each random variable contributes `−sign` (its sensitivity tag)
//!   in correlated normal space, mapped to `z` through the copula factor.
//!   With every tag `Unknown` the start is the mean-value direction
//!   `−∇g(0) / ‖∇g(0)‖`. A warm start (previous design point) overrides both.
//! - Undefined limit-state values (NaN, or a transform out of domain) are
//!   infeasible trial points: starts are perturbed with a seeded random
//!   offset, arc steps are shortened, and derivative steps fall back to
//!   one-sided differences per coordinate.
//! - Optionally re-solves from a second start and flags results whose `g*`
//!   depends on the start; the smaller value is reported.
//!
//! Invariants & assumptions
//! ------------------------
//! - `z`-gradients come from central finite differences (`finitediff`) of
//!   the composed map `z ↦ g(d, T⁻¹(z))`.
//! - A solve that stops without meeting its tolerances returns
//!   [`ReliabilityError::NonConvergence`]; no approximate value escapes.
//! - No state is shared between calls; two solves for the same inputs
//!   return the same result.
//!
//! Conventions
//! -----------
//! - `design_point` and `physical_point` in [`FormOutcome`] are full-length
//!   random vectors in declaration order; coordinates outside the support
//!   are `0` in `z` and the median in `x`.
//!
//! Testing notes
//! -------------
//! - Unit tests check exactness for linear limit states (independent and
//!   correlated), monotonicity in β, repeatability, recovery from an
//!   undefined start, start-sensitivity flagging and explicit
//!   non-convergence. The cantilever reference values are covered by the
//!   integration tests.
use crate::{
    model::{errors::ModelError, model::Model},
    optimization::{
        errors::OptResult,
        minimizer::{fd_gradient, Point},
    },
    reliability::{
        errors::{ReliabilityError, ReliabilityResult},
        options::FormOptions,
        target::ReliabilityTarget,
    },
};
use ndarray::Array1;
use rand::{rngs::StdRng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};
use std::cell::{Cell, RefCell};
use tracing::{debug, trace, warn};

/// KKT residual accepted when the arc search finds no further descent.
const STALL_RESIDUAL: f64 = 1e-4;
/// Relative gap in `g*` between starts that counts as start-sensitive.
const START_SENSITIVITY_RTOL: f64 = 1e-6;
/// Step for one-sided derivative steps.
const ONE_SIDED_STEP: f64 = 1e-6;

/// Result of one FORM/PMA solve.
#[derive(Debug, Clone, PartialEq)]
pub struct FormOutcome {
    pub limit_state: String,
    pub beta: f64,
    /// Minimum of the limit state on the β-sphere.
    pub g_star: f64,
    /// `z*`, full length, zero outside the support.
    pub design_point: Array1<f64>,
    /// `x* = T⁻¹(z*)`.
    pub physical_point: Array1<f64>,
    pub iterations: usize,
    pub evaluations: usize,
    /// A second start reached a different `g*`.
    pub start_sensitive: bool,
}

impl FormOutcome {
    /// `g* ≥ 0`: the first-order reliability constraint holds.
    pub fn satisfied(&self) -> bool {
        self.g_star >= 0.0
    }
}

/// form_pma — minimum of a limit state on the β-sphere.
///
/// Parameters
/// ----------
/// - `model`: `&Model`
///   Built model providing the limit state and the transform.
/// - `limit_state`: `&str`
///   Output name of the limit state (`g > 0` safe).
/// - `det`: `&Array1<f64>`
///   Fixed deterministic values, in declaration order.
/// - `target`: `ReliabilityTarget`
///   Reliability index β.
/// - `options`: `&FormOptions`
///   Tolerances, caps and start handling.
///
/// Returns
/// -------
/// `ReliabilityResult<FormOutcome>`
///   `g*`, the design point and solve statistics.
///
/// Errors
/// ------
/// - `ReliabilityError::Model` for an unknown output or malformed `det`.
/// - `ReliabilityError::UndefinedStart` if no start point evaluates.
/// - `ReliabilityError::UndefinedGradient` if a derivative cannot be estimated.
/// - `ReliabilityError::NonConvergence` when the iteration cap is hit or
///   the arc search stalls away from a stationary point.
pub fn form_pma(
    model: &Model, limit_state: &str, det: &Array1<f64>, target: ReliabilityTarget,
    options: &FormOptions,
) -> ReliabilityResult<FormOutcome> {
    solve(model, limit_state, det, target, options, None)
}

/// [`form_pma`] started from a previous design point `z_start` (full
/// length). The start is projected onto the β-sphere; a zero or malformed
/// start falls back to the default start.
///
/// # Errors
/// As [`form_pma`].
pub fn form_pma_from(
    model: &Model, limit_state: &str, det: &Array1<f64>, target: ReliabilityTarget,
    options: &FormOptions, z_start: &Array1<f64>,
) -> ReliabilityResult<FormOutcome> {
    solve(model, limit_state, det, target, options, Some(z_start))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StartKind {
    Warm,
    Sensitivity,
    MeanValue,
}

/// Converged iterate on the β-sphere, in support coordinates.
#[derive(Debug, Clone)]
struct Iterate {
    z: Array1<f64>,
    g: f64,
    iterations: usize,
}

fn solve(
    model: &Model, limit_state: &str, det: &Array1<f64>, target: ReliabilityTarget,
    options: &FormOptions, warm: Option<&Array1<f64>>,
) -> ReliabilityResult<FormOutcome> {
    let support = model.random_support(limit_state)?;
    let beta = target.beta();
    let problem = PmaProblem::new(model, limit_state, det, support);

    if support.is_empty() {
        let x = model.rand_median()?;
        let g = model.evaluate_output(limit_state, det, &x)?;
        if !g.is_finite() {
            return Err(ReliabilityError::UndefinedStart {
                limit_state: limit_state.to_string(),
                attempts: 0,
            });
        }
        return Ok(FormOutcome {
            limit_state: limit_state.to_string(),
            beta,
            g_star: g,
            design_point: Array1::zeros(model.n_rand()),
            physical_point: x,
            iterations: 0,
            evaluations: 1,
            start_sensitive: false,
        });
    }

    let (z0, kind) = match warm.and_then(|w| problem.project_warm(w, beta)) {
        Some(z) => (z, StartKind::Warm),
        None => match problem.sensitivity_start(beta) {
            Some(z) => (z, StartKind::Sensitivity),
            None => (problem.mean_value_start(beta)?, StartKind::MeanValue),
        },
    };
    let mut best = problem.iterate(&z0, beta, options)?;
    let mut start_sensitive = false;

    if options.check_alternate_start {
        let alternate = match kind {
            StartKind::MeanValue => Ok(-&z0),
            _ => problem.mean_value_start(beta),
        };
        match alternate.and_then(|z| problem.iterate(&z, beta, options)) {
            Ok(alt) => {
                let tol = START_SENSITIVITY_RTOL * (1.0 + best.g.abs());
                if (alt.g - best.g).abs() > tol {
                    start_sensitive = true;
                    warn!(
                        limit_state,
                        g_primary = best.g,
                        g_alternate = alt.g,
                        "FORM/PMA result depends on the start direction"
                    );
                    if alt.g < best.g {
                        best = Iterate { iterations: best.iterations + alt.iterations, ..alt };
                    }
                }
            }
            Err(err) => debug!(limit_state, %err, "alternate FORM/PMA start failed"),
        }
    }

    let mut design_point = Array1::zeros(model.n_rand());
    for (&j, &v) in support.iter().zip(best.z.iter()) {
        design_point[j] = v;
    }
    let physical_point = model.inverse_transform(&design_point)?;
    debug!(
        limit_state,
        beta,
        g_star = best.g,
        iterations = best.iterations,
        evaluations = problem.evaluations.get(),
        "FORM/PMA converged"
    );
    Ok(FormOutcome {
        limit_state: limit_state.to_string(),
        beta,
        g_star: best.g,
        design_point,
        physical_point,
        iterations: best.iterations,
        evaluations: problem.evaluations.get(),
        start_sensitive,
    })
}

/// `z ↦ g(d, T⁻¹(z))` on the support of one limit state.
struct PmaProblem<'a> {
    model: &'a Model,
    limit_state: &'a str,
    det: &'a Array1<f64>,
    support: &'a [usize],
    evaluations: Cell<usize>,
}

impl<'a> PmaProblem<'a> {
    fn new(model: &'a Model, limit_state: &'a str, det: &'a Array1<f64>, support: &'a [usize]) -> Self {
        Self { model, limit_state, det, support, evaluations: Cell::new(0) }
    }

    /// Limit state at `z`; `NaN` where it is undefined.
    fn value(&self, z: &Array1<f64>) -> ReliabilityResult<f64> {
        self.evaluations.set(self.evaluations.get() + 1);
        let x = match self.model.inverse_transform_on(self.support, z) {
            Ok(x) => x,
            Err(ModelError::TransformOutOfDomain { .. } | ModelError::NonFiniteInput { .. }) => {
                return Ok(f64::NAN)
            }
            Err(err) => return Err(err.into()),
        };
        let g = self.model.evaluate_output(self.limit_state, self.det, &x)?;
        Ok(if g.is_finite() { g } else { f64::NAN })
    }

    /// Central differences, with a per-coordinate one-sided fallback.
    fn gradient(&self, z: &Array1<f64>, g0: f64) -> ReliabilityResult<Array1<f64>> {
        let failure: RefCell<Option<ReliabilityError>> = RefCell::new(None);
        let g_at = |p: &Point| -> OptResult<f64> {
            match self.value(p) {
                Ok(v) => Ok(v),
                Err(err) => {
                    let mut slot = failure.borrow_mut();
                    if slot.is_none() {
                        *slot = Some(err);
                    }
                    Ok(f64::NAN)
                }
            }
        };
        let central = fd_gradient(z, &g_at);
        if let Some(err) = failure.borrow_mut().take() {
            return Err(err);
        }
        match central {
            Ok(grad) => Ok(grad),
            Err(_) => self.one_sided_gradient(z, g0),
        }
    }

    fn one_sided_gradient(&self, z: &Array1<f64>, g0: f64) -> ReliabilityResult<Array1<f64>> {
        let h = ONE_SIDED_STEP;
        let mut grad = Array1::zeros(z.len());
        for i in 0..z.len() {
            let mut zp = z.clone();
            zp[i] += h;
            let mut zm = z.clone();
            zm[i] -= h;
            let (gp, gm) = (self.value(&zp)?, self.value(&zm)?);
            grad[i] = match (gp.is_finite(), gm.is_finite()) {
                (true, true) => (gp - gm) / (2.0 * h),
                (true, false) => (gp - g0) / h,
                (false, true) => (g0 - gm) / h,
                (false, false) => {
                    return Err(ReliabilityError::UndefinedGradient {
                        limit_state: self.limit_state.to_string(),
                        index: self.support[i],
                    })
                }
            };
        }
        Ok(grad)
    }

    fn project_warm(&self, z_full: &Array1<f64>, beta: f64) -> Option<Array1<f64>> {
        if z_full.len() != self.model.n_rand() {
            return None;
        }
        let z: Array1<f64> = self.support.iter().map(|&j| z_full[j]).collect();
        on_sphere(z, beta)
    }

    /// `−sign` per variable in correlated normal space, decorrelated
    /// block by block. `None` if every tag is `Unknown`.
    fn sensitivity_start(&self, beta: f64) -> Option<Array1<f64>> {
        let model = self.model;
        let mut w = Array1::<f64>::zeros(model.n_rand());
        for &j in self.support {
            w[j] = -model.random_vars()[j].sensitivity().sign();
        }
        let mut z = w.clone();
        for (copula, members) in model.copulas.iter().zip(&model.copula_members) {
            if members.iter().any(|j| self.support.contains(j)) {
                let block: Vec<f64> = members.iter().map(|&j| w[j]).collect();
                for (&j, v) in members.iter().zip(copula.decorrelate(&block)) {
                    z[j] = v;
                }
            }
        }
        on_sphere(self.support.iter().map(|&j| z[j]).collect(), beta)
    }

    /// `−β ∇g(0) / ‖∇g(0)‖`; the first axis if `g` is flat at the origin.
    fn mean_value_start(&self, beta: f64) -> ReliabilityResult<Array1<f64>> {
        let origin = Array1::zeros(self.support.len());
        let g0 = self.value(&origin)?;
        let grad = self.gradient(&origin, g0)?;
        Ok(on_sphere(-grad, beta).unwrap_or_else(|| {
            let mut axis = Array1::zeros(self.support.len());
            axis[0] = beta;
            axis
        }))
    }

    /// Move `z0` onto the sphere and, if needed, off undefined ground with
    /// seeded random offsets of growing size.
    fn defined_start(
        &self, z0: &Array1<f64>, beta: f64, options: &FormOptions,
    ) -> ReliabilityResult<(Array1<f64>, f64)> {
        let z = on_sphere(z0.clone(), beta).unwrap_or_else(|| z0.clone());
        let g = self.value(&z)?;
        if g.is_finite() {
            return Ok((z, g));
        }
        let mut rng = StdRng::seed_from_u64(options.perturbation_seed);
        for attempt in 1..=options.max_perturbations {
            let scale = 0.5 * attempt as f64;
            let offset: Array1<f64> = (0..z.len())
                .map(|_| {
                    let e: f64 = StandardNormal.sample(&mut rng);
                    scale * e
                })
                .collect();
            if let Some(candidate) = on_sphere(&z + &offset, beta) {
                let g = self.value(&candidate)?;
                if g.is_finite() {
                    debug!(limit_state = self.limit_state, attempt, "perturbed undefined FORM start");
                    return Ok((candidate, g));
                }
            }
        }
        Err(ReliabilityError::UndefinedStart {
            limit_state: self.limit_state.to_string(),
            attempts: options.max_perturbations,
        })
    }

    fn iterate(
        &self, z0: &Array1<f64>, beta: f64, options: &FormOptions,
    ) -> ReliabilityResult<Iterate> {
        let (mut z, mut g) = self.defined_start(z0, beta, options)?;
        let mut residual = f64::INFINITY;
        for iteration in 1..=options.max_iter {
            let grad = self.gradient(&z, g)?;
            let norm = l2(&grad);
            if norm == 0.0 {
                return Ok(Iterate { z, g, iterations: iteration });
            }
            let target = &grad * (-beta / norm);
            residual = l2(&(&z - &target)) / beta;
            if residual <= options.tol_kkt {
                return Ok(Iterate { z, g, iterations: iteration });
            }

            let mut step = 1.0;
            let mut accepted = None;
            for _ in 0..=options.max_halvings {
                if let Some(candidate) = on_sphere(&z * (1.0 - step) + &target * step, beta) {
                    let gc = self.value(&candidate)?;
                    if gc.is_finite() && gc <= g {
                        accepted = Some((candidate, gc));
                        break;
                    }
                }
                step *= 0.5;
            }
            let Some((candidate, gc)) = accepted else {
                if residual <= STALL_RESIDUAL {
                    return Ok(Iterate { z, g, iterations: iteration });
                }
                return Err(self.non_convergence(iteration, &z, g, residual, "arc search found no descent"));
            };

            let dz = l2(&(&candidate - &z)) / beta;
            let dg = (gc - g).abs() / (1.0 + g.abs());
            trace!(limit_state = self.limit_state, iteration, g = gc, step, residual, "FORM/PMA step");
            z = candidate;
            g = gc;
            if step == 1.0 && dz <= options.tol_z && dg <= options.tol_g {
                return Ok(Iterate { z, g, iterations: iteration });
            }
        }
        Err(self.non_convergence(options.max_iter, &z, g, residual, "iteration cap reached"))
    }

    fn non_convergence(
        &self, iterations: usize, z: &Array1<f64>, g: f64, residual: f64, reason: &'static str,
    ) -> ReliabilityError {
        ReliabilityError::NonConvergence {
            limit_state: self.limit_state.to_string(),
            iterations,
            last_z: z.to_vec(),
            last_g: g,
            residual,
            reason,
        }
    }
}

fn l2(v: &Array1<f64>) -> f64 {
    v.dot(v).sqrt()
}

/// Scale `v` to norm `beta`; `None` for a zero or non-finite vector.
fn on_sphere(v: Array1<f64>, beta: f64) -> Option<Array1<f64>> {
    let norm = l2(&v);
    if norm.is_finite() && norm > 1e-12 {
        Some(v * (beta / norm))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{builder::ModelBuilder, marginals::Marginal, variables::Sensitivity};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    // Scope
    // -----
    // Exactness on linear limit states, β-monotonicity, repeatability,
    // undefined regions, start sensitivity and non-convergence reporting.

    fn beta(b: f64) -> ReliabilityTarget {
        ReliabilityTarget::from_beta(b).unwrap()
    }

    /// g = 4 + 2 x1 − x2 + 0.5 x3 with independent normals.
    fn linear_model() -> Model {
        ModelBuilder::new("linear")
            .random("x1", Marginal::normal(1.0, 0.5).unwrap(), Sensitivity::Increases)
            .unwrap()
            .random("x2", Marginal::normal(2.0, 1.0).unwrap(), Sensitivity::Decreases)
            .unwrap()
            .random("x3", Marginal::normal(-1.0, 2.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .function("g", &["x1", "x2", "x3"], &["g"], |v| {
                vec![4.0 + 2.0 * v[0] - v[1] + 0.5 * v[2]]
            })
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // FORM/PMA is exact for a limit state linear in standard-normal space.
    //
    // Given
    // -----
    // - g(z) = 3.5 + z1 − z2 + z3 (after the affine normal maps), β = 2.
    //
    // Expect
    // ------
    // - g* = 3.5 − 2√3 and z* = −2 (1, −1, 1) / √3.
    fn linear_limit_state_is_exact() {
        // Arrange
        let model = linear_model();
        let det = Array1::zeros(0);

        // Act
        let out = form_pma(&model, "g", &det, beta(2.0), &FormOptions::default()).unwrap();

        // Assert
        let s3 = 3f64.sqrt();
        assert_abs_diff_eq!(out.g_star, 3.5 - 2.0 * s3, epsilon = 1e-8);
        for (got, want) in out.design_point.iter().zip([-2.0 / s3, 2.0 / s3, -2.0 / s3]) {
            assert_abs_diff_eq!(*got, want, epsilon = 1e-6);
        }
        assert_abs_diff_eq!(out.physical_point[0], 1.0 + 0.5 * (-2.0 / s3), epsilon = 1e-6);
        assert!(!out.start_sensitive);
        assert!(out.satisfied());
    }

    #[test]
    // Purpose
    // -------
    // The copula enters through `w = L z`: for correlated normals the
    // linear result is `g(μ) − β sqrt(aᵀ R a)`.
    //
    // Given
    // -----
    // - x1, x2 ~ N(0, 1) with ρ = 0.5, g = 5 − x1 − x2, all tags Unknown
    //   (mean-value start).
    //
    // Expect
    // ------
    // - g* = 5 − 3 √3 at β = 3.
    fn correlated_linear_limit_state_uses_copula() {
        // Arrange
        let model = ModelBuilder::new("corr")
            .random("x1", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .random("x2", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .gaussian_copula(&["x1", "x2"], array![[1.0, 0.5], [0.5, 1.0]])
            .unwrap()
            .function("g", &["x1", "x2"], &["g"], |v| vec![5.0 - v[0] - v[1]])
            .unwrap()
            .build()
            .unwrap();

        // Act
        let out =
            form_pma(&model, "g", &Array1::zeros(0), beta(3.0), &FormOptions::default()).unwrap();

        // Assert
        assert_abs_diff_eq!(out.g_star, 5.0 - 3.0 * 3f64.sqrt(), epsilon = 1e-8);
        assert_abs_diff_eq!(out.physical_point[0], out.physical_point[1], epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // A tighter target never raises g*, and repeated solves agree.
    fn g_star_decreases_with_beta_and_repeats() {
        // Arrange
        let model = crate::model::library::cantilever_beam().unwrap();
        let det = array![3.0, 3.0];
        let opts = FormOptions::default();

        // Act
        let values: Vec<f64> = [1.0, 2.0, 3.0]
            .iter()
            .map(|&b| form_pma(&model, "g_stress", &det, beta(b), &opts).unwrap().g_star)
            .collect();
        let again = form_pma(&model, "g_stress", &det, beta(3.0), &opts).unwrap().g_star;

        // Assert
        assert!(values[0] > values[1] && values[1] > values[2]);
        assert_abs_diff_eq!(again, values[2], epsilon = 1e-12);
    }

    #[test]
    // Purpose
    // -------
    // An undefined start is perturbed instead of aborting the solve.
    //
    // Given
    // -----
    // - g = 10 − x1 − x2, undefined for x1 < −2; x1 is tagged Increases so
    //   the default start (z1 = −3) lands in the undefined region.
    //
    // Expect
    // ------
    // - g* = 10 − 3√2 at the defined optimum.
    fn undefined_start_is_perturbed() {
        // Arrange
        let model = ModelBuilder::new("holes")
            .random("x1", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .random("x2", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .function("g", &["x1", "x2"], &["g"], |v| {
                vec![if v[0] < -2.0 { f64::NAN } else { 10.0 - v[0] - v[1] }]
            })
            .unwrap()
            .build()
            .unwrap();
        let opts = FormOptions { check_alternate_start: false, ..FormOptions::default() };

        // Act
        let out = form_pma(&model, "g", &Array1::zeros(0), beta(3.0), &opts).unwrap();

        // Assert
        assert_abs_diff_eq!(out.g_star, 10.0 - 3.0 * 2f64.sqrt(), epsilon = 1e-7);
    }

    #[test]
    // Purpose
    // -------
    // Two local minima on the sphere: the alternate start flags the result and the
    // smaller value is kept.
    //
    // Given
    // -----
    // - One N(0, 1) variable tagged Increases, g = 5 − x² − 0.5 x, β = 3:
    //   g(−3) = −2.5 from the tagged start, g(3) = −5.5 from the mean-value
    //   start.
    //
    // Expect
    // ------
    // - `start_sensitive` and g* = −5.5.
    fn start_sensitivity_is_flagged() {
        // Arrange
        let model = ModelBuilder::new("bimodal")
            .random("x", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .function("g", &["x"], &["g"], |v| vec![5.0 - v[0] * v[0] - 0.5 * v[0]])
            .unwrap()
            .build()
            .unwrap();

        // Act
        let out =
            form_pma(&model, "g", &Array1::zeros(0), beta(3.0), &FormOptions::default()).unwrap();

        // Assert
        assert!(out.start_sensitive);
        assert_abs_diff_eq!(out.g_star, -5.5, epsilon = 1e-9);
    }

    #[test]
    // Purpose
    // -------
    // Hitting the iteration cap is an error carrying the last iterate, and
    // an unknown output is a model error.
    fn non_convergence_is_reported() {
        // Arrange
        let model = crate::model::library::cantilever_beam().unwrap();
        let det = array![3.0, 3.0];
        let opts = FormOptions { max_iter: 1, check_alternate_start: false, ..FormOptions::default() };

        // Act
        let err = form_pma(&model, "g_disp", &det, beta(3.0), &opts).unwrap_err();
        let unknown = form_pma(&model, "nope", &det, beta(3.0), &opts).unwrap_err();

        // Assert
        match err {
            ReliabilityError::NonConvergence { iterations, last_z, last_g, .. } => {
                assert_eq!(iterations, 1);
                assert_eq!(last_z.len(), 3);
                assert!(last_g.is_finite());
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(unknown, ReliabilityError::Model(ModelError::UnknownOutput { .. })));
    }

    #[test]
    // Purpose
    // -------
    // A warm start from the converged design point reproduces g* in fewer
    // iterations.
    fn warm_start_reuses_design_point() {
        let model = crate::model::library::cantilever_beam().unwrap();
        let det = array![3.0, 3.0];
        let opts = FormOptions::default();
        let cold = form_pma(&model, "g_disp", &det, beta(3.0), &opts).unwrap();
        let warm =
            form_pma_from(&model, "g_disp", &det, beta(3.0), &opts, &cold.design_point).unwrap();
        assert_abs_diff_eq!(warm.g_star, cold.g_star, epsilon = 1e-9);
        assert!(warm.iterations <= cold.iterations);
    }
}
