//! Monte Carlo verification of failure probabilities.
//!
//! Draws seeded samples of every random variable through the model's
//! transform (so copula blocks are respected), evaluates the limit states
//! once per sample and counts `g ≤ 0`. Undefined values count as failures
//! and are tallied separately.
//!
//! Samples stream from one seeded generator in batches of [`BATCH_SIZE`]
//! rows, and per-batch counts combine with [`FailureRate::merge`]. Memory
//! stays bounded for any `n` up to [`MAX_SAMPLE_SIZE`], and each row only
//! runs the functions the requested limit states depend on.
use crate::{
    model::model::Model,
    reliability::{
        errors::{ReliabilityError, ReliabilityResult},
        target::{ReliabilityTarget, MAX_SAMPLE_SIZE},
    },
};
use ndarray::Array1;
use rand::{rngs::StdRng, SeedableRng};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Rows drawn and evaluated per batch.
pub const BATCH_SIZE: usize = 8192;

/// Empirical failure rate of one limit state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FailureRate {
    /// Samples with `g ≤ 0` or `g` undefined.
    pub failures: usize,
    /// Samples where `g` was undefined.
    pub undefined: usize,
    pub n: usize,
    pub fraction: f64,
    /// Binomial standard error `sqrt(p (1 − p) / n)`.
    pub std_error: f64,
}

impl FailureRate {
    pub fn from_counts(failures: usize, undefined: usize, n: usize) -> Self {
        let (fraction, std_error) = if n == 0 {
            (f64::NAN, f64::NAN)
        } else {
            let p = failures as f64 / n as f64;
            (p, (p * (1.0 - p) / n as f64).sqrt())
        };
        Self { failures, undefined, n, fraction, std_error }
    }

    /// Pool two independent batches.
    pub fn merge(&self, other: &FailureRate) -> FailureRate {
        Self::from_counts(
            self.failures + other.failures,
            self.undefined + other.undefined,
            self.n + other.n,
        )
    }
}

/// Failure rates by limit-state name.
pub type MonteCarloEstimate = BTreeMap<String, FailureRate>;

/// `⌈10 / F⌉`, the smallest sample size giving a usable estimate of the
/// target failure probability `F`.
///
/// # Errors
/// [`ReliabilityError::SampleSizeTooLarge`] when the size is non-finite or
/// above [`MAX_SAMPLE_SIZE`].
pub fn recommended_sample_size(target: ReliabilityTarget) -> ReliabilityResult<usize> {
    target.recommended_sample_size()
}

/// Estimate `P[g_i ≤ 0]` for each limit state at design `det`.
///
/// The draws do not depend on the batch size: the result equals counting
/// over `model.sample(n, seed)` in one pass.
///
/// # Errors
/// - [`ReliabilityError::InvalidSampleSize`] if `n == 0`.
/// - [`ReliabilityError::SampleSizeTooLarge`] if `n > MAX_SAMPLE_SIZE`.
/// - [`ReliabilityError::EmptyLimitStates`] for an empty list.
/// - [`ReliabilityError::Model`] for unknown outputs, a malformed `det`, or
///   a sample the transform cannot map.
pub fn monte_carlo_failure_rate(
    model: &Model, det: &Array1<f64>, limit_states: &[&str], n: usize, seed: u64,
) -> ReliabilityResult<MonteCarloEstimate> {
    if n == 0 {
        return Err(ReliabilityError::InvalidSampleSize { n });
    }
    if n > MAX_SAMPLE_SIZE {
        return Err(ReliabilityError::SampleSizeTooLarge {
            required: n as f64,
            cap: MAX_SAMPLE_SIZE,
        });
    }
    if limit_states.is_empty() {
        return Err(ReliabilityError::EmptyLimitStates);
    }
    let selection = model.select_outputs(limit_states)?;

    let mut rng = StdRng::seed_from_u64(seed);
    let mut rates = vec![FailureRate::from_counts(0, 0, 0); limit_states.len()];
    let mut remaining = n;
    while remaining > 0 {
        let rows = remaining.min(BATCH_SIZE);
        let samples = model.sample_with(&mut rng, rows)?;
        let mut failures = vec![0usize; limit_states.len()];
        let mut undefined = vec![0usize; limit_states.len()];
        for row in samples.rows() {
            let values = model.evaluate_selection(&selection, det, &row.to_owned())?;
            for (i, g) in values.into_iter().enumerate() {
                if !g.is_finite() {
                    undefined[i] += 1;
                    failures[i] += 1;
                } else if g <= 0.0 {
                    failures[i] += 1;
                }
            }
        }
        for (i, rate) in rates.iter_mut().enumerate() {
            *rate = rate.merge(&FailureRate::from_counts(failures[i], undefined[i], rows));
        }
        remaining -= rows;
    }

    let estimate: MonteCarloEstimate =
        limit_states.iter().map(|name| name.to_string()).zip(rates).collect();
    debug!(n, seed, functions = selection.n_functions(), ?estimate, "Monte Carlo failure rates");
    Ok(estimate)
}

/// Per-constraint Monte Carlo check of a design.
#[derive(Debug, Clone, PartialEq)]
pub struct VerificationReport {
    pub limit_state: String,
    pub target_pof: f64,
    pub rate: FailureRate,
}

impl VerificationReport {
    /// Empirical failure fraction does not exceed the target.
    pub fn meets_target(&self) -> bool {
        self.rate.fraction <= self.target_pof
    }
}

/// Monte Carlo check of a design against per-limit-state targets.
///
/// `n = None` uses the largest recommended size over the targets. An
/// explicit `n` below that logs a warning, since the estimate of the
/// smallest target probability is then weak.
///
/// # Errors
/// - [`ReliabilityError::SampleSizeTooLarge`] when `n = None` and some
///   target needs more than [`MAX_SAMPLE_SIZE`] samples.
/// - As [`monte_carlo_failure_rate`].
pub fn verify_design(
    model: &Model, det: &Array1<f64>, constraints: &[(&str, ReliabilityTarget)],
    n: Option<usize>, seed: u64,
) -> ReliabilityResult<Vec<VerificationReport>> {
    let n = match n {
        Some(n) => {
            // An explicit size stands even when the recommendation is capped.
            let recommended = constraints
                .iter()
                .map(|(_, t)| recommended_sample_size(*t).unwrap_or(usize::MAX))
                .max()
                .unwrap_or(0);
            if n < recommended {
                warn!(n, recommended, "Monte Carlo sample size is below 10 / F");
            }
            n
        }
        None => constraints
            .iter()
            .map(|(_, t)| recommended_sample_size(*t))
            .collect::<ReliabilityResult<Vec<usize>>>()?
            .into_iter()
            .max()
            .unwrap_or(0),
    };
    let names: Vec<&str> = constraints.iter().map(|(name, _)| *name).collect();
    let mut estimate = monte_carlo_failure_rate(model, det, &names, n, seed)?;
    Ok(constraints
        .iter()
        .filter_map(|(name, target)| {
            estimate.remove(*name).map(|rate| VerificationReport {
                limit_state: name.to_string(),
                target_pof: target.pof(),
                rate,
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{builder::ModelBuilder, marginals::Marginal, variables::Sensitivity};
    use approx::assert_abs_diff_eq;

    // Scope
    // -----
    // Counting rules, batch merging, streaming across batch boundaries,
    // the sample-size cap, reproducibility and input validation.

    /// g = x − 1 with x ~ N(0, 1), so P[g ≤ 0] = Φ(1) ≈ 0.8413; `h` is
    /// undefined for x > 2.
    fn toy_model() -> Model {
        ModelBuilder::new("toy")
            .random("x", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .function("f", &["x"], &["g", "h"], |v| {
                vec![v[0] - 1.0, if v[0] > 2.0 { f64::NAN } else { 1.0 }]
            })
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Fractions match the exact probabilities within a few standard errors,
    // undefined values count as failures, and the same seed repeats.
    //
    // Given
    // -----
    // - 40_000 samples of the toy model.
    //
    // Expect
    // ------
    // - g: fraction ≈ 0.8413; h: failures = undefined ≈ 0.0228 n.
    fn failure_rates_match_exact_probabilities() {
        // Arrange
        let model = toy_model();
        let det = Array1::zeros(0);

        // Act
        let est = monte_carlo_failure_rate(&model, &det, &["g", "h"], 40_000, 11).unwrap();
        let again = monte_carlo_failure_rate(&model, &det, &["g", "h"], 40_000, 11).unwrap();

        // Assert
        let g = est["g"];
        assert_abs_diff_eq!(g.fraction, 0.841_344_746, epsilon = 4.0 * g.std_error);
        let h = est["h"];
        assert_eq!(h.failures, h.undefined);
        assert_abs_diff_eq!(h.fraction, 0.022_750_132, epsilon = 4.0 * h.std_error);
        assert_eq!(est, again);
    }

    #[test]
    // Purpose
    // -------
    // Merging pools counts and recomputes the fraction.
    fn merge_pools_batches() {
        let a = FailureRate::from_counts(3, 1, 1000);
        let b = FailureRate::from_counts(5, 0, 3000);
        let m = a.merge(&b);
        assert_eq!((m.failures, m.undefined, m.n), (8, 1, 4000));
        assert_abs_diff_eq!(m.fraction, 0.002, epsilon = 1e-15);
    }

    #[test]
    // Purpose
    // -------
    // Empty requests and unknown outputs are errors, not empty maps.
    fn monte_carlo_validates_inputs() {
        let model = toy_model();
        let det = Array1::zeros(0);
        assert_eq!(
            monte_carlo_failure_rate(&model, &det, &["g"], 0, 1),
            Err(ReliabilityError::InvalidSampleSize { n: 0 })
        );
        assert_eq!(
            monte_carlo_failure_rate(&model, &det, &[], 10, 1),
            Err(ReliabilityError::EmptyLimitStates)
        );
        assert!(matches!(
            monte_carlo_failure_rate(&model, &det, &["zz"], 10, 1),
            Err(ReliabilityError::Model(_))
        ));
    }

    #[test]
    // Purpose
    // -------
    // Without an explicit size the verifier uses ⌈10 / F⌉ for the tightest
    // target.
    fn verify_design_uses_recommended_size() {
        let model = toy_model();
        let t = ReliabilityTarget::from_pof(0.01).unwrap();
        let reports = verify_design(&model, &Array1::zeros(0), &[("g", t)], None, 3).unwrap();
        assert_eq!(reports.len(), 1);
        assert!((1000..=1001).contains(&reports[0].rate.n));
        assert!(!reports[0].meets_target());
    }

    #[test]
    // Purpose
    // -------
    // Streaming in batches counts exactly what a single pass over the same
    // draws counts.
    //
    // Given
    // -----
    // - n = 2 · BATCH_SIZE + 37 samples of the toy model, seed 21.
    //
    // Expect
    // ------
    // - Failure and undefined counts equal a manual count over
    //   `model.sample(n, 21)`.
    fn batched_counts_match_a_single_pass() {
        // Arrange
        let model = toy_model();
        let det = Array1::zeros(0);
        let n = 2 * BATCH_SIZE + 37;

        // Act
        let est = monte_carlo_failure_rate(&model, &det, &["g", "h"], n, 21).unwrap();
        let samples = model.sample(n, 21).unwrap();

        // Assert
        let x = samples.column(0);
        let g_failures = x.iter().filter(|&&v| v - 1.0 <= 0.0).count();
        let h_undefined = x.iter().filter(|&&v| v > 2.0).count();
        assert_eq!(est["g"].n, n);
        assert_eq!(est["g"].failures, g_failures);
        assert_eq!((est["h"].failures, est["h"].undefined), (h_undefined, h_undefined));
    }

    #[test]
    // Purpose
    // -------
    // Targets whose recommended size cannot be represented are reported as
    // errors rather than attempted.
    //
    // Given
    // -----
    // - β = 40, where F = Φ(−40) underflows to zero; and an explicit
    //   n above the cap.
    //
    // Expect
    // ------
    // - `verify_design(.., None, ..)` and the explicit request both return
    //   `SampleSizeTooLarge`; an explicit small n still runs.
    fn verify_design_rejects_unreachable_sample_sizes() {
        // Arrange
        let model = toy_model();
        let det = Array1::zeros(0);
        let extreme = ReliabilityTarget::from_beta(40.0).unwrap();

        // Act
        let by_target = verify_design(&model, &det, &[("g", extreme)], None, 1);
        let explicit = monte_carlo_failure_rate(&model, &det, &["g"], MAX_SAMPLE_SIZE + 1, 1);
        let small = verify_design(&model, &det, &[("g", extreme)], Some(100), 1).unwrap();

        // Assert
        assert!(matches!(by_target, Err(ReliabilityError::SampleSizeTooLarge { .. })));
        assert!(matches!(
            explicit,
            Err(ReliabilityError::SampleSizeTooLarge { cap: MAX_SAMPLE_SIZE, .. })
        ));
        assert_eq!(small[0].rate.n, 100);
    }
}
