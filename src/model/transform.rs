//! Isoprobabilistic transform and seeded sampling.
//!
//! For each copula block `w_B = L_B z_B`; for random variables outside every
//! block `w_j = z_j`. Physical values follow from `x_j = F_j⁻¹(Φ(w_j))`.
//! The forward map inverts both steps.
//!
//! Sampling draws `z` (plain Monte Carlo or Latin hypercube) and pushes each
//! row through the inverse map, so copula blocks hold for both designs.
use crate::model::{
    errors::{ModelError, ModelResult},
    marginals::std_normal_quantile,
    model::{check_vector, Evaluation, Model},
};
use ndarray::{Array1, Array2};
use rand::{distributions::Open01, rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rand_distr::{Distribution, StandardNormal};

/// Largest double below one; keeps LHS stratum probabilities open at 1.
const ONE_BELOW: f64 = 1.0 - f64::EPSILON / 2.0;

impl Model {
    /// Standard-normal vector `z` to physical random values.
    ///
    /// # Errors
    /// - [`ModelError::DimensionMismatch`] / [`ModelError::NonFiniteInput`]
    ///   for a malformed `z`.
    /// - [`ModelError::TransformOutOfDomain`] where a marginal cannot map
    ///   the correlated coordinate.
    pub fn inverse_transform(&self, z: &Array1<f64>) -> ModelResult<Array1<f64>> {
        check_vector("standard-normal vector", z, self.rand.len())?;
        let mut w = z.clone();
        for (copula, members) in self.copulas.iter().zip(&self.copula_members) {
            let block: Vec<f64> = members.iter().map(|&j| z[j]).collect();
            for (&j, wj) in members.iter().zip(copula.correlate(&block)) {
                w[j] = wj;
            }
        }
        self.rand
            .iter()
            .zip(w.iter())
            .map(|(r, &wj)| r.marginal().from_std_normal(r.name(), wj))
            .collect()
    }

    /// Physical random values to the standard-normal vector `z`.
    ///
    /// # Errors
    /// - [`ModelError::DimensionMismatch`] / [`ModelError::NonFiniteInput`]
    ///   for a malformed `x`.
    /// - [`ModelError::TransformOutOfDomain`] for values outside a support.
    pub fn forward_transform(&self, x: &Array1<f64>) -> ModelResult<Array1<f64>> {
        check_vector("random values", x, self.rand.len())?;
        let mut z = self
            .rand
            .iter()
            .zip(x.iter())
            .map(|(r, &xj)| r.marginal().to_std_normal(r.name(), xj))
            .collect::<ModelResult<Array1<f64>>>()?;
        for (copula, members) in self.copulas.iter().zip(&self.copula_members) {
            let block: Vec<f64> = members.iter().map(|&j| z[j]).collect();
            for (&j, zj) in members.iter().zip(copula.decorrelate(&block)) {
                z[j] = zj;
            }
        }
        Ok(z)
    }

    /// Lift a standard-normal vector on `support` (random-variable indices,
    /// closed under copula blocks) to physical values, with every other
    /// random variable at its median.
    ///
    /// # Errors
    /// - [`ModelError::DimensionMismatch`] if `z_sub` and `support` differ
    ///   in length.
    /// - Errors of [`Model::inverse_transform`].
    pub fn inverse_transform_on(
        &self, support: &[usize], z_sub: &Array1<f64>,
    ) -> ModelResult<Array1<f64>> {
        if z_sub.len() != support.len() {
            return Err(ModelError::DimensionMismatch {
                what: "support coordinates",
                expected: support.len(),
                found: z_sub.len(),
            });
        }
        let mut z = Array1::zeros(self.rand.len());
        for (&j, &v) in support.iter().zip(z_sub.iter()) {
            z[j] = v;
        }
        self.inverse_transform(&z)
    }

    /// Draw `n` physical random vectors (one per row), respecting the
    /// copula blocks. The same seed always yields the same samples.
    ///
    /// # Errors
    /// [`ModelError::TransformOutOfDomain`] if a draw cannot be mapped
    /// (only possible for extreme tails of bounded-support marginals).
    pub fn sample(&self, n: usize, seed: u64) -> ModelResult<Array2<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample_with(&mut rng, n)
    }

    /// Draw `n` rows from a caller-held generator. Consecutive calls continue
    /// the stream, so batches of sizes `a` then `b` equal one draw of `a + b`.
    ///
    /// # Errors
    /// As [`Model::sample`].
    pub fn sample_with<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> ModelResult<Array2<f64>> {
        let mut out = Array2::zeros((n, self.rand.len()));
        for mut row in out.rows_mut() {
            let z: Array1<f64> =
                (0..self.rand.len()).map(|_| -> f64 { StandardNormal.sample(rng) }).collect();
            row.assign(&self.inverse_transform(&z)?);
        }
        Ok(out)
    }

    /// Latin hypercube sample of `n` physical random vectors.
    ///
    /// Each standard-normal coordinate is stratified into `n` equal-probability
    /// bins, one draw per bin, with bins shuffled independently per column.
    /// Columns are independent in `z`; copula blocks apply afterwards.
    ///
    /// # Errors
    /// As [`Model::sample`].
    pub fn sample_lhs(&self, n: usize, seed: u64) -> ModelResult<Array2<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        let k = self.rand.len();
        let mut z = Array2::<f64>::zeros((n, k));
        let mut strata: Vec<usize> = (0..n).collect();
        for j in 0..k {
            strata.shuffle(&mut rng);
            for (i, &bin) in strata.iter().enumerate() {
                let u: f64 = rng.sample(Open01);
                let p = ((bin as f64 + u) / n as f64).min(ONE_BELOW);
                z[[i, j]] = std_normal_quantile(p)?;
            }
        }
        let mut out = Array2::zeros((n, k));
        for (mut row, z_row) in out.rows_mut().into_iter().zip(z.rows()) {
            row.assign(&self.inverse_transform(&z_row.to_owned())?);
        }
        Ok(out)
    }

    /// Evaluate every output at design `det` for each sampled row.
    ///
    /// # Errors
    /// Errors of [`Model::evaluate`], for the first failing row.
    pub fn eval_samples(
        &self, det: &Array1<f64>, samples: &Array2<f64>,
    ) -> ModelResult<Vec<Evaluation>> {
        samples.rows().into_iter().map(|row| self.evaluate(det, &row.to_owned())).collect()
    }

    /// eval_lhs — Latin hypercube sample at `det` with its evaluations.
    ///
    /// # Errors
    /// Errors of [`Model::sample_lhs`] and [`Model::eval_samples`].
    pub fn eval_lhs(
        &self, det: &Array1<f64>, n: usize, seed: u64,
    ) -> ModelResult<(Array2<f64>, Vec<Evaluation>)> {
        let samples = self.sample_lhs(n, seed)?;
        let evaluations = self.eval_samples(det, &samples)?;
        Ok((samples, evaluations))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::{
        builder::ModelBuilder, errors::ModelError, marginals::Marginal, model::Model,
        variables::Sensitivity,
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};
    use rand::{rngs::StdRng, SeedableRng};

    // Scope
    // -----
    // Round trips through the transform with and without a copula block,
    // sampling statistics, batched draws and Latin hypercube strata.

    fn correlated_model() -> Model {
        ModelBuilder::new("corr")
            .random("a", Marginal::normal(10.0, 2.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .random("b", Marginal::lognormal(0.0, 0.5).unwrap(), Sensitivity::Decreases)
            .unwrap()
            .random("c", Marginal::weibull(2.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .gaussian_copula(&["c", "a"], array![[1.0, 0.6], [0.6, 1.0]])
            .unwrap()
            .function("f", &["a", "b", "c"], &["s"], |v| vec![v[0] + v[1] + v[2]])
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // `forward_transform(inverse_transform(z)) ≈ z`, including for a
    // correlated block listed out of declaration order.
    //
    // Given
    // -----
    // - Normal, lognormal and Weibull marginals; (c, a) correlated at 0.6.
    //
    // Expect
    // ------
    // - Round trip within 1e-8 and the independent `b` mapped componentwise.
    fn transform_round_trips_with_copula() {
        // Arrange
        let model = correlated_model();
        let z = array![-1.2, 0.8, 2.1];

        // Act
        let x = model.inverse_transform(&z).unwrap();
        let back = model.forward_transform(&x).unwrap();

        // Assert
        for i in 0..3 {
            assert_abs_diff_eq!(back[i], z[i], epsilon = 1e-8);
        }
        assert_abs_diff_eq!(x[1], (0.5f64 * 0.8).exp(), epsilon = 1e-12);
        // `c` leads the block, so it maps from z_c alone.
        let c_direct = Marginal::weibull(2.0, 1.0).unwrap().from_std_normal("c", 2.1).unwrap();
        assert_abs_diff_eq!(x[2], c_direct, epsilon = 1e-10);
    }

    #[test]
    // Purpose
    // -------
    // Samples are reproducible per seed and carry the block correlation.
    //
    // Given
    // -----
    // - 20_000 draws with seed 7, twice.
    //
    // Expect
    // ------
    // - Identical matrices; mean of `a` ≈ 10; correlation of the normal
    //   scores of (a, c) ≈ 0.6.
    fn sample_is_seeded_and_correlated() {
        // Arrange
        let model = correlated_model();

        // Act
        let s1 = model.sample(20_000, 7).unwrap();
        let s2 = model.sample(20_000, 7).unwrap();
        let mean = s1.mean_axis(Axis(0)).unwrap();
        let scores: Vec<(f64, f64)> = s1
            .rows()
            .into_iter()
            .map(|row| {
                let z = model.forward_transform(&row.to_owned()).unwrap();
                // Block order is (c, a): w_a = 0.6 z_c + 0.8 z_a, w_c = z_c.
                (z[0] * 0.8 + z[2] * 0.6, z[2])
            })
            .collect();
        let n = scores.len() as f64;
        let rho = scores.iter().map(|(a, c)| a * c).sum::<f64>() / n;

        // Assert
        assert_eq!(s1, s2);
        assert_abs_diff_eq!(mean[0], 10.0, epsilon = 0.06);
        assert_abs_diff_eq!(rho, 0.6, epsilon = 0.03);
    }

    #[test]
    // Purpose
    // -------
    // Malformed vectors are rejected before any marginal is touched.
    fn transforms_validate_length_and_finiteness() {
        let model = correlated_model();
        assert!(matches!(
            model.inverse_transform(&array![0.0, 0.0]),
            Err(ModelError::DimensionMismatch { expected: 3, found: 2, .. })
        ));
        assert!(matches!(
            model.forward_transform(&array![1.0, f64::NAN, 1.0]),
            Err(ModelError::NonFiniteInput { index: 1, .. })
        ));
        assert!(matches!(
            model.forward_transform(&array![10.0, -1.0, 1.0]),
            Err(ModelError::TransformOutOfDomain { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Drawing in batches from one generator reproduces a single draw.
    //
    // Given
    // -----
    // - Seed 5; batches of 300 and 700 rows versus one draw of 1000.
    //
    // Expect
    // ------
    // - The stacked batches equal the single draw row for row.
    fn batched_draws_continue_the_stream() {
        // Arrange
        let model = correlated_model();
        let mut rng = StdRng::seed_from_u64(5);

        // Act
        let first = model.sample_with(&mut rng, 300).unwrap();
        let second = model.sample_with(&mut rng, 700).unwrap();
        let whole = model.sample(1000, 5).unwrap();

        // Assert
        let stacked = ndarray::concatenate(Axis(0), &[first.view(), second.view()]).unwrap();
        assert_eq!(stacked, whole);
    }

    #[test]
    // Purpose
    // -------
    // Latin hypercube samples put exactly one draw in each probability bin
    // of every column and repeat per seed.
    //
    // Given
    // -----
    // - Two independent uniforms on (0, 1) plus a normal; n = 64, seed 9.
    //
    // Expect
    // ------
    // - ⌊64 u⌋ over each uniform column is a permutation of 0..64.
    // - Same seed gives the same matrix; another seed does not.
    // - `eval_lhs` returns one evaluation per row.
    fn lhs_fills_every_stratum() {
        // Arrange
        let model = ModelBuilder::new("lhs")
            .random("u", Marginal::uniform(0.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .random("v", Marginal::uniform(0.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .random("y", Marginal::normal(0.0, 1.0).unwrap(), Sensitivity::Unknown)
            .unwrap()
            .function("f", &["u", "v", "y"], &["s"], |v| vec![v[0] + v[1] + v[2]])
            .unwrap()
            .build()
            .unwrap();
        let n = 64;

        // Act
        let samples = model.sample_lhs(n, 9).unwrap();
        let again = model.sample_lhs(n, 9).unwrap();
        let other = model.sample_lhs(n, 10).unwrap();
        let (_, evaluations) = model.eval_lhs(&ndarray::Array1::zeros(0), n, 9).unwrap();

        // Assert
        for j in 0..2 {
            let mut bins: Vec<usize> =
                samples.column(j).iter().map(|&u| (u * n as f64).floor() as usize).collect();
            bins.sort_unstable();
            assert_eq!(bins, (0..n).collect::<Vec<_>>());
        }
        assert_eq!(samples, again);
        assert_ne!(samples, other);
        assert_eq!(evaluations.len(), n);
        assert_abs_diff_eq!(evaluations[0]["s"], samples.row(0).sum(), epsilon = 1e-12);
    }
}
