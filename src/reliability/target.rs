//! Reliability targets: index β and failure probability `F = Φ(−β)`.
use crate::{
    model::marginals::{std_normal_cdf, std_normal_quantile},
    reliability::errors::{ReliabilityError, ReliabilityResult},
};

/// Largest Monte Carlo sample size accepted anywhere in the crate.
///
/// `⌈10 / F⌉` passes it near β ≈ 5.9 (F ≈ 1e-8).
pub const MAX_SAMPLE_SIZE: usize = 1_000_000_000;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReliabilityTarget {
    beta: f64,
}

impl ReliabilityTarget {
    /// # Errors
    /// [`ReliabilityError::InvalidBeta`] unless `beta` is finite and positive.
    pub fn from_beta(beta: f64) -> ReliabilityResult<Self> {
        if !beta.is_finite() || beta <= 0.0 {
            return Err(ReliabilityError::InvalidBeta { value: beta });
        }
        Ok(Self { beta })
    }

    /// Target from a failure probability `F`, so `β = −Φ⁻¹(F)`.
    ///
    /// # Errors
    /// [`ReliabilityError::InvalidPof`] unless `0 < F < 0.5`.
    pub fn from_pof(pof: f64) -> ReliabilityResult<Self> {
        if !(pof > 0.0 && pof < 0.5) {
            return Err(ReliabilityError::InvalidPof { value: pof });
        }
        let beta = -std_normal_quantile(pof).map_err(|_| ReliabilityError::InvalidPof { value: pof })?;
        Self::from_beta(beta)
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn pof(&self) -> f64 {
        std_normal_cdf(-self.beta)
    }

    /// Monte Carlo sample size `⌈10 / F⌉` for a usable estimate of `F`.
    ///
    /// # Errors
    /// [`ReliabilityError::SampleSizeTooLarge`] when `10 / F` is non-finite
    /// (`F` underflows for β beyond about 38) or above [`MAX_SAMPLE_SIZE`].
    pub fn recommended_sample_size(&self) -> ReliabilityResult<usize> {
        let required = (10.0 / self.pof()).ceil();
        if !required.is_finite() || required > MAX_SAMPLE_SIZE as f64 {
            return Err(ReliabilityError::SampleSizeTooLarge { required, cap: MAX_SAMPLE_SIZE });
        }
        Ok(required as usize)
    }
}
