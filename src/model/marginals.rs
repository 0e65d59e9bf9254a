//! Marginal distributions and their standard-normal maps.
//!
//! Every marginal `F` is tied to the standard normal through
//! `x = F⁻¹(Φ(w))` and `w = Φ⁻¹(F(x))`. Normal and lognormal marginals use
//! the exact affine / log-affine forms. Uniform, Weibull and exponential
//! marginals use closed-form quantiles driven by whichever tail `w` falls
//! in, with `Φ` from `erfc`.
//!
//! Parameters are validated once by the matching `statrs` constructor.
use crate::model::errors::{ModelError, ModelResult};
use statrs::{
    distribution::{ContinuousCDF, Exp, LogNormal, Normal, Uniform, Weibull},
    function::erf::{erfc, erfc_inv},
};
use std::f64::consts::{LN_2, SQRT_2};

/// Standard normal CDF `Φ(w)`.
pub fn std_normal_cdf(w: f64) -> f64 {
    0.5 * erfc(-w / SQRT_2)
}

/// Standard normal quantile `Φ⁻¹(p)` for `p ∈ (0, 1)`.
///
/// # Errors
/// [`ModelError::InvalidProbability`] outside the open unit interval.
pub fn std_normal_quantile(p: f64) -> ModelResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(ModelError::InvalidProbability { value: p });
    }
    Ok(-SQRT_2 * erfc_inv(2.0 * p))
}

/// A univariate continuous distribution.
///
/// Opaque: build through the validated constructors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marginal {
    kind: Kind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Kind {
    Normal { mean: f64, sd: f64 },
    /// `ln X ~ N(location, scale²)`.
    LogNormal { location: f64, scale: f64, dist: LogNormal },
    Uniform { lower: f64, upper: f64, dist: Uniform },
    Weibull { shape: f64, scale: f64, dist: Weibull },
    Exponential { rate: f64, dist: Exp },
}

impl Marginal {
    /// # Errors
    /// [`ModelError::InvalidMarginal`] unless `mean` is finite and `sd > 0`.
    pub fn normal(mean: f64, sd: f64) -> ModelResult<Self> {
        Normal::new(mean, sd)?;
        Ok(Self { kind: Kind::Normal { mean, sd } })
    }

    /// # Errors
    /// [`ModelError::InvalidMarginal`] unless `location` is finite and `scale > 0`.
    pub fn lognormal(location: f64, scale: f64) -> ModelResult<Self> {
        let dist = LogNormal::new(location, scale)?;
        Ok(Self { kind: Kind::LogNormal { location, scale, dist } })
    }

    /// # Errors
    /// [`ModelError::InvalidMarginal`] unless both bounds are finite and `lower < upper`.
    pub fn uniform(lower: f64, upper: f64) -> ModelResult<Self> {
        let dist = Uniform::new(lower, upper)?;
        Ok(Self { kind: Kind::Uniform { lower, upper, dist } })
    }

    /// # Errors
    /// [`ModelError::InvalidMarginal`] unless `shape > 0` and `scale > 0`.
    pub fn weibull(shape: f64, scale: f64) -> ModelResult<Self> {
        let dist = Weibull::new(shape, scale)?;
        Ok(Self { kind: Kind::Weibull { shape, scale, dist } })
    }

    /// # Errors
    /// [`ModelError::InvalidMarginal`] unless `rate > 0`.
    pub fn exponential(rate: f64) -> ModelResult<Self> {
        let dist = Exp::new(rate)?;
        Ok(Self { kind: Kind::Exponential { rate, dist } })
    }

    pub fn family(&self) -> &'static str {
        match self.kind {
            Kind::Normal { .. } => "normal",
            Kind::LogNormal { .. } => "lognormal",
            Kind::Uniform { .. } => "uniform",
            Kind::Weibull { .. } => "weibull",
            Kind::Exponential { .. } => "exponential",
        }
    }

    pub fn cdf(&self, x: f64) -> f64 {
        match self.kind {
            Kind::Normal { mean, sd } => std_normal_cdf((x - mean) / sd),
            Kind::LogNormal { dist, .. } => dist.cdf(x),
            Kind::Uniform { dist, .. } => dist.cdf(x),
            Kind::Weibull { dist, .. } => dist.cdf(x),
            Kind::Exponential { dist, .. } => dist.cdf(x),
        }
    }

    /// Quantile `F⁻¹(p)` for `p ∈ (0, 1)`.
    ///
    /// # Errors
    /// [`ModelError::InvalidProbability`] outside the open unit interval.
    pub fn quantile(&self, p: f64) -> ModelResult<f64> {
        if !(p > 0.0 && p < 1.0) {
            return Err(ModelError::InvalidProbability { value: p });
        }
        Ok(match self.kind {
            Kind::Normal { mean, sd } => mean + sd * std_normal_quantile(p)?,
            Kind::LogNormal { location, scale, .. } => {
                (location + scale * std_normal_quantile(p)?).exp()
            }
            Kind::Uniform { dist, .. } => dist.inverse_cdf(p),
            Kind::Weibull { dist, .. } => dist.inverse_cdf(p),
            Kind::Exponential { dist, .. } => dist.inverse_cdf(p),
        })
    }

    pub fn median(&self) -> f64 {
        match self.kind {
            Kind::Normal { mean, .. } => mean,
            Kind::LogNormal { location, .. } => location.exp(),
            Kind::Uniform { lower, upper, .. } => 0.5 * (lower + upper),
            Kind::Weibull { shape, scale, .. } => scale * LN_2.powf(1.0 / shape),
            Kind::Exponential { rate, .. } => LN_2 / rate,
        }
    }

    /// Closed support `(lower, upper)`; infinite ends are `±∞`.
    pub fn support(&self) -> (f64, f64) {
        match self.kind {
            Kind::Normal { .. } => (f64::NEG_INFINITY, f64::INFINITY),
            Kind::LogNormal { .. } | Kind::Weibull { .. } | Kind::Exponential { .. } => {
                (0.0, f64::INFINITY)
            }
            Kind::Uniform { lower, upper, .. } => (lower, upper),
        }
    }

    /// Physical value for the standard-normal coordinate `w`.
    ///
    /// Bounded and skewed families map the tail that `w` points into, so
    /// `w > 0` goes through the survival probability `Φ(−w)` and keeps its
    /// precision far beyond where `Φ(w)` rounds to one.
    ///
    /// # Errors
    /// [`ModelError::TransformOutOfDomain`] when `w` is non-finite, its tail
    /// probability underflows, or the value overflows.
    pub fn from_std_normal(&self, name: &str, w: f64) -> ModelResult<f64> {
        if !w.is_finite() {
            return Err(out_of_domain(name, w, "standard-normal coordinate is not finite"));
        }
        let x = match self.kind {
            Kind::Normal { mean, sd } => mean + sd * w,
            Kind::LogNormal { location, scale, .. } => (location + scale * w).exp(),
            _ => {
                let tail = if w > 0.0 {
                    Tail::Upper(std_normal_cdf(-w))
                } else {
                    Tail::Lower(std_normal_cdf(w))
                };
                if tail.probability() <= 0.0 {
                    return Err(out_of_domain(name, w, "tail probability underflows"));
                }
                self.tail_quantile(tail)
            }
        };
        if !x.is_finite() {
            return Err(out_of_domain(name, w, "physical value overflows"));
        }
        Ok(x)
    }

    /// Standard-normal coordinate for the physical value `x`.
    ///
    /// # Errors
    /// [`ModelError::TransformOutOfDomain`] when `x` lies outside the support
    /// (or on its boundary, where `Φ⁻¹` diverges).
    pub fn to_std_normal(&self, name: &str, x: f64) -> ModelResult<f64> {
        if !x.is_finite() {
            return Err(out_of_domain(name, x, "physical value is not finite"));
        }
        let outside = || out_of_domain(name, x, "value lies on or outside the support");
        match self.kind {
            Kind::Normal { mean, sd } => Ok((x - mean) / sd),
            Kind::LogNormal { location, scale, .. } => {
                if x <= 0.0 {
                    return Err(out_of_domain(name, x, "lognormal support is (0, inf)"));
                }
                Ok((x.ln() - location) / scale)
            }
            _ => {
                let (lower, upper) = self.tails(x);
                if lower <= upper {
                    std_normal_quantile(lower).map_err(|_| outside())
                } else {
                    std_normal_quantile(upper).map(|z| -z).map_err(|_| outside())
                }
            }
        }
    }

    /// `(F(x), 1 − F(x))`, each computed directly so that neither tail
    /// loses precision. Normal and lognormal families never reach here.
    fn tails(&self, x: f64) -> (f64, f64) {
        match self.kind {
            Kind::Uniform { lower, upper, .. } => {
                let width = upper - lower;
                (((x - lower) / width).clamp(0.0, 1.0), ((upper - x) / width).clamp(0.0, 1.0))
            }
            Kind::Weibull { shape, scale, .. } => {
                if x <= 0.0 {
                    return (0.0, 1.0);
                }
                let h = (x / scale).powf(shape);
                (-(-h).exp_m1(), (-h).exp())
            }
            Kind::Exponential { rate, .. } => {
                if x <= 0.0 {
                    return (0.0, 1.0);
                }
                (-(-rate * x).exp_m1(), (-rate * x).exp())
            }
            Kind::Normal { .. } | Kind::LogNormal { .. } => {
                let p = self.cdf(x);
                (p, 1.0 - p)
            }
        }
    }

    /// Closed-form quantile from whichever tail probability is given.
    fn tail_quantile(&self, tail: Tail) -> f64 {
        match (self.kind, tail) {
            (Kind::Uniform { lower, upper, .. }, Tail::Lower(p)) => lower + (upper - lower) * p,
            (Kind::Uniform { lower, upper, .. }, Tail::Upper(q)) => upper - (upper - lower) * q,
            // Cumulative hazard H = −ln S.
            (Kind::Weibull { shape, scale, .. }, t) => {
                scale * t.cumulative_hazard().powf(1.0 / shape)
            }
            (Kind::Exponential { rate, .. }, t) => t.cumulative_hazard() / rate,
            (Kind::Normal { mean, sd }, t) => mean + sd * t.normal_score(),
            (Kind::LogNormal { location, scale, .. }, t) => {
                (location + scale * t.normal_score()).exp()
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Tail {
    /// `F(x) = p`.
    Lower(f64),
    /// `1 − F(x) = q`.
    Upper(f64),
}

impl Tail {
    fn probability(self) -> f64 {
        match self {
            Tail::Lower(p) | Tail::Upper(p) => p,
        }
    }

    /// `−ln(1 − F)`, accurate in both tails.
    fn cumulative_hazard(self) -> f64 {
        match self {
            Tail::Lower(p) => -(-p).ln_1p(),
            Tail::Upper(q) => -q.ln(),
        }
    }

    fn normal_score(self) -> f64 {
        match self {
            Tail::Lower(p) => -SQRT_2 * erfc_inv(2.0 * p),
            Tail::Upper(q) => SQRT_2 * erfc_inv(2.0 * q),
        }
    }
}

fn out_of_domain(name: &str, value: f64, reason: &'static str) -> ModelError {
    ModelError::TransformOutOfDomain { variable: name.to_string(), value, reason }
}
