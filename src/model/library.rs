//! Reference models.
use crate::model::{
    builder::ModelBuilder,
    errors::ModelResult,
    marginals::Marginal,
    model::Model,
    variables::Sensitivity,
};

/// Cantilever beam of length 100 under horizontal and vertical tip loads.
///
/// Design variables: width `w` and thickness `t`, both in `[2, 4]`.
/// Random loads `H ~ N(500, 100)`, `V ~ N(1000, 100)`, Young's modulus
/// `E ~ N(2.9e7, 1.45e6)` and yield stress `Y ~ N(4e4, 2000)`, independent.
///
/// Outputs:
/// - `c_area = w t`
/// - `g_stress = (Y − 600 V / (w t²) − 600 H / (w² t)) / 40000`
/// - `g_disp = 2.2535 − 4 L³ / (E w t) · sqrt(V² / t⁴ + H² / w⁴)`
///
/// # Errors
/// Never in practice; the declarations are static.
pub fn cantilever_beam() -> ModelResult<Model> {
    const LENGTH: f64 = 100.0;
    const D_MAX: f64 = 2.2535;
    const STRESS_SCALE: f64 = 40_000.0;

    ModelBuilder::new("cantilever_beam")
        .deterministic("w", 2.0, 4.0)?
        .deterministic("t", 2.0, 4.0)?
        .random("H", Marginal::normal(500.0, 100.0)?, Sensitivity::Decreases)?
        .random("V", Marginal::normal(1000.0, 100.0)?, Sensitivity::Decreases)?
        .random("E", Marginal::normal(2.9e7, 1.45e6)?, Sensitivity::Increases)?
        .random("Y", Marginal::normal(40_000.0, 2000.0)?, Sensitivity::Increases)?
        .function("area", &["w", "t"], &["c_area"], |v| vec![v[0] * v[1]])?
        .function("stress", &["w", "t", "H", "V", "Y"], &["g_stress"], |v| {
            let (w, t, h, vv, y) = (v[0], v[1], v[2], v[3], v[4]);
            vec![(y - 600.0 * vv / (w * t * t) - 600.0 * h / (w * w * t)) / STRESS_SCALE]
        })?
        .function("displacement", &["w", "t", "H", "V", "E"], &["g_disp"], |v| {
            let (w, t, h, vv, e) = (v[0], v[1], v[2], v[3], v[4]);
            let load = (vv * vv / t.powi(4) + h * h / w.powi(4)).sqrt();
            vec![D_MAX - 4.0 * LENGTH.powi(3) / (e * w * t) * load]
        })?
        .build()
}
