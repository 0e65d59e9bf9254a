//! minimizer::builders — L-BFGS solver construction helpers.
//!
//! Purpose
//! -------
//! Hide Argmin’s generic wiring behind two small builders that apply the
//! crate-level [`MinimizeOptions`] (tolerances, memory size) so callers can
//! request a configured solver without touching Argmin types.
//!
//! Conventions
//! -----------
//! - The builders do **not** set an initial point or `max_iters`; both are
//!   runtime concerns applied by [`run_lbfgs`](super::run::run_lbfgs).
//! - Invalid tolerances rejected by Argmin surface as [`OptResult`] errors
//!   through the crate’s `From<argmin::core::Error>` conversion.
use argmin::solver::quasinewton::LBFGS;

use crate::optimization::{
    errors::OptResult,
    minimizer::{
        traits::MinimizeOptions,
        types::{
            Cost, Grad, HagerZhangLS, LbfgsHagerZhang, LbfgsMoreThuente, MoreThuenteLS, Point,
            DEFAULT_LBFGS_MEM,
        },
    },
};

/// Build an L-BFGS solver with Hager–Zhang line search.
///
/// # Errors
/// Returns an `OptError` if Argmin rejects one of the configured tolerances.
pub fn build_optimizer_hager_zhang(opts: &MinimizeOptions) -> OptResult<LbfgsHagerZhang> {
    let hager_zhang = HagerZhangLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsHagerZhang::new(hager_zhang, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Build an L-BFGS solver with More–Thuente line search.
///
/// # Errors
/// Returns an `OptError` if Argmin rejects one of the configured tolerances.
pub fn build_optimizer_more_thuente(opts: &MinimizeOptions) -> OptResult<LbfgsMoreThuente> {
    let more_thuente = MoreThuenteLS::new();
    let mem = opts.lbfgs_mem.unwrap_or(DEFAULT_LBFGS_MEM);
    let lbfgs = LbfgsMoreThuente::new(more_thuente, mem);
    configure_lbfgs(lbfgs, opts)
}

/// Apply the optional gradient and cost-change tolerances to a solver.
pub fn configure_lbfgs<L>(
    mut solver: LBFGS<L, Point, Grad, Cost>, opts: &MinimizeOptions,
) -> OptResult<LBFGS<L, Point, Grad, Cost>> {
    if let Some(g) = opts.tols.tol_grad {
        solver = solver.with_tolerance_grad(g)?;
    }
    if let Some(c) = opts.tols.tol_cost {
        solver = solver.with_tolerance_cost(c)?;
    }
    Ok(solver)
}
