//! High-level entry point for minimizing a user-provided [`Objective`].
//!
//! This selects an L-BFGS solver with either Hager–Zhang or More–Thuente line
//! search, wraps the objective in an `ArgMinAdapter`, and delegates the run
//! to `run_lbfgs`.
use crate::optimization::{
    errors::OptResult,
    minimizer::{
        adapter::ArgMinAdapter,
        builders::{build_optimizer_hager_zhang, build_optimizer_more_thuente},
        run::run_lbfgs,
        traits::{LineSearcher, MinimizeOptions, Objective, OptimOutcome},
        types::Point,
    },
};

/// Minimize `f(x)` using L-BFGS with the chosen line search.
///
/// # Behavior
/// - Validates the initial guess via `f.check(&x0)`.
/// - Builds an L-BFGS solver with the line search in `opts.line_searcher`.
/// - Calls `run_lbfgs`, which configures the executor and returns an
///   [`OptimOutcome`].
///
/// # Errors
/// - Propagates any error from `f.check`.
/// - Propagates builder errors from `build_optimizer_*`.
/// - Propagates runtime errors from `run_lbfgs` (e.g., evaluation failures).
///
/// # Example
/// ```no_run
/// use ndarray::array;
/// use rust_rbdo::optimization::errors::OptResult;
/// use rust_rbdo::optimization::minimizer::{minimize, MinimizeOptions, Objective, Point};
///
/// struct Bowl;
/// impl Objective for Bowl {
///     fn value(&self, x: &Point) -> OptResult<f64> {
///         Ok(x.dot(x))
///     }
/// }
///
/// let out = minimize(&Bowl, array![0.1, -0.2, 0.3], &MinimizeOptions::default())?;
/// println!("x̂ = {:?}", out.x_hat);
/// # Ok::<(), rust_rbdo::optimization::errors::OptError>(())
/// ```
pub fn minimize<F: Objective>(f: &F, x0: Point, opts: &MinimizeOptions) -> OptResult<OptimOutcome> {
    f.check(&x0)?;
    let problem = ArgMinAdapter::new(f);
    match opts.line_searcher {
        LineSearcher::MoreThuente => {
            let solver = build_optimizer_more_thuente(opts)?;
            run_lbfgs(x0, opts, problem, solver)
        }
        LineSearcher::HagerZhang => {
            let solver = build_optimizer_hager_zhang(opts)?;
            run_lbfgs(x0, opts, problem, solver)
        }
    }
}
