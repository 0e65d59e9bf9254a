//! Execution helper that runs an `argmin` solver on an [`Objective`] and
//! returns a crate-friendly [`OptimOutcome`].
use crate::optimization::{
    errors::OptResult,
    minimizer::{
        adapter::ArgMinAdapter,
        traits::{MinimizeOptions, Objective, OptimOutcome},
        types::{Grad, Point},
    },
};
#[cfg(feature = "obs_slog")]
use argmin::core::{CostFunction, Gradient};
use argmin::core::{Executor, State};
#[cfg(feature = "obs_slog")]
use argmin_math::ArgminL2Norm;

/// Run an `argmin` optimization for an objective.
///
/// Shared runner used by both line-search variants. It wires up the adapted
/// objective, the solver, the initial point `x0`, optional observers (behind
/// the `obs_slog` feature) and the optional `max_iters`, then converts the
/// final state into [`OptimOutcome`].
///
/// # Errors
/// - Propagates any `argmin` runtime error (user evaluation failures,
///   line-search failures, observer failures) via `From<argmin::core::Error>`.
/// - Propagates validation errors raised when building [`OptimOutcome`].
pub fn run_lbfgs<'a, F, S>(
    x0: Point, opts: &MinimizeOptions, problem: ArgMinAdapter<'a, F>, solver: S,
) -> OptResult<OptimOutcome>
where
    F: Objective,
    S: argmin::core::Solver<
            ArgMinAdapter<'a, F>,
            argmin::core::IterState<Point, Grad, (), (), (), f64>,
        > + Send
        + 'static,
{
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        log_initial_state(&x0, &problem)?;
    }
    let mut optimizer = Executor::new(problem, solver);
    optimizer = optimizer.configure(|state| state.param(x0));
    #[cfg(feature = "obs_slog")]
    if opts.verbose {
        let observer = argmin_observer_slog::SlogLogger::term_noblock();
        optimizer = optimizer.add_observer(observer, argmin::core::observers::ObserverMode::Always);
    }
    if let Some(max_iter) = opts.tols.max_iter {
        optimizer = optimizer.configure(|state| state.max_iters(max_iter as u64));
    }

    let mut result = optimizer.run()?.state().clone();
    let iterations = result.get_iter();
    let function_counts = result.get_func_counts().clone();
    let termination = result.get_termination_status().clone();
    let grad = result.take_gradient();
    let outcome = OptimOutcome::new(
        result.take_best_param(),
        result.get_best_cost(),
        termination,
        iterations,
        function_counts,
        grad,
    )?;
    tracing::debug!(
        iterations = outcome.iterations,
        value = outcome.value,
        converged = outcome.converged,
        status = %outcome.status,
        "L-BFGS run finished"
    );
    Ok(outcome)
}

#[cfg(feature = "obs_slog")]
fn log_initial_state<F>(x0: &Point, problem: &ArgMinAdapter<'_, F>) -> OptResult<()>
where
    F: Objective,
{
    let f0 = problem.cost(x0)?;
    let g0n = problem.gradient(x0).ok().map(|g| g.l2_norm());

    eprintln!(
        "init: f(x0) = {:.6}{}",
        f0,
        g0n.map(|n| format!(", ||grad|| = {:.6}", n)).unwrap_or_default()
    );
    Ok(())
}
