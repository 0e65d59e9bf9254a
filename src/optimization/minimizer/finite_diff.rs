//! minimizer::finite_diff — finite-difference gradients and Jacobians.
//!
//! Purpose
//! -------
//! Provide finite-difference derivative approximations with error capture so
//! that the rest of the optimizer can request derivatives of fallible
//! functions without depending directly on the `finitediff` API.
//!
//! Key behaviors
//! -------------
//! - [`fd_gradient`]: central differences first, forward differences as a
//!   fallback when the central stencil hits an error or a non-finite value.
//! - [`fd_jacobian`]: the same policy applied to each component of a
//!   vector-valued function, assembled row by row.
//!
//! Invariants & assumptions
//! ------------------------
//! - The closures passed to `finitediff` must return `f64`, so errors are
//!   routed into a shared `RefCell<Option<OptError>>` and the closure returns
//!   `NaN`. The first captured error wins.
//! - Returned gradients always pass [`validate_grad`].
use crate::optimization::{
    errors::{OptError, OptResult},
    minimizer::{
        types::{Grad, Jacobian, Point},
        validation::validate_grad,
    },
};
use finitediff::FiniteDiff;
use std::cell::RefCell;

/// fd_gradient — gradient of a fallible scalar function.
///
/// Parameters
/// ----------
/// - `x`: `&Point`
///   Evaluation point; its length defines the gradient dimension.
/// - `func`: `&G`
///   Fallible scalar function.
///
/// Returns
/// -------
/// `OptResult<Grad>`
///   Central-difference gradient when every stencil point evaluates and the
///   result is finite, otherwise the forward-difference gradient.
///
/// Errors
/// ------
/// - The first error raised by `func` on the forward stencil.
/// - `OptError::InvalidGradient` if the forward gradient is still non-finite.
pub fn fd_gradient<G>(x: &Point, func: &G) -> OptResult<Grad>
where
    G: Fn(&Point) -> OptResult<f64>,
{
    let closure_err: RefCell<Option<OptError>> = RefCell::new(None);
    let wrapped = |p: &Point| -> f64 {
        match func(p) {
            Ok(v) => v,
            Err(e) => {
                let mut slot = closure_err.borrow_mut();
                if slot.is_none() {
                    *slot = Some(e);
                }
                f64::NAN
            }
        }
    };
    let central = x.central_diff(&wrapped);
    if closure_err.borrow().is_none() && validate_grad(&central, x.len()).is_ok() {
        return Ok(central);
    }
    run_fd_diff(x, &wrapped, &closure_err)
}

/// run_fd_diff — forward-difference gradient with error capture and validation.
///
/// Clears `closure_err`, runs `forward_diff`, then surfaces any captured
/// error before validating the gradient.
///
/// # Errors
/// - The error captured in `closure_err`, if any.
/// - [`validate_grad`] failures.
pub fn run_fd_diff<G: Fn(&Point) -> f64>(
    x: &Point, func: &G, closure_err: &RefCell<Option<OptError>>,
) -> OptResult<Grad> {
    closure_err.replace(None);
    let fd_grad = x.forward_diff(func);
    if let Some(err) = closure_err.take() {
        return Err(err);
    }
    validate_grad(&fd_grad, x.len())?;
    Ok(fd_grad)
}

/// fd_jacobian — Jacobian of a fallible vector function.
///
/// Row `i` is the [`fd_gradient`] of component `i`. `n_out` is the expected
/// output length; a function returning a different length is an error.
///
/// # Errors
/// - [`OptError::DimensionMismatch`] if `func` returns a vector whose length
///   differs from `n_out`.
/// - Any error from [`fd_gradient`] on a component.
pub fn fd_jacobian<G>(x: &Point, n_out: usize, func: &G) -> OptResult<Jacobian>
where
    G: Fn(&Point) -> OptResult<Vec<f64>>,
{
    let mut jac = Jacobian::zeros((n_out, x.len()));
    for i in 0..n_out {
        let component = |p: &Point| -> OptResult<f64> {
            let out = func(p)?;
            if out.len() != n_out {
                return Err(OptError::DimensionMismatch {
                    what: "vector function output",
                    expected: n_out,
                    found: out.len(),
                });
            }
            Ok(out[i])
        };
        let row = fd_gradient(x, &component)?;
        jac.row_mut(i).assign(&row);
    }
    Ok(jac)
}
