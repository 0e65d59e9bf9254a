//! rust_rbdo — first-order reliability analysis and reliability-based design
//! optimization.
//!
//! Purpose
//! -------
//! Size engineering designs under uncertainty: declare a probabilistic model
//! of design variables, random loads and material properties, then ask for
//! the cheapest design whose limit states stay safe at a target reliability
//! index.
//!
//! Key behaviors
//! -------------
//! - [`model`]: variables, marginals, Gaussian copulas and the function graph,
//!   with the standard-normal transform and seeded sampling.
//! - [`reliability`]: FORM/PMA performance measures and Monte Carlo
//!   verification of failure probabilities.
//! - [`rbdo`]: design optimization with reliability constraints, and a
//!   deterministic variant.
//! - [`optimization`]: the argmin-backed L-BFGS minimizer and the
//!   augmented-Lagrangian solver underneath.
//!
//! Conventions
//! -----------
//! - `g > 0` is safe and `g ≤ 0` is failure.
//! - Every layer returns its own `Result` alias; errors of lower layers are
//!   wrapped, never flattened to strings.
//! - Randomness is always seeded by the caller.
//!
//! Downstream usage
//! ----------------
//! ```no_run
//! use rust_rbdo::prelude::*;
//!
//! let model = cantilever_beam()?;
//! let constraints = [
//!     ReliabilityConstraint::from_beta("g_stress", 3.0)?,
//!     ReliabilityConstraint::from_beta("g_disp", 3.0)?,
//! ];
//! let out = rbdo_solve(
//!     &model,
//!     &CostFn::output("c_area"),
//!     &constraints,
//!     &DesignBounds::from_model(&model),
//!     &ndarray::array![3.0, 3.0],
//!     &RbdoOptions::default(),
//! )?;
//! println!("{:?}", out.named_design);
//! # Ok::<(), RbdoError>(())
//! ```

pub mod model;
pub mod optimization;
pub mod rbdo;
pub mod reliability;

pub mod prelude {
    pub use crate::model::prelude::*;
    pub use crate::rbdo::prelude::*;
    pub use crate::reliability::prelude::*;
}
