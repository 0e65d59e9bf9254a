//! model — probabilistic model: variables, marginals, copulas and the
//! function graph.
//!
//! Purpose
//! -------
//! Hold everything the reliability and RBDO layers evaluate: deterministic
//! design variables with bounds, random variables with marginals and
//! sensitivity tags, Gaussian-copula dependence blocks, and a DAG of named
//! function nodes whose outputs are cost and limit-state values.
//!
//! Key behaviors
//! -------------
//! - [`ModelBuilder`] validates declarations eagerly and resolves the graph
//!   once in `build`; the resulting [`Model`] is immutable and shared by
//!   reference.
//! - [`Model::evaluate`] / [`Model::evaluate_output`] run the graph; the
//!   latter only runs an output's ancestors, and [`Model::select_outputs`]
//!   does the same for a set of outputs evaluated many times.
//! - [`Model::inverse_transform`] / [`Model::forward_transform`] map between
//!   standard-normal and physical space; [`Model::sample`] and
//!   [`Model::sample_lhs`] draw seeded samples through the same map.
//!
//! Conventions
//! -----------
//! - Deterministic and random inputs are passed as separate `Array1<f64>`
//!   vectors in declaration order.
//! - Limit states are safe for `g > 0` and failed for `g ≤ 0`.
pub mod builder;
pub mod copula;
pub mod errors;
pub mod function;
pub mod library;
pub mod marginals;
#[allow(clippy::module_inception)]
pub mod model;
pub mod transform;
pub mod variables;

pub use self::builder::ModelBuilder;
pub use self::copula::GaussianCopula;
pub use self::errors::{ModelError, ModelResult};
pub use self::function::{FunctionNode, NodeFn};
pub use self::library::cantilever_beam;
pub use self::marginals::{std_normal_cdf, std_normal_quantile, Marginal};
pub use self::model::{Evaluation, Model, OutputSelection, Slot};
pub use self::variables::{DeterministicVar, RandomVar, Sensitivity};

pub mod prelude {
    pub use super::{
        cantilever_beam, Evaluation, GaussianCopula, Marginal, Model, ModelBuilder, ModelError,
        ModelResult, Sensitivity,
    };
}
