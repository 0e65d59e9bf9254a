//! The immutable probabilistic model and its forward evaluation.
//!
//! A [`Model`] is produced by [`ModelBuilder::build`](super::builder::ModelBuilder::build)
//! and never changes afterwards; every solver receives it by reference.
//!
//! Values live in one flat buffer laid out as
//! `[deterministic..., random..., outputs...]`; function nodes read and write
//! buffer slots resolved at build time, in topological order.
use crate::model::{
    copula::GaussianCopula,
    errors::{ModelError, ModelResult},
    function::FunctionNode,
    variables::{DeterministicVar, RandomVar},
};
use ndarray::Array1;
use std::collections::{BTreeMap, HashMap};

/// All model outputs by name.
pub type Evaluation = BTreeMap<String, f64>;

/// What a name refers to, with its index in the declaring list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Deterministic(usize),
    Random(usize),
    Output(usize),
}

/// Precomputed evaluation plan for one output.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct OutputPlan {
    /// Ancestor function indices in topological order.
    pub(crate) nodes: Vec<usize>,
    /// Random-variable indices the output depends on, closed under copula
    /// blocks, ascending.
    pub(crate) support: Vec<usize>,
}

/// Outputs picked by [`Model::select_outputs`] with the functions needed
/// to compute them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSelection {
    outputs: Vec<usize>,
    nodes: Vec<usize>,
}

impl OutputSelection {
    /// Number of function nodes a selection runs.
    pub fn n_functions(&self) -> usize {
        self.nodes.len()
    }
}

#[derive(Debug, Clone)]
pub struct Model {
    pub(crate) name: String,
    pub(crate) det: Vec<DeterministicVar>,
    pub(crate) rand: Vec<RandomVar>,
    pub(crate) copulas: Vec<GaussianCopula>,
    /// Random-variable indices of each copula, in block order.
    pub(crate) copula_members: Vec<Vec<usize>>,
    /// Copula of each random variable, if any.
    pub(crate) rand_copula: Vec<Option<usize>>,
    /// Function nodes in topological order.
    pub(crate) functions: Vec<FunctionNode>,
    pub(crate) node_inputs: Vec<Vec<usize>>,
    pub(crate) node_outputs: Vec<Vec<usize>>,
    pub(crate) outputs: Vec<String>,
    pub(crate) slots: HashMap<String, Slot>,
    pub(crate) plans: Vec<OutputPlan>,
}

impl Model {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn deterministic_vars(&self) -> &[DeterministicVar] {
        &self.det
    }

    pub fn random_vars(&self) -> &[RandomVar] {
        &self.rand
    }

    pub fn copulas(&self) -> &[GaussianCopula] {
        &self.copulas
    }

    /// Function nodes in evaluation order.
    pub fn functions(&self) -> &[FunctionNode] {
        &self.functions
    }

    pub fn output_names(&self) -> &[String] {
        &self.outputs
    }

    pub fn n_det(&self) -> usize {
        self.det.len()
    }

    pub fn n_rand(&self) -> usize {
        self.rand.len()
    }

    pub fn slot(&self, name: &str) -> Option<Slot> {
        self.slots.get(name).copied()
    }

    /// # Errors
    /// [`ModelError::UnknownOutput`] if no function produces `name`.
    pub fn output_index(&self, name: &str) -> ModelResult<usize> {
        match self.slot(name) {
            Some(Slot::Output(k)) => Ok(k),
            _ => Err(ModelError::UnknownOutput { name: name.to_string() }),
        }
    }

    /// # Errors
    /// [`ModelError::UnknownVariable`] if `name` is not a deterministic variable.
    pub fn det_index(&self, name: &str) -> ModelResult<usize> {
        match self.slot(name) {
            Some(Slot::Deterministic(i)) => Ok(i),
            _ => Err(ModelError::UnknownVariable { name: name.to_string() }),
        }
    }

    /// Random-variable indices that `output` depends on, closed under
    /// copula blocks.
    ///
    /// # Errors
    /// [`ModelError::UnknownOutput`] for an unknown output.
    pub fn random_support(&self, output: &str) -> ModelResult<&[usize]> {
        let k = self.output_index(output)?;
        Ok(&self.plans[k].support)
    }

    /// Evaluate every output.
    ///
    /// # Errors
    /// - [`ModelError::DimensionMismatch`] / [`ModelError::NonFiniteInput`]
    ///   for malformed inputs.
    /// - [`ModelError::OutputArity`] if a function misbehaves.
    pub fn evaluate(&self, det: &Array1<f64>, rand: &Array1<f64>) -> ModelResult<Evaluation> {
        let buffer = self.run(det, rand, 0..self.functions.len())?;
        let base = self.det.len() + self.rand.len();
        Ok(self
            .outputs
            .iter()
            .enumerate()
            .map(|(k, name)| (name.clone(), buffer[base + k]))
            .collect())
    }

    /// Evaluate a single output, running only its ancestor functions.
    ///
    /// # Errors
    /// As [`Model::evaluate`], plus [`ModelError::UnknownOutput`].
    pub fn evaluate_output(
        &self, output: &str, det: &Array1<f64>, rand: &Array1<f64>,
    ) -> ModelResult<f64> {
        let k = self.output_index(output)?;
        let buffer = self.run(det, rand, self.plans[k].nodes.iter().copied())?;
        Ok(buffer[self.det.len() + self.rand.len() + k])
    }

    /// Resolve a set of outputs once for repeated evaluation: the union of
    /// their ancestor functions, in topological order.
    ///
    /// # Errors
    /// [`ModelError::UnknownOutput`] for an unknown name.
    pub fn select_outputs(&self, names: &[&str]) -> ModelResult<OutputSelection> {
        let outputs = names.iter().map(|n| self.output_index(n)).collect::<ModelResult<Vec<_>>>()?;
        let mut nodes: Vec<usize> =
            outputs.iter().flat_map(|&k| self.plans[k].nodes.iter().copied()).collect();
        nodes.sort_unstable();
        nodes.dedup();
        Ok(OutputSelection { outputs, nodes })
    }

    /// Values of the selected outputs, in selection order.
    ///
    /// # Errors
    /// As [`Model::evaluate`].
    pub fn evaluate_selection(
        &self, selection: &OutputSelection, det: &Array1<f64>, rand: &Array1<f64>,
    ) -> ModelResult<Vec<f64>> {
        let buffer = self.run(det, rand, selection.nodes.iter().copied())?;
        let base = self.det.len() + self.rand.len();
        Ok(selection.outputs.iter().map(|&k| buffer[base + k]).collect())
    }

    fn run<I>(&self, det: &Array1<f64>, rand: &Array1<f64>, nodes: I) -> ModelResult<Vec<f64>>
    where
        I: IntoIterator<Item = usize>,
    {
        check_vector("deterministic values", det, self.det.len())?;
        check_vector("random values", rand, self.rand.len())?;
        let mut buffer = Vec::with_capacity(det.len() + rand.len() + self.outputs.len());
        buffer.extend(det.iter().copied());
        buffer.extend(rand.iter().copied());
        buffer.resize(buffer.len() + self.outputs.len(), f64::NAN);
        let mut args = Vec::new();
        for i in nodes {
            args.clear();
            args.extend(self.node_inputs[i].iter().map(|&s| buffer[s]));
            let out = self.functions[i].call(&args)?;
            for (&s, v) in self.node_outputs[i].iter().zip(out) {
                buffer[s] = v;
            }
        }
        Ok(buffer)
    }

    // ---- Convenience inputs ----

    pub fn det_nominal(&self) -> Array1<f64> {
        self.det.iter().map(|d| d.nominal()).collect()
    }

    /// `(lower, upper)` bound vectors of the deterministic variables.
    pub fn det_bounds(&self) -> (Vec<f64>, Vec<f64>) {
        (self.det.iter().map(|d| d.lower()).collect(), self.det.iter().map(|d| d.upper()).collect())
    }

    /// Deterministic vector with the named entries set and the rest nominal.
    ///
    /// # Errors
    /// [`ModelError::UnknownVariable`] for an unknown name.
    pub fn det_vector(&self, values: &[(&str, f64)]) -> ModelResult<Array1<f64>> {
        let mut out = self.det_nominal();
        for &(name, value) in values {
            out[self.det_index(name)?] = value;
        }
        Ok(out)
    }

    /// Random vector at the standard-normal origin, i.e. every variable at
    /// its median.
    ///
    /// # Errors
    /// Propagates transform errors (none for valid marginals).
    pub fn rand_median(&self) -> ModelResult<Array1<f64>> {
        self.inverse_transform(&Array1::zeros(self.rand.len()))
    }

    /// Per-variable conservative quantiles, see
    /// [`RandomVar::conservative`](super::variables::RandomVar::conservative).
    ///
    /// # Errors
    /// [`ModelError::InvalidProbability`] if `q ∉ (0, 1)`.
    pub fn rand_conservative(&self, q: f64) -> ModelResult<Array1<f64>> {
        self.rand.iter().map(|r| r.conservative(q)).collect()
    }

    /// Outputs at `det` with every random variable at its median.
    ///
    /// # Errors
    /// As [`Model::evaluate`].
    pub fn eval_nominal(&self, det: &Array1<f64>) -> ModelResult<Evaluation> {
        self.evaluate(det, &self.rand_median()?)
    }

    /// Outputs at `det` with random variables at conservative quantiles.
    ///
    /// # Errors
    /// As [`Model::evaluate`] and [`Model::rand_conservative`].
    pub fn eval_conservative(&self, det: &Array1<f64>, q: f64) -> ModelResult<Evaluation> {
        self.evaluate(det, &self.rand_conservative(q)?)
    }
}

pub(crate) fn check_vector(what: &'static str, v: &Array1<f64>, expected: usize) -> ModelResult<()> {
    if v.len() != expected {
        return Err(ModelError::DimensionMismatch { what, expected, found: v.len() });
    }
    if let Some((index, &value)) = v.iter().enumerate().find(|(_, x)| !x.is_finite()) {
        return Err(ModelError::NonFiniteInput { what, index, value });
    }
    Ok(())
}
