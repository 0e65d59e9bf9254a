//! Named function nodes of the model graph.
use crate::model::errors::{ModelError, ModelResult};
use std::{fmt, sync::Arc};

/// Shared, thread-safe vector function `inputs → outputs`.
pub type NodeFn = Arc<dyn Fn(&[f64]) -> Vec<f64> + Send + Sync>;

/// A function node: ordered input names, ordered output names, and the
/// closure mapping one to the other.
///
/// The closure must be pure. Returning NaN for an input where the physics is
/// undefined is allowed; solvers treat such points as infeasible.
#[derive(Clone)]
pub struct FunctionNode {
    name: String,
    inputs: Vec<String>,
    outputs: Vec<String>,
    func: NodeFn,
}

impl FunctionNode {
    /// # Errors
    /// - [`ModelError::EmptyName`] for an empty function, input or output name.
    /// - [`ModelError::RepeatedName`] if an input or output is listed twice,
    ///   or a name is both input and output of this node.
    pub fn new<F>(name: &str, inputs: &[&str], outputs: &[&str], func: F) -> ModelResult<Self>
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        if name.is_empty() {
            return Err(ModelError::EmptyName { context: "function" });
        }
        if outputs.is_empty() {
            return Err(ModelError::EmptyName { context: "function outputs" });
        }
        let all = inputs.iter().chain(outputs.iter());
        for (i, item) in all.clone().enumerate() {
            if item.is_empty() {
                return Err(ModelError::EmptyName { context: "function signature" });
            }
            if all.clone().take(i).any(|prev| prev == item) {
                return Err(ModelError::RepeatedName {
                    context: "function signature",
                    name: item.to_string(),
                });
            }
        }
        Ok(Self {
            name: name.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(func),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[String] {
        &self.outputs
    }

    /// Call the closure and check its arity.
    ///
    /// # Errors
    /// [`ModelError::OutputArity`] if the closure returns the wrong number
    /// of values.
    pub fn call(&self, args: &[f64]) -> ModelResult<Vec<f64>> {
        let out = (self.func)(args);
        if out.len() != self.outputs.len() {
            return Err(ModelError::OutputArity {
                function: self.name.clone(),
                expected: self.outputs.len(),
                found: out.len(),
            });
        }
        Ok(out)
    }
}

impl fmt::Debug for FunctionNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionNode")
            .field("name", &self.name)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish_non_exhaustive()
    }
}
