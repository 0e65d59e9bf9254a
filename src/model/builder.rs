//! Fluent, eagerly validated construction of a [`Model`].
//!
//! Declarations are checked as they are added: duplicate names, a name
//! declared both deterministic and random, outputs that shadow variables,
//! and outputs declared twice all fail at the offending call. Checks that
//! need the whole graph (unknown inputs, cycles, copula membership) run in
//! [`ModelBuilder::build`].
use crate::model::{
    copula::GaussianCopula,
    errors::{ModelError, ModelResult},
    function::FunctionNode,
    marginals::Marginal,
    model::{Model, OutputPlan, Slot},
    variables::{DeterministicVar, RandomVar, Sensitivity},
};
use ndarray::Array2;
use std::collections::{BTreeSet, HashMap, VecDeque};

#[derive(Debug, Clone, Default)]
pub struct ModelBuilder {
    name: String,
    det: Vec<DeterministicVar>,
    rand: Vec<RandomVar>,
    functions: Vec<FunctionNode>,
    copulas: Vec<GaussianCopula>,
}

impl ModelBuilder {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), ..Self::default() }
    }

    /// Deterministic variable with nominal at the midpoint of `[lower, upper]`.
    ///
    /// # Errors
    /// Bound errors from [`DeterministicVar::new`] and name collisions.
    pub fn deterministic(mut self, name: &str, lower: f64, upper: f64) -> ModelResult<Self> {
        self.check_new_variable(name, false)?;
        self.det.push(DeterministicVar::new(name, lower, upper)?);
        Ok(self)
    }

    /// # Errors
    /// As [`ModelBuilder::deterministic`], plus nominal validation.
    pub fn deterministic_with_nominal(
        mut self, name: &str, lower: f64, upper: f64, nominal: f64,
    ) -> ModelResult<Self> {
        self.check_new_variable(name, false)?;
        self.det.push(DeterministicVar::with_nominal(name, lower, upper, nominal)?);
        Ok(self)
    }

    /// # Errors
    /// Name collisions with earlier declarations.
    pub fn random(
        mut self, name: &str, marginal: Marginal, sensitivity: Sensitivity,
    ) -> ModelResult<Self> {
        self.check_new_variable(name, true)?;
        self.rand.push(RandomVar::new(name, marginal, sensitivity)?);
        Ok(self)
    }

    /// Add a function node built from its parts.
    ///
    /// # Errors
    /// Signature errors from [`FunctionNode::new`] and the checks of
    /// [`ModelBuilder::node`].
    pub fn function<F>(
        self, name: &str, inputs: &[&str], outputs: &[&str], func: F,
    ) -> ModelResult<Self>
    where
        F: Fn(&[f64]) -> Vec<f64> + Send + Sync + 'static,
    {
        self.node(FunctionNode::new(name, inputs, outputs, func)?)
    }

    /// # Errors
    /// - [`ModelError::RepeatedName`] if a function with this name exists.
    /// - [`ModelError::OutputShadowsVariable`] if an output is a variable.
    /// - [`ModelError::DuplicateOutput`] if another function declares an output.
    pub fn node(mut self, node: FunctionNode) -> ModelResult<Self> {
        if self.functions.iter().any(|f| f.name() == node.name()) {
            return Err(ModelError::RepeatedName {
                context: "function names",
                name: node.name().to_string(),
            });
        }
        for output in node.outputs() {
            if self.is_variable(output) {
                return Err(ModelError::OutputShadowsVariable {
                    function: node.name().to_string(),
                    output: output.clone(),
                });
            }
            if let Some(first) = self.producer(output) {
                return Err(ModelError::DuplicateOutput {
                    output: output.clone(),
                    first: first.name().to_string(),
                    second: node.name().to_string(),
                });
            }
        }
        self.functions.push(node);
        Ok(self)
    }

    /// Correlate a block of random variables through a Gaussian copula.
    ///
    /// # Errors
    /// - Matrix errors from [`GaussianCopula::new`].
    /// - [`ModelError::CopulaUnknownVariable`] if a name is a deterministic
    ///   variable (unknown names are reported by `build`).
    /// - [`ModelError::CopulaOverlap`] if a variable is already in a block.
    pub fn gaussian_copula(
        mut self, variables: &[&str], correlation: Array2<f64>,
    ) -> ModelResult<Self> {
        let copula = GaussianCopula::new(variables, correlation)?;
        for v in copula.variables() {
            if self.det.iter().any(|d| d.name() == v) {
                return Err(ModelError::CopulaUnknownVariable { variable: v.clone() });
            }
            if self.copulas.iter().any(|c| c.variables().contains(v)) {
                return Err(ModelError::CopulaOverlap { variable: v.clone() });
            }
        }
        self.copulas.push(copula);
        Ok(self)
    }

    /// Resolve the graph and freeze the model.
    ///
    /// # Errors
    /// - [`ModelError::CopulaUnknownVariable`] for a block naming a
    ///   non-random variable.
    /// - [`ModelError::UnknownInput`] for an unresolved function input.
    /// - [`ModelError::CyclicDependency`] if outputs feed back into their
    ///   own producers.
    pub fn build(self) -> ModelResult<Model> {
        let n_det = self.det.len();
        let n_rand = self.rand.len();

        let mut slots: HashMap<String, Slot> = HashMap::new();
        for (i, d) in self.det.iter().enumerate() {
            slots.insert(d.name().to_string(), Slot::Deterministic(i));
        }
        for (j, r) in self.rand.iter().enumerate() {
            slots.insert(r.name().to_string(), Slot::Random(j));
        }

        // Copula membership.
        let mut rand_copula = vec![None; n_rand];
        let mut copula_members = Vec::with_capacity(self.copulas.len());
        for (c, copula) in self.copulas.iter().enumerate() {
            let mut members = Vec::with_capacity(copula.variables().len());
            for v in copula.variables() {
                match slots.get(v) {
                    Some(&Slot::Random(j)) => {
                        rand_copula[j] = Some(c);
                        members.push(j);
                    }
                    _ => return Err(ModelError::CopulaUnknownVariable { variable: v.clone() }),
                }
            }
            copula_members.push(members);
        }

        // Producer of every output, in declaration order.
        let mut producer: HashMap<&str, usize> = HashMap::new();
        for (f, node) in self.functions.iter().enumerate() {
            for output in node.outputs() {
                producer.insert(output.as_str(), f);
            }
        }

        // Adjacency keyed by consumed name: producer -> consumers.
        let n_fn = self.functions.len();
        let mut consumers: Vec<Vec<usize>> = vec![Vec::new(); n_fn];
        let mut in_degree = vec![0usize; n_fn];
        for (f, node) in self.functions.iter().enumerate() {
            for input in node.inputs() {
                if let Some(&p) = producer.get(input.as_str()) {
                    consumers[p].push(f);
                    in_degree[f] += 1;
                } else if !slots.contains_key(input) {
                    return Err(ModelError::UnknownInput {
                        function: node.name().to_string(),
                        input: input.clone(),
                    });
                }
            }
        }
        let order = topological_order(&consumers, in_degree).map_err(|stuck| {
            ModelError::CyclicDependency {
                functions: stuck.iter().map(|&f| self.functions[f].name().to_string()).collect(),
            }
        })?;

        // Output slots follow topological order, then each node's declaration order.
        let mut outputs = Vec::new();
        for &f in &order {
            for output in self.functions[f].outputs() {
                slots.insert(output.clone(), Slot::Output(outputs.len()));
                outputs.push(output.clone());
            }
        }
        let buffer_index = |slot: Slot| match slot {
            Slot::Deterministic(i) => i,
            Slot::Random(j) => n_det + j,
            Slot::Output(k) => n_det + n_rand + k,
        };

        let mut functions = Vec::with_capacity(n_fn);
        let mut node_inputs = Vec::with_capacity(n_fn);
        let mut node_outputs = Vec::with_capacity(n_fn);
        let mut position = vec![0usize; n_fn];
        for (pos, &f) in order.iter().enumerate() {
            position[f] = pos;
            let node = &self.functions[f];
            node_inputs.push(node.inputs().iter().map(|s| buffer_index(slots[s])).collect());
            node_outputs.push(node.outputs().iter().map(|s| buffer_index(slots[s])).collect());
            functions.push(node.clone());
        }

        let plans = outputs
            .iter()
            .map(|output| {
                let root = position[producer[output.as_str()]];
                plan_for(root, &functions, &slots, &position, &producer, &rand_copula, &copula_members)
            })
            .collect();

        Ok(Model {
            name: self.name,
            det: self.det,
            rand: self.rand,
            copulas: self.copulas,
            copula_members,
            rand_copula,
            functions,
            node_inputs,
            node_outputs,
            outputs,
            slots,
            plans,
        })
    }

    fn check_new_variable(&self, name: &str, random: bool) -> ModelResult<()> {
        let in_det = self.det.iter().any(|d| d.name() == name);
        let in_rand = self.rand.iter().any(|r| r.name() == name);
        if (in_det && random) || (in_rand && !random) {
            return Err(ModelError::VariableBothDetAndRand { name: name.to_string() });
        }
        if in_det || in_rand {
            return Err(ModelError::DuplicateVariable { name: name.to_string() });
        }
        if let Some(node) = self.producer(name) {
            return Err(ModelError::OutputShadowsVariable {
                function: node.name().to_string(),
                output: name.to_string(),
            });
        }
        Ok(())
    }

    fn is_variable(&self, name: &str) -> bool {
        self.det.iter().any(|d| d.name() == name) || self.rand.iter().any(|r| r.name() == name)
    }

    fn producer(&self, output: &str) -> Option<&FunctionNode> {
        self.functions.iter().find(|f| f.outputs().iter().any(|o| o == output))
    }
}

/// Kahn's algorithm. On a cycle, returns the nodes that never reached
/// in-degree zero.
fn topological_order(
    consumers: &[Vec<usize>], mut in_degree: Vec<usize>,
) -> Result<Vec<usize>, Vec<usize>> {
    let mut ready: VecDeque<usize> =
        in_degree.iter().enumerate().filter(|&(_, &d)| d == 0).map(|(i, _)| i).collect();
    let mut order = Vec::with_capacity(consumers.len());
    while let Some(f) = ready.pop_front() {
        order.push(f);
        for &c in &consumers[f] {
            in_degree[c] -= 1;
            if in_degree[c] == 0 {
                ready.push_back(c);
            }
        }
    }
    if order.len() == consumers.len() {
        Ok(order)
    } else {
        Err((0..consumers.len()).filter(|&f| in_degree[f] > 0).collect())
    }
}

/// Ancestors of the node at topological position `root`, and the random
/// support they read, closed under copula blocks.
fn plan_for(
    root: usize, functions: &[FunctionNode], slots: &HashMap<String, Slot>, position: &[usize],
    producer: &HashMap<&str, usize>, rand_copula: &[Option<usize>], copula_members: &[Vec<usize>],
) -> OutputPlan {
    let mut needed = BTreeSet::from([root]);
    let mut stack = vec![root];
    let mut support = BTreeSet::new();
    while let Some(pos) = stack.pop() {
        for input in functions[pos].inputs() {
            match slots.get(input) {
                Some(&Slot::Random(j)) => {
                    support.insert(j);
                }
                Some(&Slot::Output(_)) => {
                    let up = position[producer[input.as_str()]];
                    if needed.insert(up) {
                        stack.push(up);
                    }
                }
                _ => {}
            }
        }
    }
    let direct: Vec<usize> = support.iter().copied().collect();
    for j in direct {
        if let Some(c) = rand_copula[j] {
            support.extend(copula_members[c].iter().copied());
        }
    }
    OutputPlan { nodes: needed.into_iter().collect(), support: support.into_iter().collect() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    // Scope
    // -----
    // Eager declaration checks, graph resolution at build time, and the
    // per-output evaluation plans.

    fn normal() -> Marginal {
        Marginal::normal(0.0, 1.0).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Name collisions fail at the declaring call.
    fn builder_rejects_name_collisions_eagerly() {
        let base = ModelBuilder::new("m").deterministic("d", 0.0, 1.0).unwrap();
        assert_eq!(
            base.clone().random("d", normal(), Sensitivity::Unknown).unwrap_err(),
            ModelError::VariableBothDetAndRand { name: "d".to_string() }
        );
        assert_eq!(
            base.clone().deterministic("d", 0.0, 2.0).unwrap_err(),
            ModelError::DuplicateVariable { name: "d".to_string() }
        );
        assert!(matches!(
            base.clone().function("f", &["d"], &["d2", "d"], |v| vec![v[0], v[0]]),
            Err(ModelError::RepeatedName { .. })
        ));
        let with_fn = base.function("f", &["d"], &["y"], |v| vec![2.0 * v[0]]).unwrap();
        assert!(matches!(
            with_fn.clone().function("g", &["d"], &["y"], |v| vec![v[0]]),
            Err(ModelError::DuplicateOutput { .. })
        ));
        assert!(matches!(
            with_fn.clone().function("g", &["y"], &["d"], |v| vec![v[0]]),
            Err(ModelError::OutputShadowsVariable { .. })
        ));
        assert!(matches!(
            with_fn.deterministic("y", 0.0, 1.0),
            Err(ModelError::OutputShadowsVariable { .. })
        ));
    }

    #[test]
    // Purpose
    // -------
    // Graph-level errors surface from `build`.
    //
    // Given
    // -----
    // - A function consuming an undeclared name.
    // - Two functions feeding each other.
    // - A copula naming an undeclared variable.
    //
    // Expect
    // ------
    // - UnknownInput, CyclicDependency (both names), CopulaUnknownVariable.
    fn build_reports_graph_errors() {
        let unknown = ModelBuilder::new("m")
            .function("f", &["missing"], &["y"], |v| vec![v[0]])
            .unwrap()
            .build();
        assert_eq!(
            unknown.unwrap_err(),
            ModelError::UnknownInput { function: "f".to_string(), input: "missing".to_string() }
        );

        let cyclic = ModelBuilder::new("m")
            .deterministic("d", 0.0, 1.0)
            .unwrap()
            .function("f", &["d", "b"], &["a"], |v| vec![v[0] + v[1]])
            .unwrap()
            .function("g", &["a"], &["b"], |v| vec![v[0]])
            .unwrap()
            .build();
        assert_eq!(
            cyclic.unwrap_err(),
            ModelError::CyclicDependency { functions: vec!["f".to_string(), "g".to_string()] }
        );

        let copula = ModelBuilder::new("m")
            .random("x", normal(), Sensitivity::Unknown)
            .unwrap()
            .gaussian_copula(&["x", "ghost"], array![[1.0, 0.1], [0.1, 1.0]])
            .unwrap()
            .build();
        assert_eq!(
            copula.unwrap_err(),
            ModelError::CopulaUnknownVariable { variable: "ghost".to_string() }
        );
    }

    #[test]
    // Purpose
    // -------
    // Functions declared out of order are evaluated in dependency order,
    // and each output only runs its ancestors.
    //
    // Given
    // -----
    // - `g` consumes `a` produced by the later-declared `f`; `h` is unrelated.
    //
    // Expect
    // ------
    // - b = 2(d + x) + 1 and the plan for `b` holds two nodes; the support
    //   of `c` is empty.
    fn build_orders_functions_and_plans_outputs() {
        // Arrange
        let model = ModelBuilder::new("m")
            .deterministic("d", 0.0, 4.0)
            .unwrap()
            .random("x", normal(), Sensitivity::Increases)
            .unwrap()
            .function("g", &["a"], &["b"], |v| vec![2.0 * v[0] + 1.0])
            .unwrap()
            .function("f", &["d", "x"], &["a"], |v| vec![v[0] + v[1]])
            .unwrap()
            .function("h", &["d"], &["c"], |v| vec![-v[0]])
            .unwrap()
            .build()
            .unwrap();
        let det = array![1.5];
        let rand = array![0.25];

        // Act
        let all = model.evaluate(&det, &rand).unwrap();
        let b = model.evaluate_output("b", &det, &rand).unwrap();

        // Assert
        assert_eq!(all["b"], 2.0 * 1.75 + 1.0);
        assert_eq!(b, all["b"]);
        assert_eq!(all["c"], -1.5);
        assert_eq!(model.functions()[0].name(), "f");
        assert_eq!(model.plans[model.output_index("b").unwrap()].nodes.len(), 2);
        assert_eq!(model.random_support("b").unwrap(), &[0]);
        assert!(model.random_support("c").unwrap().is_empty());
    }

    #[test]
    // Purpose
    // -------
    // The random support of an output is closed under its copula block.
    fn random_support_closes_over_copula_blocks() {
        let model = ModelBuilder::new("m")
            .random("x", normal(), Sensitivity::Unknown)
            .unwrap()
            .random("y", normal(), Sensitivity::Unknown)
            .unwrap()
            .random("u", normal(), Sensitivity::Unknown)
            .unwrap()
            .gaussian_copula(&["y", "x"], array![[1.0, 0.4], [0.4, 1.0]])
            .unwrap()
            .function("f", &["x"], &["g"], |v| vec![v[0]])
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(model.random_support("g").unwrap(), &[0, 1]);
        assert_eq!(model.copula_members, vec![vec![1, 0]]);
    }
}
