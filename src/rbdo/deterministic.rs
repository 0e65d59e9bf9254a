//! Deterministic evaluations of a model: constrained minimization of
//! outputs, least-squares fitting of variables to data, and finite-difference
//! output gradients.
use crate::{
    model::{errors::ModelError, model::Model},
    optimization::{
        constrained::{minimize_constrained, ConstrainedOptions, ConstrainedStatus},
        errors::OptResult,
        minimizer::{fd_jacobian, Jacobian, Point},
    },
    rbdo::{
        bounds::DesignBounds,
        errors::{RbdoError, RbdoResult},
        problem::{DeterministicProblem, FirstFailure, NlsProblem, Source},
    },
};
use ndarray::{s, Array1, Array2};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct DeterministicOutcome {
    pub design: Array1<f64>,
    pub named_design: BTreeMap<String, f64>,
    pub cost: f64,
    /// `≥ 0` constraint values by output name.
    pub ineq: BTreeMap<String, f64>,
    /// `= 0` constraint values by output name.
    pub eq: BTreeMap<String, f64>,
    pub status: ConstrainedStatus,
    pub max_violation: f64,
    pub outer_iterations: usize,
}

impl DeterministicOutcome {
    pub fn converged(&self) -> bool {
        self.status == ConstrainedStatus::Converged
    }
}

/// eval_min — minimize one output subject to others being `≥ 0` or `= 0`.
///
/// The model must not declare random variables. The design box is the one
/// declared on the model; `x0 = None` starts from the nominal values.
///
/// # Errors
/// - [`RbdoError::RandomVariablesPresent`] if the model has random variables.
/// - [`RbdoError::Model`] for unknown output names or an evaluation failure.
/// - [`RbdoError::DimensionMismatch`] / [`RbdoError::InitialGuessOutOfBounds`]
///   for a bad `x0`.
pub fn eval_min(
    model: &Model, minimize: &str, geq: &[&str], eq: &[&str], x0: Option<&Array1<f64>>,
    options: &ConstrainedOptions,
) -> RbdoResult<DeterministicOutcome> {
    if model.n_rand() > 0 {
        return Err(RbdoError::RandomVariablesPresent { count: model.n_rand() });
    }
    for name in std::iter::once(&minimize).chain(geq).chain(eq) {
        model.output_index(name)?;
    }
    let bounds = DesignBounds::from_model(model);
    let x0 = match x0 {
        Some(x0) => x0.clone(),
        None => model.det_nominal(),
    };
    bounds.check_guess(&x0)?;

    let problem = DeterministicProblem::new(model, minimize, geq, eq);
    let result = minimize_constrained(&problem, &x0, bounds.lower(), bounds.upper(), options);
    if let Some(err) = problem.failure.take() {
        return Err(err);
    }
    let out = result?;
    info!(
        model = model.name(),
        status = ?out.status,
        cost = out.cost,
        "deterministic design optimization finished"
    );

    let named = |names: &[&str], values: &Array1<f64>| -> BTreeMap<String, f64> {
        names.iter().map(|n| n.to_string()).zip(values.iter().copied()).collect()
    };
    Ok(DeterministicOutcome {
        named_design: bounds.name_design(&out.x),
        ineq: named(geq, &out.ineq),
        eq: named(eq, &out.eq),
        design: out.x,
        cost: out.cost,
        status: out.status,
        max_violation: out.max_violation,
        outer_iterations: out.outer_iterations,
    })
}

/// Observations for [`eval_nls`]: one row per experiment, one named column
/// per model variable or output.
#[derive(Debug, Clone, PartialEq)]
pub struct FitData {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FitData {
    /// # Errors
    /// [`RbdoError::InvalidFitData`] when the width differs from the number
    /// of names, there are no rows, a name repeats, or an entry is non-finite.
    pub fn new(columns: &[&str], values: Array2<f64>) -> RbdoResult<Self> {
        if values.ncols() != columns.len() {
            return Err(RbdoError::InvalidFitData {
                reason: "column count differs from the number of names",
            });
        }
        if values.nrows() == 0 {
            return Err(RbdoError::InvalidFitData { reason: "no rows" });
        }
        let unique: BTreeSet<&str> = columns.iter().copied().collect();
        if unique.len() != columns.len() {
            return Err(RbdoError::InvalidFitData { reason: "duplicate column name" });
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(RbdoError::InvalidFitData { reason: "non-finite entry" });
        }
        Ok(Self { columns: columns.iter().map(|c| c.to_string()).collect(), values })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NlsOutcome {
    /// Best-fit value of each fitted variable.
    pub fitted: BTreeMap<String, f64>,
    /// Starting value of each fitted variable.
    pub initial: BTreeMap<String, f64>,
    /// Mean squared error over every row and selected output.
    pub mse: f64,
    pub status: ConstrainedStatus,
    pub outer_iterations: usize,
}

impl NlsOutcome {
    pub fn converged(&self) -> bool {
        self.status == ConstrainedStatus::Converged
    }
}

/// eval_nls — fit model variables to data by nonlinear least squares.
///
/// Parameters
/// ----------
/// - `data`: observed rows. Columns named after model variables are inputs
///   held at their observed values; columns named after outputs are targets.
/// - `out`: outputs entering the mean squared error; empty means every
///   model output, each of which then needs a column.
/// - `fix`: variables held at their nominal (deterministic) or median
///   (random) value. Deterministic variables with `lower == upper` are
///   always fixed.
///
/// Every remaining variable is fitted. Deterministic ones start at their
/// nominal value inside their declared box; random ones start at their
/// median inside the support of their marginal.
///
/// # Errors
/// - [`RbdoError::MissingColumn`] for a selected output without data.
/// - [`RbdoError::Model`] for unknown names in `out` or `fix`, or an
///   evaluation failure during the fit.
/// - [`RbdoError::NothingToFit`] when no variable is left to fit.
pub fn eval_nls(
    model: &Model, data: &FitData, out: &[&str], fix: &[&str], options: &ConstrainedOptions,
) -> RbdoResult<NlsOutcome> {
    let out: Vec<&str> = if out.is_empty() {
        model.output_names().iter().map(String::as_str).collect()
    } else {
        out.to_vec()
    };
    let selection = model.select_outputs(&out)?;
    let targets = out
        .iter()
        .map(|name| {
            data.column_index(name)
                .ok_or_else(|| RbdoError::MissingColumn { name: name.to_string() })
        })
        .collect::<RbdoResult<Vec<usize>>>()?;
    for name in fix {
        if model.slot(name).is_none() {
            return Err(ModelError::UnknownVariable { name: name.to_string() }.into());
        }
    }

    let mut names = Vec::new();
    let (mut x0, mut lower, mut upper) = (Vec::new(), Vec::new(), Vec::new());
    let mut fitted = |name: &str, start: f64, lo: f64, hi: f64| -> Source {
        names.push(name.to_string());
        x0.push(start);
        lower.push(lo);
        upper.push(hi);
        Source::Fitted(names.len() - 1)
    };
    let det: Vec<Source> = model
        .deterministic_vars()
        .iter()
        .map(|v| match data.column_index(v.name()) {
            Some(c) => Source::Column(c),
            None if fix.contains(&v.name()) || v.lower() == v.upper() => Source::Fixed(v.nominal()),
            None => fitted(v.name(), v.nominal(), v.lower(), v.upper()),
        })
        .collect();
    let rand: Vec<Source> = model
        .random_vars()
        .iter()
        .map(|v| {
            let median = v.marginal().median();
            match data.column_index(v.name()) {
                Some(c) => Source::Column(c),
                None if fix.contains(&v.name()) => Source::Fixed(median),
                None => {
                    let (lo, hi) = v.marginal().support();
                    fitted(v.name(), median, lo, hi)
                }
            }
        })
        .collect();
    if names.is_empty() {
        return Err(RbdoError::NothingToFit);
    }
    debug!(fitted = ?names, outputs = ?out, rows = data.values().nrows(), "least-squares fit setup");

    let x0 = Array1::from(x0);
    let problem = NlsProblem::new(model, data.values(), det, rand, selection, targets);
    let result = minimize_constrained(&problem, &x0, &lower, &upper, options);
    if let Some(err) = problem.failure.take() {
        return Err(err);
    }
    let res = result?;
    info!(model = model.name(), status = ?res.status, mse = res.cost, "least-squares fit finished");

    let named = |values: &Array1<f64>| -> BTreeMap<String, f64> {
        names.iter().cloned().zip(values.iter().copied()).collect()
    };
    Ok(NlsOutcome {
        fitted: named(&res.x),
        initial: named(&x0),
        mse: res.cost,
        status: res.status,
        outer_iterations: res.outer_iterations,
    })
}

/// Finite-difference derivatives of every output with respect to every
/// variable at one point.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputGradient {
    /// Row labels, in model output order.
    pub outputs: Vec<String>,
    /// Column labels: deterministic then random variables.
    pub variables: Vec<String>,
    /// `outputs × variables`.
    pub jacobian: Jacobian,
}

impl OutputGradient {
    /// `∂output/∂variable`, if both names exist.
    pub fn get(&self, output: &str, variable: &str) -> Option<f64> {
        let i = self.outputs.iter().position(|o| o == output)?;
        let j = self.variables.iter().position(|v| v == variable)?;
        Some(self.jacobian[[i, j]])
    }
}

/// eval_grad_fd — central-difference gradient of every output at
/// `(det, rand)`, falling back to one-sided steps where the model is
/// undefined on one side.
///
/// # Errors
/// - [`RbdoError::Model`] for malformed vectors or an undefined output at
///   the point itself, or when no difference scheme can evaluate some
///   coordinate.
/// - [`RbdoError::Optimization`] for non-finite derivatives.
pub fn eval_grad_fd(
    model: &Model, det: &Array1<f64>, rand: &Array1<f64>,
) -> RbdoResult<OutputGradient> {
    let outputs: Vec<&str> = model.output_names().iter().map(String::as_str).collect();
    let selection = model.select_outputs(&outputs)?;
    model.evaluate_selection(&selection, det, rand)?;

    let n_det = det.len();
    let x: Point = det.iter().chain(rand.iter()).copied().collect();
    let failure = FirstFailure::default();
    let at = |p: &Point| -> OptResult<Vec<f64>> {
        let (d, r) = (p.slice(s![..n_det]).to_owned(), p.slice(s![n_det..]).to_owned());
        let values = model.evaluate_selection(&selection, &d, &r).map_err(RbdoError::from);
        failure.capture(values, 0)
    };
    // A one-sided fallback may have recovered from a captured error, so the
    // slot is only consulted when differencing fails outright.
    let jacobian = match fd_jacobian(&x, outputs.len(), &at) {
        Ok(jac) => jac,
        Err(err) => return Err(failure.take().unwrap_or_else(|| err.into())),
    };

    let variables = model
        .deterministic_vars()
        .iter()
        .map(|v| v.name().to_string())
        .chain(model.random_vars().iter().map(|v| v.name().to_string()))
        .collect();
    Ok(OutputGradient {
        outputs: outputs.iter().map(|o| o.to_string()).collect(),
        variables,
        jacobian,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        builder::ModelBuilder, library::cantilever_beam, marginals::Marginal,
        variables::Sensitivity,
    };
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Axis};

    // Scope
    // -----
    // A two-variable problem with one active inequality and one equality,
    // the guard against random variables, least-squares fits of a line and
    // of a random scale, and finite-difference output gradients.

    fn plate() -> Model {
        ModelBuilder::new("plate")
            .deterministic_with_nominal("a", 0.0, 5.0, 1.0)
            .unwrap()
            .deterministic_with_nominal("b", 0.0, 5.0, 1.0)
            .unwrap()
            .function("f", &["a", "b"], &["area", "margin", "balance"], |v| {
                vec![v[0] * v[0] + v[1] * v[1], v[0] + 2.0 * v[1] - 4.0, v[0] - v[1]]
            })
            .unwrap()
            .build()
            .unwrap()
    }

    #[test]
    // Purpose
    // -------
    // The active inequality and the equality are met at the optimum.
    //
    // Given
    // -----
    // - min a² + b² s.t. a + 2b − 4 ≥ 0, a − b = 0.
    //
    // Expect
    // ------
    // - a = b = 4/3, both constraints ≈ 0.
    fn eval_min_meets_inequality_and_equality() {
        // Arrange
        let model = plate();

        // Act
        let out = eval_min(
            &model,
            "area",
            &["margin"],
            &["balance"],
            None,
            &ConstrainedOptions::default(),
        )
        .unwrap();

        // Assert
        assert!(out.converged());
        assert_abs_diff_eq!(out.named_design["a"], 4.0 / 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(out.named_design["b"], 4.0 / 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(out.ineq["margin"], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.eq["balance"], 0.0, epsilon = 1e-5);
        assert_abs_diff_eq!(out.cost, 32.0 / 9.0, epsilon = 1e-4);
    }

    #[test]
    // Purpose
    // -------
    // Models with random variables and unknown outputs are rejected.
    fn eval_min_rejects_random_models_and_unknown_outputs() {
        let beam = cantilever_beam().unwrap();
        assert_eq!(
            eval_min(&beam, "c_area", &[], &[], None, &ConstrainedOptions::default()),
            Err(RbdoError::RandomVariablesPresent { count: 4 })
        );
        assert!(matches!(
            eval_min(&plate(), "volume", &[], &[], None, &ConstrainedOptions::default()),
            Err(RbdoError::Model(_))
        ));
    }

    /// y = a·x + b + c with x observed, c pinned at zero by its bounds.
    fn line() -> Model {
        ModelBuilder::new("line")
            .deterministic_with_nominal("a", -10.0, 10.0, 0.5)
            .unwrap()
            .deterministic_with_nominal("b", -10.0, 10.0, 0.0)
            .unwrap()
            .deterministic_with_nominal("c", 0.0, 0.0, 0.0)
            .unwrap()
            .deterministic("x", 0.0, 1.0)
            .unwrap()
            .function("f", &["a", "b", "c", "x"], &["y"], |v| vec![v[0] * v[3] + v[1] + v[2]])
            .unwrap()
            .build()
            .unwrap()
    }

    fn line_data() -> FitData {
        let x = array![0.0, 0.25, 0.5, 0.75, 1.0];
        let y = x.mapv(|x| 2.0 * x + 1.0);
        let values = ndarray::stack(Axis(1), &[x.view(), y.view()]).unwrap();
        FitData::new(&["x", "y"], values).unwrap()
    }

    #[test]
    // Purpose
    // -------
    // Least squares recovers exact line coefficients, and fixing a variable
    // refits the others around its nominal value.
    //
    // Given
    // -----
    // - Data y = 2x + 1 at x ∈ {0, 0.25, 0.5, 0.75, 1}.
    // - c has zero width and is fixed without being named.
    //
    // Expect
    // ------
    // - Free fit: (a, b) = (2, 1), MSE ≈ 0, c absent from the result.
    // - b fixed at 0: a = Σx(2x + 1) / Σx² = 10/3 and MSE = 1/3.
    fn eval_nls_fits_line_and_honours_fixed_variables() {
        // Arrange
        let model = line();
        let data = line_data();
        let opts = ConstrainedOptions::default();

        // Act
        let free = eval_nls(&model, &data, &["y"], &[], &opts).unwrap();
        let pinned = eval_nls(&model, &data, &[], &["b"], &opts).unwrap();

        // Assert
        assert!(free.converged());
        assert_eq!(free.fitted.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_abs_diff_eq!(free.fitted["a"], 2.0, epsilon = 1e-4);
        assert_abs_diff_eq!(free.fitted["b"], 1.0, epsilon = 1e-4);
        assert_abs_diff_eq!(free.mse, 0.0, epsilon = 1e-8);
        assert_eq!(free.initial["a"], 0.5);

        assert_eq!(pinned.fitted.len(), 1);
        assert_abs_diff_eq!(pinned.fitted["a"], 10.0 / 3.0, epsilon = 1e-4);
        assert_abs_diff_eq!(pinned.mse, 1.0 / 3.0, epsilon = 1e-6);
    }

    #[test]
    // Purpose
    // -------
    // Random variables are fitted inside the support of their marginal,
    // starting from the median.
    //
    // Given
    // -----
    // - y = s·x with s ~ LogNormal(0, 0.5) and data y = 3x.
    //
    // Expect
    // ------
    // - s ≈ 3, started at the median 1.
    fn eval_nls_fits_random_variables_within_support() {
        // Arrange
        let model = ModelBuilder::new("scale")
            .deterministic("x", 0.0, 1.0)
            .unwrap()
            .random("s", Marginal::lognormal(0.0, 0.5).unwrap(), Sensitivity::Increases)
            .unwrap()
            .function("f", &["x", "s"], &["y"], |v| vec![v[0] * v[1]])
            .unwrap()
            .build()
            .unwrap();
        let data = FitData::new(&["x", "y"], array![[0.2, 0.6], [0.5, 1.5], [1.0, 3.0]]).unwrap();

        // Act
        let out = eval_nls(&model, &data, &["y"], &[], &ConstrainedOptions::default()).unwrap();

        // Assert
        assert_abs_diff_eq!(out.initial["s"], 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(out.fitted["s"], 3.0, epsilon = 1e-4);
    }

    #[test]
    // Purpose
    // -------
    // Malformed data, outputs without columns, unknown fixed names and fits
    // with nothing left to vary are reported before any solve.
    fn eval_nls_rejects_bad_requests() {
        let model = line();
        let opts = ConstrainedOptions::default();
        assert!(matches!(
            FitData::new(&["x", "x"], array![[0.0, 1.0]]),
            Err(RbdoError::InvalidFitData { .. })
        ));
        assert!(matches!(
            FitData::new(&["x"], array![[f64::NAN]]),
            Err(RbdoError::InvalidFitData { .. })
        ));
        assert!(matches!(
            FitData::new(&["x", "y"], array![[0.0]]),
            Err(RbdoError::InvalidFitData { .. })
        ));
        let no_y = FitData::new(&["x"], array![[0.0], [1.0]]).unwrap();
        assert_eq!(
            eval_nls(&model, &no_y, &["y"], &[], &opts),
            Err(RbdoError::MissingColumn { name: "y".to_string() })
        );
        assert!(matches!(
            eval_nls(&model, &line_data(), &["y"], &["zz"], &opts),
            Err(RbdoError::Model(ModelError::UnknownVariable { .. }))
        ));
        assert_eq!(
            eval_nls(&model, &line_data(), &["y"], &["a", "b"], &opts),
            Err(RbdoError::NothingToFit)
        );
    }

    #[test]
    // Purpose
    // -------
    // Output gradients cover deterministic and random variables in
    // declaration order.
    //
    // Given
    // -----
    // - q = a²·x + 3b with a, b deterministic and x random, at (1, 2, 2).
    //
    // Expect
    // ------
    // - (∂q/∂a, ∂q/∂b, ∂q/∂x) = (4, 3, 1); unknown names give `None`.
    fn eval_grad_fd_matches_analytic_derivatives() {
        // Arrange
        let model = ModelBuilder::new("grad")
            .deterministic("a", -5.0, 5.0)
            .unwrap()
            .deterministic("b", -5.0, 5.0)
            .unwrap()
            .random("x", Marginal::normal(2.0, 1.0).unwrap(), Sensitivity::Increases)
            .unwrap()
            .function("f", &["a", "b", "x"], &["q"], |v| vec![v[0] * v[0] * v[2] + 3.0 * v[1]])
            .unwrap()
            .build()
            .unwrap();

        // Act
        let grad = eval_grad_fd(&model, &array![1.0, 2.0], &array![2.0]).unwrap();

        // Assert
        assert_eq!(grad.variables, vec!["a", "b", "x"]);
        assert_eq!(grad.jacobian.dim(), (1, 3));
        assert_abs_diff_eq!(grad.get("q", "a").unwrap(), 4.0, epsilon = 1e-5);
        assert_abs_diff_eq!(grad.get("q", "b").unwrap(), 3.0, epsilon = 1e-5);
        assert_abs_diff_eq!(grad.get("q", "x").unwrap(), 1.0, epsilon = 1e-5);
        assert_eq!(grad.get("g", "a"), None);
        assert!(matches!(
            eval_grad_fd(&model, &array![1.0], &array![2.0]),
            Err(RbdoError::Model(_))
        ));
    }
}
