//! `argmin` backend: L-BFGS with a More-Thuente line search.
//!
//! A minimization runs in up to three phases:
//!
//! 1. L-BFGS from the registered start values, in coordinates scaled by a
//!    second-difference estimate of each free variable's error.
//! 2. With [`Strategy::Thorough`], one more L-BFGS pass started from the first
//!    minimum, rescaled with the curvature found there.
//! 3. A finite-difference Hessian at the minimum (forward differences for
//!    [`Strategy::Fast`], central otherwise), inverted into the covariance.
//!
//! The result counts as converged when the solver reports convergence or the
//! EDM is below `0.002 · tolerance · up`, the covariance is positive definite,
//! and the call ceiling was not hit.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use argmin::core::observers::{Observe, ObserverMode};
use argmin::core::{Error, Executor, KV, State, TerminationReason, TerminationStatus};
use argmin::solver::linesearch::MoreThuenteLineSearch;
use argmin::solver::quasinewton::LBFGS;
use nalgebra::DMatrix;

use crate::domain::{MinosError, Strategy};
use crate::fit::adapter::{ArgminProblem, CallTracker, DiffScheme, FreeLayout, full_gradient};
use crate::fit::error::FitError;
use crate::fit::hessian::{compute_hessian, covariance_from_inverse, edm, invert_hessian};
use crate::fit::minimizer::{CHI2_ERROR_DEF, Minimizer, Objective};
use crate::fit::minos::find_crossing;

const BACKEND: &str = "argmin";
const LBFGS_MEMORY: usize = 7;
const EDM_FACTOR: f64 = 0.002;

#[derive(Debug, Clone)]
struct Variable {
    name: String,
    value: f64,
    step: f64,
    fixed: bool,
}

#[derive(Debug, Clone, Copy)]
struct Settings {
    strategy: Strategy,
    max_function_calls: u64,
    max_iterations: u64,
    tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            strategy: Strategy::Default,
            max_function_calls: 10_000,
            max_iterations: 10_000,
            tolerance: 1e-6,
        }
    }
}

impl Settings {
    fn validate(&self) -> Result<(), FitError> {
        if !(self.tolerance.is_finite() && self.tolerance > 0.0) {
            return Err(FitError::InvalidSetting {
                what: "tolerance",
                value: self.tolerance,
            });
        }
        if self.max_function_calls == 0 {
            return Err(FitError::InvalidSetting {
                what: "function call limit",
                value: 0.0,
            });
        }
        if self.max_iterations == 0 {
            return Err(FitError::InvalidSetting {
                what: "iteration limit",
                value: 0.0,
            });
        }
        Ok(())
    }

    fn gradient_scheme(&self) -> DiffScheme {
        match self.strategy {
            Strategy::Fast => DiffScheme::Forward,
            Strategy::Default | Strategy::Thorough => DiffScheme::Central,
        }
    }
}

/// Outcome of one L-BFGS pass.
#[derive(Debug, Clone)]
struct Pass {
    x: Vec<f64>,
    fval: f64,
    solver_converged: bool,
    iterations: u64,
    hit_call_limit: bool,
}

/// Counts completed solver iterations; survives a run that ends in an error.
#[derive(Debug, Clone, Default)]
struct IterationCounter(Arc<AtomicU64>);

impl IterationCounter {
    fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

impl<I> Observe<I> for IterationCounter {
    fn observe_iter(&mut self, _state: &I, _kv: &KV) -> Result<(), Error> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// What `argmin` reports after a completed run.
struct SolverSummary {
    best_u: Vec<f64>,
    best_cost: f64,
    converged: bool,
    iterations: u64,
    termination: String,
}

fn run_lbfgs(
    problem: ArgminProblem<'_>,
    u0: Vec<f64>,
    max_iterations: u64,
    tolerance: f64,
    counter: &IterationCounter,
) -> Result<SolverSummary, Error> {
    let linesearch = MoreThuenteLineSearch::new();
    let solver = LBFGS::new(linesearch, LBFGS_MEMORY)
        .with_tolerance_grad(tolerance)?
        .with_tolerance_cost(0.1 * tolerance)?;

    let res = Executor::new(problem, solver)
        .configure(|state| state.param(u0).max_iters(max_iterations))
        .add_observer(counter.clone(), ObserverMode::Always)
        .run()?;

    let state = res.state();
    let best_u = state
        .get_best_param()
        .ok_or_else(|| Error::msg("no best parameters found"))?
        .clone();
    let termination = state.get_termination_status();
    let converged = matches!(
        termination,
        TerminationStatus::Terminated(TerminationReason::SolverConverged)
            | TerminationStatus::Terminated(TerminationReason::TargetCostReached)
    );
    Ok(SolverSummary {
        best_u,
        best_cost: state.get_best_cost(),
        converged,
        iterations: state.get_iter(),
        termination: termination.to_string(),
    })
}

/// One budgeted minimization context: a call tracker shared by every pass.
struct Session<'a> {
    objective: &'a dyn Objective,
    tracker: CallTracker,
    settings: Settings,
}

impl<'a> Session<'a> {
    fn new(objective: &'a dyn Objective, settings: Settings) -> Self {
        Self {
            objective,
            tracker: CallTracker::new(settings.max_function_calls),
            settings,
        }
    }

    fn evaluate(&self, x: &[f64]) -> Option<f64> {
        self.tracker.charge(1).ok()?;
        let value = self.objective.value(x);
        self.tracker.record(x, value);
        value.is_finite().then_some(value)
    }

    /// Per-variable scale `sqrt(2·up / f'')` from a three-point second
    /// difference with the user's step; the step itself when the curvature is
    /// not positive.
    fn seed_scales(&self, start: &[f64], free: &[usize], steps: &[f64]) -> Vec<f64> {
        let f0 = self.evaluate(start);
        free.iter()
            .zip(steps)
            .map(|(&i, &h)| {
                let mut xp = start.to_vec();
                let mut xm = start.to_vec();
                xp[i] += h;
                xm[i] -= h;
                match (f0, self.evaluate(&xp), self.evaluate(&xm)) {
                    (Some(f0), Some(fp), Some(fm)) => {
                        let d2 = (fp - 2.0 * f0 + fm) / (h * h);
                        if d2.is_finite() && d2 > 0.0 {
                            (2.0 * CHI2_ERROR_DEF / d2).sqrt()
                        } else {
                            h
                        }
                    }
                    _ => h,
                }
            })
            .collect()
    }

    fn run(&self, start: &[f64], free: &[usize], steps: &[f64]) -> Pass {
        let scale = self.seed_scales(start, free, steps);
        let layout = FreeLayout::new(start.to_vec(), free.to_vec(), scale);
        let problem = ArgminProblem::new(
            self.objective,
            &layout,
            &self.tracker,
            self.settings.gradient_scheme(),
        );

        let counter = IterationCounter::default();
        match run_lbfgs(
            problem,
            layout.start(),
            self.settings.max_iterations,
            self.settings.tolerance,
            &counter,
        ) {
            Ok(summary) => {
                tracing::debug!(
                    termination = %summary.termination,
                    iterations = summary.iterations,
                    fval = summary.best_cost,
                    "L-BFGS pass finished"
                );
                Pass {
                    x: layout.to_full(&summary.best_u),
                    fval: summary.best_cost,
                    solver_converged: summary.converged,
                    iterations: summary.iterations,
                    hit_call_limit: false,
                }
            }
            Err(err) => {
                let err = FitError::from_solver(err);
                tracing::warn!(
                    error = %err,
                    iterations = counter.get(),
                    "L-BFGS pass stopped early; using best point seen"
                );
                let (x, fval) = match self.tracker.best() {
                    Some(best) => (best.x, best.value),
                    None => (start.to_vec(), self.objective.value(start)),
                };
                Pass {
                    x,
                    fval,
                    solver_converged: false,
                    iterations: counter.get(),
                    hit_call_limit: matches!(err, FitError::CallLimit { .. }),
                }
            }
        }
    }
}

/// Everything `minimize` computes, assembled before touching `self`.
struct Minimum {
    x: Vec<f64>,
    fval: f64,
    errors: Vec<f64>,
    covariance: Option<DMatrix<f64>>,
    edm: f64,
    converged: bool,
    calls: u64,
    iterations: u64,
}

fn locate_minimum(
    objective: &dyn Objective,
    start: &[f64],
    free: &[usize],
    steps: &[f64],
    settings: Settings,
) -> Minimum {
    let session = Session::new(objective, settings);
    let mut pass = session.run(start, free, steps);

    if settings.strategy == Strategy::Thorough && !pass.hit_call_limit {
        let polished = session.run(&pass.x, free, steps);
        tracing::debug!(before = pass.fval, after = polished.fval, "polishing pass finished");
        let iterations = pass.iterations + polished.iterations;
        if polished.fval <= pass.fval {
            pass = polished;
        } else {
            pass.hit_call_limit |= polished.hit_call_limit;
        }
        pass.iterations = iterations;
    }

    // Curvature is always computed, even past the call ceiling.
    let uncharged = |n: u64| -> Result<(), FitError> {
        session.tracker.add_uncharged(n);
        Ok(())
    };
    let inverse = compute_hessian(
        objective,
        &pass.x,
        free,
        settings.gradient_scheme(),
        uncharged,
    )
    .ok()
    .and_then(|h| invert_hessian(&h));
    let gradient = full_gradient(objective, &pass.x, free, DiffScheme::Central, uncharged).ok();

    let dim = start.len();
    let mut errors = vec![0.0; dim];
    let mut covariance = None;
    let mut edm_value = f64::NAN;
    match &inverse {
        Some(inv) => {
            let cov_free = covariance_from_inverse(inv, CHI2_ERROR_DEF);
            let mut full = DMatrix::zeros(dim, dim);
            for (r, &i) in free.iter().enumerate() {
                for (c, &j) in free.iter().enumerate() {
                    full[(i, j)] = cov_free[(r, c)];
                }
                errors[i] = cov_free[(r, r)].sqrt();
            }
            if let Some(g) = gradient {
                let g_free: Vec<f64> = free.iter().map(|&i| g[i]).collect();
                edm_value = edm(&g_free, inv);
            }
            covariance = Some(full);
        }
        None => {
            for &i in free {
                errors[i] = f64::NAN;
            }
        }
    }

    let edm_limit = EDM_FACTOR * settings.tolerance * CHI2_ERROR_DEF;
    let edm_ok = edm_value.is_finite() && edm_value < edm_limit;
    let converged =
        (pass.solver_converged || edm_ok) && covariance.is_some() && !pass.hit_call_limit;

    Minimum {
        x: pass.x,
        fval: pass.fval,
        errors,
        covariance,
        edm: edm_value,
        converged,
        calls: session.tracker.calls(),
        iterations: pass.iterations,
    }
}

/// L-BFGS minimizer with Hessian-based errors and profile scans.
pub struct ArgminMinimizer {
    objective: Option<Box<dyn Objective>>,
    variables: Vec<Option<Variable>>,
    settings: Settings,

    x: Vec<f64>,
    errors: Vec<f64>,
    fval: f64,
    covariance: Option<DMatrix<f64>>,
    edm: f64,
    calls: u64,
    iterations: u64,
    minimized: bool,
}

impl Default for ArgminMinimizer {
    fn default() -> Self {
        Self {
            objective: None,
            variables: Vec::new(),
            settings: Settings::default(),
            x: Vec::new(),
            errors: Vec::new(),
            fval: f64::NAN,
            covariance: None,
            edm: f64::NAN,
            calls: 0,
            iterations: 0,
            minimized: false,
        }
    }
}

impl ArgminMinimizer {
    /// `name` selects the algorithm; `lbfgs` and its alias `migrad` are known.
    pub fn with_algorithm(name: &str) -> Result<Self, FitError> {
        match name.to_ascii_lowercase().as_str() {
            "lbfgs" | "migrad" => Ok(Self::default()),
            _ => Err(FitError::UnknownAlgorithm {
                backend: BACKEND.to_string(),
                name: name.to_string(),
            }),
        }
    }

    fn dim(&self) -> Result<usize, FitError> {
        self.objective
            .as_deref()
            .map(|o| o.dim())
            .ok_or(FitError::NoFunction)
    }

    fn check_index(&self, index: usize) -> Result<(), FitError> {
        let dim = self.dim()?;
        if index >= dim {
            return Err(FitError::VariableIndex { index, dim });
        }
        Ok(())
    }

    fn variable_mut(&mut self, index: usize) -> Result<&mut Variable, FitError> {
        self.check_index(index)?;
        self.variables[index]
            .as_mut()
            .ok_or(FitError::MissingVariable { index })
    }

    fn registered(&self) -> Result<Vec<&Variable>, FitError> {
        self.variables
            .iter()
            .enumerate()
            .map(|(index, v)| v.as_ref().ok_or(FitError::MissingVariable { index }))
            .collect()
    }
}

impl Minimizer for ArgminMinimizer {
    fn name(&self) -> &str {
        "argmin/lbfgs"
    }

    fn set_function(&mut self, objective: Box<dyn Objective>) {
        let dim = objective.dim();
        self.objective = Some(objective);
        self.variables = vec![None; dim];
        self.x = vec![f64::NAN; dim];
        self.errors = vec![f64::NAN; dim];
        self.fval = f64::NAN;
        self.covariance = None;
        self.edm = f64::NAN;
        self.calls = 0;
        self.iterations = 0;
        self.minimized = false;
    }

    fn set_variable(
        &mut self,
        index: usize,
        name: &str,
        initial: f64,
        step: f64,
    ) -> Result<(), FitError> {
        self.check_index(index)?;
        if !initial.is_finite() {
            return Err(FitError::InvalidSetting {
                what: "start value",
                value: initial,
            });
        }
        if !(step.is_finite() && step > 0.0) {
            return Err(FitError::InvalidSetting {
                what: "step size",
                value: step,
            });
        }
        self.variables[index] = Some(Variable {
            name: name.to_string(),
            value: initial,
            step,
            fixed: false,
        });
        self.x[index] = initial;
        tracing::debug!(index, name, initial, step, "variable registered");
        Ok(())
    }

    fn fix_variable(&mut self, index: usize) -> Result<(), FitError> {
        self.variable_mut(index)?.fixed = true;
        Ok(())
    }

    fn release_variable(&mut self, index: usize) -> Result<(), FitError> {
        self.variable_mut(index)?.fixed = false;
        Ok(())
    }

    fn set_strategy(&mut self, strategy: Strategy) {
        self.settings.strategy = strategy;
    }

    fn set_max_function_calls(&mut self, calls: u64) {
        self.settings.max_function_calls = calls;
    }

    fn set_max_iterations(&mut self, iterations: u64) {
        self.settings.max_iterations = iterations;
    }

    fn set_tolerance(&mut self, tolerance: f64) {
        self.settings.tolerance = tolerance;
    }

    fn minimize(&mut self) -> Result<bool, FitError> {
        self.settings.validate()?;
        let objective = self.objective.as_deref().ok_or(FitError::NoFunction)?;
        let variables = self.registered()?;

        let start: Vec<f64> = variables.iter().map(|v| v.value).collect();
        let free: Vec<usize> = (0..variables.len()).filter(|&i| !variables[i].fixed).collect();
        if free.is_empty() {
            return Err(FitError::NoFreeVariables);
        }
        let steps: Vec<f64> = free.iter().map(|&i| variables[i].step).collect();

        tracing::info!(
            n_free = free.len(),
            strategy = self.settings.strategy.level(),
            "minimization started"
        );
        let minimum = locate_minimum(objective, &start, &free, &steps, self.settings);
        tracing::info!(
            fval = minimum.fval,
            edm = minimum.edm,
            calls = minimum.calls,
            converged = minimum.converged,
            "minimization finished"
        );

        self.x = minimum.x;
        self.fval = minimum.fval;
        self.errors = minimum.errors;
        self.covariance = minimum.covariance;
        self.edm = minimum.edm;
        self.calls += minimum.calls;
        self.iterations = minimum.iterations;
        self.minimized = true;
        Ok(minimum.converged)
    }

    fn best_parameters(&self) -> &[f64] {
        &self.x
    }

    fn parameter_errors(&self) -> &[f64] {
        &self.errors
    }

    fn min_value(&self) -> f64 {
        self.fval
    }

    fn covariance(&self) -> Option<&DMatrix<f64>> {
        self.covariance.as_ref()
    }

    fn edm(&self) -> f64 {
        self.edm
    }

    fn n_calls(&self) -> u64 {
        self.calls
    }

    fn n_iterations(&self) -> u64 {
        self.iterations
    }

    fn variable_name(&self, index: usize) -> Option<&str> {
        self.variables.get(index)?.as_ref().map(|v| v.name.as_str())
    }

    fn minos(&mut self, index: usize) -> Result<MinosError, FitError> {
        if !self.minimized {
            return Err(FitError::NotMinimized);
        }
        self.check_index(index)?;
        let objective = self.objective.as_deref().ok_or(FitError::NoFunction)?;
        let variables = self.registered()?;
        if variables[index].fixed {
            return Ok(MinosError {
                lower: 0.0,
                upper: 0.0,
                lower_valid: false,
                upper_valid: false,
            });
        }

        let others: Vec<usize> = (0..variables.len())
            .filter(|&i| i != index && !variables[i].fixed)
            .collect();
        // Steps for the conditional fits: parabolic errors where usable.
        let steps: Vec<f64> = others
            .iter()
            .map(|&i| {
                let e = self.errors[i];
                if e.is_finite() && e > 0.0 { e } else { variables[i].step }
            })
            .collect();
        let settings = Settings {
            strategy: Strategy::Default,
            ..self.settings
        };
        let best = &self.x;
        let mut calls = 0_u64;

        let mut profile = |value: f64| -> Option<f64> {
            let mut start = best.clone();
            start[index] = value;
            let fval = if others.is_empty() {
                calls += 1;
                objective.value(&start)
            } else {
                let session = Session::new(objective, settings);
                let pass = session.run(&start, &others, &steps);
                calls += session.tracker.calls();
                pass.fval
            };
            fval.is_finite().then_some(fval)
        };

        let (center, sigma, fmin) = (self.x[index], self.errors[index], self.fval);
        let lower = find_crossing(center, sigma, fmin, CHI2_ERROR_DEF, -1.0, &mut profile);
        let upper = find_crossing(center, sigma, fmin, CHI2_ERROR_DEF, 1.0, &mut profile);

        tracing::info!(
            variable = variables[index].name.as_str(),
            lower = lower.offset,
            upper = upper.offset,
            calls,
            "profile scan finished"
        );
        self.calls += calls;
        Ok(MinosError {
            lower: lower.offset,
            upper: upper.offset,
            lower_valid: lower.valid,
            upper_valid: upper.valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DataPoint, Dataset, ParamIndex};
    use crate::fit::chi2::ChiSquare;
    use approx::assert_relative_eq;

    /// Correlated two-parameter chi-square with minimum 0 at (1, 2).
    struct Quadratic;

    impl Objective for Quadratic {
        fn dim(&self) -> usize {
            2
        }

        fn value(&self, x: &[f64]) -> f64 {
            let (a, b) = (x[0] - 1.0, x[1] - 2.0);
            4.0 * a * a + 2.0 * a * b + 2.0 * b * b
        }
    }

    fn quadratic_minimizer() -> ArgminMinimizer {
        let mut m = ArgminMinimizer::default();
        m.set_function(Box::new(Quadratic));
        m.set_variable(0, "a", 0.0, 0.1).unwrap();
        m.set_variable(1, "b", 0.0, 0.1).unwrap();
        m
    }

    #[test]
    fn finds_quadratic_minimum_and_errors() {
        for level in 0..=2 {
            let mut m = quadratic_minimizer();
            m.set_strategy(Strategy::from_level(level).unwrap());
            assert!(m.minimize().unwrap(), "strategy {level} did not converge");

            let x = m.best_parameters();
            assert_relative_eq!(x[0], 1.0, epsilon = 1e-3);
            assert_relative_eq!(x[1], 2.0, epsilon = 1e-3);
            assert!(m.min_value() < 1e-6);

            let e = m.parameter_errors();
            assert_relative_eq!(e[0], (8.0_f64 / 28.0).sqrt(), max_relative = 1e-3);
            assert_relative_eq!(e[1], (16.0_f64 / 28.0).sqrt(), max_relative = 1e-3);

            let cov = m.covariance().unwrap();
            assert_relative_eq!(cov[(0, 1)], -4.0 / 28.0, epsilon = 1e-3);
            assert!(m.edm() >= 0.0 && m.edm() < 1e-4);
            assert!(m.n_calls() > 0);
        }
    }

    #[test]
    fn fixed_variable_stays_put() {
        let mut m = quadratic_minimizer();
        m.fix_variable(1).unwrap();
        assert!(m.minimize().unwrap());

        // With b = 0 the minimum in a is where 8(a-1) - 4 = 0.
        let x = m.best_parameters();
        assert_relative_eq!(x[0], 1.5, epsilon = 1e-3);
        assert_eq!(x[1], 0.0);
        assert_eq!(m.parameter_errors()[1], 0.0);

        m.release_variable(1).unwrap();
        assert!(m.minimize().unwrap());
        assert_relative_eq!(m.best_parameters()[1], 2.0, epsilon = 1e-3);
    }

    #[test]
    fn call_limit_reports_failure_with_best_point() {
        let mut m = quadratic_minimizer();
        m.set_max_function_calls(8);
        let start_value = Quadratic.value(&[0.0, 0.0]);
        assert!(!m.minimize().unwrap());
        assert!(m.min_value().is_finite());
        assert!(m.min_value() <= start_value);
    }

    /// Rosenbrock valley with an analytic gradient; slow for any
    /// quasi-Newton method from the classic start.
    struct Valley;

    impl Objective for Valley {
        fn dim(&self) -> usize {
            2
        }

        fn value(&self, x: &[f64]) -> f64 {
            (1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2)
        }

        fn gradient(&self, x: &[f64]) -> Option<Vec<f64>> {
            let r = x[1] - x[0] * x[0];
            Some(vec![-2.0 * (1.0 - x[0]) - 400.0 * x[0] * r, 200.0 * r])
        }
    }

    #[test]
    fn iterations_are_counted_when_the_budget_runs_out() {
        let mut m = ArgminMinimizer::default();
        m.set_function(Box::new(Valley));
        m.set_variable(0, "x", -1.2, 0.1).unwrap();
        m.set_variable(1, "y", 1.0, 0.1).unwrap();
        m.set_strategy(Strategy::Default);
        m.set_max_function_calls(30);
        assert!(!m.minimize().unwrap());
        assert!(m.n_iterations() > 0);
        assert!(m.min_value() < Valley.value(&[-1.2, 1.0]));
    }

    #[test]
    fn configuration_errors() {
        let mut m = ArgminMinimizer::default();
        assert!(matches!(m.set_variable(0, "a", 1.0, 0.1), Err(FitError::NoFunction)));
        assert!(matches!(m.minimize(), Err(FitError::NoFunction)));

        m.set_function(Box::new(Quadratic));
        assert!(matches!(
            m.set_variable(2, "c", 1.0, 0.1),
            Err(FitError::VariableIndex { index: 2, dim: 2 })
        ));
        assert!(matches!(
            m.set_variable(0, "a", 1.0, 0.0),
            Err(FitError::InvalidSetting { what: "step size", .. })
        ));
        m.set_variable(0, "a", 1.0, 0.1).unwrap();
        assert!(matches!(m.minimize(), Err(FitError::MissingVariable { index: 1 })));

        m.set_variable(1, "b", 1.0, 0.1).unwrap();
        m.set_tolerance(-1.0);
        assert!(matches!(
            m.minimize(),
            Err(FitError::InvalidSetting { what: "tolerance", .. })
        ));
        m.set_tolerance(1e-6);
        m.fix_variable(0).unwrap();
        m.fix_variable(1).unwrap();
        assert!(matches!(m.minimize(), Err(FitError::NoFreeVariables)));
        assert_eq!(m.variable_name(1), Some("b"));
    }

    #[test]
    fn minos_requires_a_minimum() {
        let mut m = quadratic_minimizer();
        assert!(matches!(m.minos(0), Err(FitError::NotMinimized)));
    }

    #[test]
    fn minos_matches_parabolic_error_for_quadratic() {
        let mut m = quadratic_minimizer();
        assert!(m.minimize().unwrap());
        let sigma = m.parameter_errors()[0];
        let me = m.minos(0).unwrap();
        assert!(me.is_valid());
        assert_relative_eq!(me.upper, sigma, max_relative = 1e-2);
        assert_relative_eq!(me.lower, -sigma, max_relative = 1e-2);
    }

    #[test]
    fn minos_recovers_asymmetric_error_bars() {
        // One measurement at t = 0: A0 = 100 with -10 / +5.
        let ds = Dataset::new(vec![DataPoint::new(100.0, 0.0, 10.0, 5.0)]).unwrap();
        let mut m = ArgminMinimizer::default();
        m.set_function(Box::new(ChiSquare::new(ds)));
        m.set_variable(ParamIndex::Lambda.index(), "lambda", 0.1, 0.01).unwrap();
        m.set_variable(ParamIndex::A0.index(), "A0", 90.0, 1.0).unwrap();
        m.fix_variable(ParamIndex::Lambda.index()).unwrap();
        m.minimize().unwrap();
        assert_relative_eq!(m.best_parameters()[1], 100.0, epsilon = 1e-2);

        let me = m.minos(ParamIndex::A0.index()).unwrap();
        assert!(me.is_valid());
        assert_relative_eq!(me.upper, 5.0, epsilon = 5e-2);
        assert_relative_eq!(me.lower, -10.0, epsilon = 5e-2);

        let fixed = m.minos(ParamIndex::Lambda.index()).unwrap();
        assert!(!fixed.is_valid());
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        assert!(ArgminMinimizer::with_algorithm("MIGRAD").is_ok());
        assert!(matches!(
            ArgminMinimizer::with_algorithm("simplex"),
            Err(FitError::UnknownAlgorithm { .. })
        ));
    }
}
