//! Minimizer capability interface.
//!
//! The fitting code talks to a numerical minimizer only through [`Minimizer`],
//! whose call sequence mirrors a classic variable-metric package: register an
//! objective, register named variables with start values and step sizes,
//! configure, minimize once, then read back the minimum and its curvature-based
//! errors. Any backend that honours that contract can be dropped in via
//! [`create_minimizer`] without touching the model or objective code.

use nalgebra::DMatrix;

use crate::domain::{MinosError, Strategy};
use crate::fit::error::FitError;
use crate::fit::lbfgs::ArgminMinimizer;

/// Error definition of a chi-square objective: one-sigma errors correspond to
/// a rise of 1 above the minimum.
pub const CHI2_ERROR_DEF: f64 = 1.0;

/// A scalar function of a parameter vector.
pub trait Objective: Send + Sync {
    /// Number of parameters the function expects.
    fn dim(&self) -> usize;

    /// Evaluate the function.
    fn value(&self, x: &[f64]) -> f64;

    /// Analytic gradient, if the function provides one.
    ///
    /// Returning `None` makes the minimizer fall back to finite differences.
    fn gradient(&self, _x: &[f64]) -> Option<Vec<f64>> {
        None
    }
}

/// Numerical minimizer driven through a register/configure/run sequence.
pub trait Minimizer {
    /// Short backend/algorithm label for logs.
    fn name(&self) -> &str;

    /// Register the function to minimize. Its `dim()` sets the variable count.
    fn set_function(&mut self, objective: Box<dyn Objective>);

    /// Register (or re-register) variable `index` with a start value and an
    /// initial step size.
    fn set_variable(&mut self, index: usize, name: &str, initial: f64, step: f64)
    -> Result<(), FitError>;

    /// Keep variable `index` at its current value during minimization.
    fn fix_variable(&mut self, index: usize) -> Result<(), FitError>;

    /// Undo [`Minimizer::fix_variable`].
    fn release_variable(&mut self, index: usize) -> Result<(), FitError>;

    fn set_strategy(&mut self, strategy: Strategy);
    fn set_max_function_calls(&mut self, calls: u64);
    fn set_max_iterations(&mut self, iterations: u64);
    fn set_tolerance(&mut self, tolerance: f64);

    /// Run the minimization once.
    ///
    /// `Ok(false)` means the minimizer stopped without meeting its convergence
    /// criteria; the accessors still report the best point it found.
    /// `Err` is reserved for configuration problems.
    fn minimize(&mut self) -> Result<bool, FitError>;

    /// Best parameter vector (start values before `minimize`).
    fn best_parameters(&self) -> &[f64];

    /// Parabolic standard errors; NaN where the curvature was unusable.
    fn parameter_errors(&self) -> &[f64];

    /// Objective value at the best point.
    fn min_value(&self) -> f64;

    /// Full covariance matrix, if the Hessian could be inverted.
    fn covariance(&self) -> Option<&DMatrix<f64>>;

    /// Estimated vertical distance to the minimum.
    fn edm(&self) -> f64;

    /// Objective evaluations spent so far (gradient calls included).
    fn n_calls(&self) -> u64;

    /// Solver iterations of the last minimization.
    fn n_iterations(&self) -> u64;

    fn variable_name(&self, index: usize) -> Option<&str>;

    /// Asymmetric errors for variable `index` from a profile scan around the
    /// last minimum.
    fn minos(&mut self, index: usize) -> Result<MinosError, FitError>;
}

/// Instantiate a minimizer by backend and algorithm name.
///
/// Names are matched case-insensitively. The only backend is `argmin`, which
/// offers L-BFGS under the names `lbfgs` and `migrad`.
pub fn create_minimizer(backend: &str, algorithm: &str) -> Result<Box<dyn Minimizer>, FitError> {
    match backend.to_ascii_lowercase().as_str() {
        "argmin" => {
            let minimizer = ArgminMinimizer::with_algorithm(algorithm)?;
            tracing::info!(minimizer = minimizer.name(), "minimizer created");
            Ok(Box::new(minimizer))
        }
        _ => Err(FitError::UnknownBackend {
            name: backend.to_string(),
        }),
    }
}
