//! One decay fit, start to finish.
//!
//! The driver only orchestrates: it registers the chi-square objective and the
//! two named variables with a [`Minimizer`], applies the configuration, runs a
//! single minimization and copies the outcome into a [`FitResult`]. A
//! non-converged minimization is still a result, never an error.

use crate::domain::{Dataset, DecayParams, FitConfig, FitResult, ParamIndex};
use crate::fit::chi2::ChiSquare;
use crate::fit::error::FitError;
use crate::fit::minimizer::{Minimizer, create_minimizer};

/// Fit `dataset` with the minimizer named in `config`.
pub fn fit_decay(dataset: &Dataset, config: &FitConfig) -> Result<FitResult, FitError> {
    let mut minimizer = create_minimizer(&config.backend, &config.algorithm)?;
    fit_with(minimizer.as_mut(), dataset, config)
}

/// Fit `dataset` with an already constructed minimizer.
///
/// `function_calls` in the result includes evaluations spent on profile scans
/// when `config.minos` is set.
pub fn fit_with(
    minimizer: &mut dyn Minimizer,
    dataset: &Dataset,
    config: &FitConfig,
) -> Result<FitResult, FitError> {
    minimizer.set_function(Box::new(ChiSquare::new(dataset.clone())));
    for which in ParamIndex::ALL {
        minimizer.set_variable(
            which.index(),
            which.name(),
            config.initial.get(which),
            config.steps.get(which),
        )?;
    }
    minimizer.set_strategy(config.strategy);
    minimizer.set_max_function_calls(config.max_function_calls);
    minimizer.set_max_iterations(config.max_iterations);
    minimizer.set_tolerance(config.tolerance);

    let converged = minimizer.minimize()?;
    if !converged {
        tracing::warn!(
            edm = minimizer.edm(),
            calls = minimizer.n_calls(),
            "minimization did not converge"
        );
    }

    let params = DecayParams::from_slice(minimizer.best_parameters());
    let errors = DecayParams::from_slice(minimizer.parameter_errors());
    let covariance = minimizer.covariance().map(|m| {
        let mut out = [[0.0; ParamIndex::COUNT]; ParamIndex::COUNT];
        for (i, row) in out.iter_mut().enumerate() {
            for (j, v) in row.iter_mut().enumerate() {
                *v = m[(i, j)];
            }
        }
        out
    });

    let (minos_lambda, minos_a0) = if config.minos {
        (
            Some(minimizer.minos(ParamIndex::Lambda.index())?),
            Some(minimizer.minos(ParamIndex::A0.index())?),
        )
    } else {
        (None, None)
    };

    Ok(FitResult {
        params,
        errors,
        chi2: minimizer.min_value(),
        converged,
        n_points: dataset.len(),
        n_params: ParamIndex::COUNT,
        covariance,
        edm: minimizer.edm(),
        function_calls: minimizer.n_calls(),
        iterations: minimizer.n_iterations(),
        minos_lambda,
        minos_a0,
    })
}
