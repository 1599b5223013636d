//! Shared fit pipeline used by the `fit` and `toys` commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! dataset -> minimizer -> fit result -> report
//!
//! The command handlers can then focus on presentation (text vs JSON).

use crate::data::ToyGenerator;
use crate::domain::{Dataset, DecayParams, FitConfig, FitResult};
use crate::error::{AppError, EXIT_INVALID_INPUT};
use crate::fit::{create_minimizer, fit_decay, fit_with};
use crate::report::{FitReport, ToySummary, summarize_toys};

/// All computed outputs of a single `decayfit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub result: FitResult,
    pub report: FitReport,
}

/// Fit `dataset` once and build its report.
pub fn run_fit(dataset: &Dataset, config: &FitConfig) -> Result<RunOutput, AppError> {
    let result = fit_decay(dataset, config)?;
    tracing::info!(
        converged = result.converged,
        lambda = result.params.lambda,
        a0 = result.params.a0,
        chi2 = result.chi2,
        "fit finished"
    );
    let report = FitReport::new(config, dataset, &result);
    Ok(RunOutput { result, report })
}

/// Fit `n_toys` pseudo-datasets drawn around `truth`, one after another.
///
/// A single minimizer instance is reused for the whole batch.
pub fn run_toys(
    template: &Dataset,
    config: &FitConfig,
    truth: DecayParams,
    n_toys: usize,
    seed: u64,
) -> Result<ToySummary, AppError> {
    if n_toys == 0 {
        return Err(AppError::new(EXIT_INVALID_INPUT, "Number of toys must be at least 1."));
    }
    let mut minimizer = create_minimizer(&config.backend, &config.algorithm)?;
    let mut generator = ToyGenerator::new(template.clone(), truth, seed)?;

    let mut fits = Vec::with_capacity(n_toys);
    for i in 0..n_toys {
        let toy = generator.generate()?;
        let fit = fit_with(minimizer.as_mut(), &toy, config)?;
        tracing::debug!(toy = i, converged = fit.converged, chi2 = fit.chi2, "toy fitted");
        fits.push(fit);
    }

    let summary = summarize_toys(&generator.truth(), &fits, seed);
    tracing::info!(
        n_toys,
        n_converged = summary.n_converged,
        "pseudo-experiments finished"
    );
    Ok(summary)
}
