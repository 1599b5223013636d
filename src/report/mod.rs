//! Reporting utilities: residuals, JSON reports, and pseudo-experiment summaries.
//!
//! Everything here is computed from finished fits; nothing in this module
//! talks to a minimizer.

use serde::{Deserialize, Serialize};

use crate::domain::{
    Dataset, DecayParams, FitConfig, FitResult, ParamIndex, PointResidual, Strategy,
    float_or_null,
};
use crate::models::predict;

pub mod format;

pub use format::*;

/// Fitted value and residual for each measurement.
///
/// Non-finite predictions (extreme `λ·t`) are carried through as-is.
pub fn compute_residuals(dataset: &Dataset, params: &DecayParams) -> Vec<PointResidual> {
    dataset
        .points()
        .iter()
        .map(|p| {
            let predicted = predict(params, p.t);
            let diff = predicted - p.observed;
            let error_used = p.error_for(diff);
            let pull = diff / error_used;
            PointResidual {
                point: *p,
                predicted,
                diff,
                error_used,
                pull,
                chi2_term: pull * pull,
            }
        })
        .collect()
}

/// Machine-readable record of one fit (`--json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitReport {
    pub backend: String,
    pub algorithm: String,
    pub strategy: Strategy,
    pub result: FitResult,
    pub ndf: usize,
    pub chi2_per_ndf: Option<f64>,
    pub correlation: Option<f64>,
    pub residuals: Vec<PointResidual>,
}

impl FitReport {
    pub fn new(config: &FitConfig, dataset: &Dataset, result: &FitResult) -> Self {
        let ndf = result.ndf();
        Self {
            backend: config.backend.clone(),
            algorithm: config.algorithm.clone(),
            strategy: config.strategy,
            result: result.clone(),
            ndf,
            chi2_per_ndf: (ndf > 0).then(|| result.chi2 / ndf as f64),
            correlation: result.correlation(),
            residuals: compute_residuals(dataset, &result.params),
        }
    }
}

/// Spread of one parameter over the converged toys.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParamSummary {
    pub truth: f64,
    #[serde(with = "float_or_null")]
    pub mean: f64,
    #[serde(with = "float_or_null")]
    pub std_dev: f64,
    /// Average reported parabolic error.
    #[serde(with = "float_or_null")]
    pub mean_error: f64,
    /// Mean of `(fit - truth) / error`; near 0 for an unbiased fit.
    #[serde(with = "float_or_null")]
    pub pull_mean: f64,
    /// Standard deviation of the pulls; near 1 when errors are well estimated.
    #[serde(with = "float_or_null")]
    pub pull_std: f64,
}

/// Aggregate over a batch of pseudo-experiments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToySummary {
    pub n_toys: usize,
    pub n_converged: usize,
    pub seed: u64,
    pub lambda: ParamSummary,
    pub a0: ParamSummary,
    #[serde(with = "float_or_null")]
    pub chi2_mean: f64,
}

impl ToySummary {
    pub fn converged_fraction(&self) -> f64 {
        if self.n_toys == 0 {
            return f64::NAN;
        }
        self.n_converged as f64 / self.n_toys as f64
    }

    pub fn param(&self, which: ParamIndex) -> &ParamSummary {
        match which {
            ParamIndex::Lambda => &self.lambda,
            ParamIndex::A0 => &self.a0,
        }
    }
}

/// Summarize toy fits; only converged fits enter the statistics.
pub fn summarize_toys(truth: &DecayParams, fits: &[FitResult], seed: u64) -> ToySummary {
    let converged: Vec<&FitResult> = fits.iter().filter(|f| f.converged).collect();
    let chi2: Vec<f64> = converged.iter().map(|f| f.chi2).collect();

    ToySummary {
        n_toys: fits.len(),
        n_converged: converged.len(),
        seed,
        lambda: summarize_param(ParamIndex::Lambda, truth, &converged),
        a0: summarize_param(ParamIndex::A0, truth, &converged),
        chi2_mean: mean(&chi2),
    }
}

fn summarize_param(which: ParamIndex, truth: &DecayParams, fits: &[&FitResult]) -> ParamSummary {
    let t = truth.get(which);
    let values: Vec<f64> = fits.iter().map(|f| f.params.get(which)).collect();
    let errors: Vec<f64> = fits.iter().map(|f| f.errors.get(which)).collect();
    let pulls: Vec<f64> = fits
        .iter()
        .filter_map(|f| {
            let e = f.errors.get(which);
            (e.is_finite() && e > 0.0).then(|| (f.params.get(which) - t) / e)
        })
        .collect();

    ParamSummary {
        truth: t,
        mean: mean(&values),
        std_dev: std_dev(&values),
        mean_error: mean(&errors),
        pull_mean: mean(&pulls),
        pull_std: std_dev(&pulls),
    }
}

fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return f64::NAN;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
fn std_dev(xs: &[f64]) -> f64 {
    match xs.len() {
        0 => f64::NAN,
        1 => 0.0,
        n => {
            let m = mean(xs);
            let ss: f64 = xs.iter().map(|x| (x - m).powi(2)).sum();
            (ss / (n - 1) as f64).sqrt()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::REFERENCE_TRUTH;
    use crate::domain::DataPoint;

    fn sample_result(lambda: f64, a0: f64, converged: bool) -> FitResult {
        FitResult {
            params: DecayParams::new(lambda, a0),
            errors: DecayParams::new(0.002, 20.0),
            chi2: 2.0,
            converged,
            n_points: 9,
            n_params: 2,
            covariance: Some([[4e-6, 0.02], [0.02, 400.0]]),
            edm: 1e-9,
            function_calls: 120,
            iterations: 14,
            minos_lambda: None,
            minos_a0: None,
        }
    }

    #[test]
    fn residuals_use_sign_dependent_error() {
        let ds = Dataset::new(vec![
            DataPoint::new(100.0, 0.0, 10.0, 5.0),
            DataPoint::new(120.0, 0.0, 10.0, 5.0),
        ])
        .unwrap();
        let rows = compute_residuals(&ds, &DecayParams::new(0.1, 110.0));
        // Prediction above the first point, below the second.
        assert_eq!(rows[0].error_used, 5.0);
        assert_eq!(rows[0].pull, 2.0);
        assert_eq!(rows[1].error_used, 10.0);
        assert_eq!(rows[1].pull, -1.0);
        assert_eq!(rows[0].chi2_term + rows[1].chi2_term, 5.0);
    }

    #[test]
    fn residual_chi2_terms_sum_to_chi_square() {
        let ds = Dataset::reference();
        let p = DecayParams::new(0.105, 980.0);
        let total: f64 = compute_residuals(&ds, &p).iter().map(|r| r.chi2_term).sum();
        let direct = crate::fit::chi_square(&p, &ds);
        assert!((total - direct).abs() < 1e-9 * direct.max(1.0));
    }

    #[test]
    fn report_carries_fit_and_residuals() {
        let ds = Dataset::reference();
        let result = sample_result(0.1, 1000.0, true);
        let report = FitReport::new(&FitConfig::default(), &ds, &result);
        assert_eq!(report.ndf, 7);
        assert_eq!(report.residuals.len(), 9);
        assert!((report.chi2_per_ndf.unwrap() - 2.0 / 7.0).abs() < 1e-12);
        assert!((report.correlation.unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn toy_summary_ignores_failed_fits() {
        let fits = vec![
            sample_result(0.098, 990.0, true),
            sample_result(0.102, 1010.0, true),
            sample_result(5.0, -3.0, false),
        ];
        let s = summarize_toys(&REFERENCE_TRUTH, &fits, 42);
        assert_eq!(s.n_toys, 3);
        assert_eq!(s.n_converged, 2);
        assert!((s.converged_fraction() - 2.0 / 3.0).abs() < 1e-12);
        assert!((s.lambda.mean - 0.1).abs() < 1e-12);
        assert!((s.a0.mean - 1000.0).abs() < 1e-9);
        assert!(s.a0.pull_mean.abs() < 1e-12);
        // Pulls of ±0.5 have sample std sqrt(0.5).
        assert!((s.a0.pull_std - 0.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.param(ParamIndex::Lambda).truth, 0.1);
    }

    #[test]
    fn empty_toy_batch_is_nan_not_panic() {
        let s = summarize_toys(&REFERENCE_TRUTH, &[], 1);
        assert!(s.lambda.mean.is_nan());
        assert!(s.converged_fraction().is_nan());

        let back: ToySummary = serde_json::from_str(&serde_json::to_string(&s).unwrap()).unwrap();
        assert!(back.a0.pull_std.is_nan());
        assert!(back.chi2_mean.is_nan());
        assert_eq!(back.a0.truth, REFERENCE_TRUTH.a0);
    }

    #[test]
    fn report_of_failed_fit_reads_back() {
        let result = FitResult {
            errors: DecayParams::new(f64::NAN, f64::NAN),
            covariance: None,
            edm: f64::NAN,
            ..sample_result(0.2, 900.0, false)
        };
        let report = FitReport::new(&FitConfig::default(), &Dataset::reference(), &result);
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains(r#""edm":null"#));

        let back: FitReport = serde_json::from_str(&json).unwrap();
        assert!(!back.result.converged);
        assert!(back.result.errors.lambda.is_nan() && back.result.errors.a0.is_nan());
        assert!(back.result.edm.is_nan());
        assert_eq!(back.result.params, result.params);
        assert!(back.correlation.is_none());
    }
}
