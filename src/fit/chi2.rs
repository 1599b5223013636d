//! Chi-square with asymmetric uncertainties.
//!
//! For each measurement the residual is `diff = prediction - observed`. A
//! positive `diff` is normalized by `err_plus`, anything else by `err_minus`,
//! so the effective uncertainty depends on which side of the measurement the
//! current curve passes:
//!
//! ```text
//! χ²(λ, A0) = Σ diff_i² / err_i(diff_i)²
//! ```
//!
//! `diff == 0` selects `err_minus`. That boundary is a convention, not domain
//! physics; the term is zero either way, so only bit-level reproducibility of
//! the selection depends on it.

use crate::domain::{Dataset, DecayParams, ParamIndex};
use crate::fit::minimizer::Objective;
use crate::models::{predict, predict_gradient};

/// Evaluate the chi-square of `params` against `dataset`.
pub fn chi_square(params: &DecayParams, dataset: &Dataset) -> f64 {
    let mut total = 0.0;
    for dp in dataset.points() {
        let diff = predict(params, dp.t) - dp.observed;
        let err = dp.error_for(diff);
        total += (diff * diff) / (err * err);
    }
    total
}

/// Analytic gradient of [`chi_square`] in [`ParamIndex`] order.
///
/// Exact away from the `diff == 0` kinks. At a kink both one-sided
/// derivatives vanish, so the value is still exact there.
pub fn chi_square_gradient(params: &DecayParams, dataset: &Dataset) -> [f64; ParamIndex::COUNT] {
    let mut grad = [0.0; ParamIndex::COUNT];
    for dp in dataset.points() {
        let diff = predict(params, dp.t) - dp.observed;
        let err = dp.error_for(diff);
        let scale = 2.0 * diff / (err * err);
        let dpred = predict_gradient(params, dp.t);
        for (g, d) in grad.iter_mut().zip(dpred) {
            *g += scale * d;
        }
    }
    grad
}

/// Chi-square objective over an owned dataset, ready to hand to a minimizer.
#[derive(Debug, Clone)]
pub struct ChiSquare {
    dataset: Dataset,
}

impl ChiSquare {
    pub fn new(dataset: Dataset) -> Self {
        Self { dataset }
    }

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }
}

impl Objective for ChiSquare {
    fn dim(&self) -> usize {
        ParamIndex::COUNT
    }

    fn value(&self, x: &[f64]) -> f64 {
        chi_square(&DecayParams::from_slice(x), &self.dataset)
    }

    fn gradient(&self, x: &[f64]) -> Option<Vec<f64>> {
        Some(chi_square_gradient(&DecayParams::from_slice(x), &self.dataset).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::REFERENCE_TRUTH;
    use crate::domain::DataPoint;

    fn single_point() -> Dataset {
        // observed=100 at t=0, err_minus=10, err_plus=5.
        Dataset::new(vec![DataPoint::new(100.0, 0.0, 10.0, 5.0)]).unwrap()
    }

    #[test]
    fn overshoot_uses_upper_error() {
        let ds = single_point();
        // λ is irrelevant at t=0; A0 is the prediction.
        let chi2 = chi_square(&DecayParams::new(0.3, 110.0), &ds);
        assert_eq!(chi2, 4.0);
    }

    #[test]
    fn undershoot_uses_lower_error() {
        let ds = single_point();
        let chi2 = chi_square(&DecayParams::new(0.3, 90.0), &ds);
        assert_eq!(chi2, 1.0);
    }

    #[test]
    fn exact_hit_is_zero() {
        let ds = single_point();
        assert_eq!(chi_square(&DecayParams::new(0.3, 100.0), &ds), 0.0);
    }

    #[test]
    fn non_negative_over_a_parameter_grid() {
        let ds = Dataset::reference();
        for i in 0..21 {
            for j in 0..21 {
                let lambda = -0.5 + 0.05 * i as f64;
                let a0 = -500.0 + 150.0 * j as f64;
                let v = chi_square(&DecayParams::new(lambda, a0), &ds);
                assert!(v >= 0.0, "chi2({lambda}, {a0}) = {v}");
            }
        }
    }

    #[test]
    fn truth_beats_initial_guess() {
        let ds = Dataset::reference();
        let at_truth = chi_square(&REFERENCE_TRUTH, &ds);
        let at_guess = chi_square(&DecayParams::new(0.2, 900.0), &ds);
        assert!(at_truth < 20.0, "chi2 at truth = {at_truth}");
        assert!(at_truth * 10.0 < at_guess, "{at_truth} vs {at_guess}");
    }

    #[test]
    fn repeated_evaluation_is_bit_identical() {
        let ds = Dataset::reference();
        let p = DecayParams::new(0.123, 987.6);
        let first = chi_square(&p, &ds);
        for _ in 0..10 {
            assert_eq!(chi_square(&p, &ds).to_bits(), first.to_bits());
        }
    }

    #[test]
    fn gradient_matches_central_difference() {
        let ds = Dataset::reference();
        let p = DecayParams::new(0.11, 950.0);
        let g = chi_square_gradient(&p, &ds);

        let h_l = 1e-7;
        let h_a = 1e-4;
        let dl = (chi_square(&DecayParams::new(p.lambda + h_l, p.a0), &ds)
            - chi_square(&DecayParams::new(p.lambda - h_l, p.a0), &ds))
            / (2.0 * h_l);
        let da = (chi_square(&DecayParams::new(p.lambda, p.a0 + h_a), &ds)
            - chi_square(&DecayParams::new(p.lambda, p.a0 - h_a), &ds))
            / (2.0 * h_a);

        assert!((g[0] - dl).abs() < 1e-4 * dl.abs().max(1.0), "{} vs {dl}", g[0]);
        assert!((g[1] - da).abs() < 1e-4 * da.abs().max(1.0), "{} vs {da}", g[1]);
    }

    #[test]
    fn objective_uses_index_layout() {
        let ds = Dataset::reference();
        let obj = ChiSquare::new(ds.clone());
        let p = DecayParams::new(0.09, 1010.0);
        assert_eq!(obj.dim(), 2);
        assert_eq!(obj.value(&p.to_array()), chi_square(&p, &ds));
    }
}
