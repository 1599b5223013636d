//! Model evaluation for the exponential decay law.
//!
//! The fitter relies on two primitive operations:
//! - predict `A(t)` given `(λ, A0)` (for the chi-square and residuals)
//! - the partial derivatives of `A(t)` with respect to `(λ, A0)` (for the
//!   analytic chi-square gradient)
//!
//! Neither guards against overflow/underflow of `exp(-λ t)`; extreme inputs
//! propagate as infinities or zeros.

use crate::domain::{DecayParams, ParamIndex};

/// Predict the activity `A0 · exp(-λ t)`.
pub fn predict(params: &DecayParams, t: f64) -> f64 {
    params.a0 * (-params.lambda * t).exp()
}

/// Gradient of [`predict`] with respect to the parameters, in [`ParamIndex`] order.
pub fn predict_gradient(params: &DecayParams, t: f64) -> [f64; ParamIndex::COUNT] {
    let decay = (-params.lambda * t).exp();
    let mut out = [0.0; ParamIndex::COUNT];
    out[ParamIndex::Lambda.index()] = -params.a0 * t * decay;
    out[ParamIndex::A0.index()] = decay;
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_decay_is_constant() {
        let p = DecayParams::new(0.0, 742.5);
        for &t in &[0.0, 1.0, 13.7, 1e3] {
            assert_eq!(predict(&p, t), 742.5);
        }
    }

    #[test]
    fn time_zero_returns_initial_activity() {
        for &lambda in &[-0.5, 0.0, 0.1, 3.0] {
            let p = DecayParams::new(lambda, 1000.0);
            assert_eq!(predict(&p, 0.0), 1000.0);
        }
    }

    #[test]
    fn one_half_life() {
        let lambda = 0.1;
        let p = DecayParams::new(lambda, 1000.0);
        let half_life = std::f64::consts::LN_2 / lambda;
        assert!((predict(&p, half_life) - 500.0).abs() < 1e-9);
    }

    #[test]
    fn gradient_matches_finite_difference() {
        let p = DecayParams::new(0.12, 950.0);
        let t = 7.5;
        let g = predict_gradient(&p, t);

        let h = 1e-6;
        let dl = (predict(&DecayParams::new(p.lambda + h, p.a0), t)
            - predict(&DecayParams::new(p.lambda - h, p.a0), t))
            / (2.0 * h);
        let da = (predict(&DecayParams::new(p.lambda, p.a0 + h), t)
            - predict(&DecayParams::new(p.lambda, p.a0 - h), t))
            / (2.0 * h);

        assert!((g[0] - dl).abs() < 1e-4 * dl.abs().max(1.0));
        assert!((g[1] - da).abs() < 1e-6);
    }
}
