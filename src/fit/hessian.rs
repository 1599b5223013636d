//! Curvature at the minimum: finite-difference Hessian, covariance and EDM.
//!
//! With an analytic gradient the Hessian is the `finitediff` Jacobian of that
//! gradient; otherwise it comes from second differences of the values alone.
//! The covariance of a chi-square-like objective with error definition `up` is
//!
//! ```text
//! V = 2 · up · H⁻¹
//! ```
//!
//! Inversion goes through Cholesky with geometric diagonal damping, so a
//! slightly indefinite numerical Hessian still yields usable errors while a
//! clearly broken one is rejected.

use finitediff::FiniteDiff;
use nalgebra::DMatrix;

use crate::fit::adapter::{Budget, DiffScheme, StepCoords};
use crate::fit::error::FitError;
use crate::fit::minimizer::Objective;

/// Relative step for Hessian differencing.
const HESSIAN_REL_STEP: f64 = 1e-4;

/// Hessian of `objective` at `x` restricted to `indices` (in that order).
///
/// `scheme` picks forward or central differencing of an analytic gradient.
/// Value-only objectives always use forward second differences. `charge` is
/// called once per evaluation about to be spent.
pub fn compute_hessian<C>(
    objective: &dyn Objective,
    x: &[f64],
    indices: &[usize],
    scheme: DiffScheme,
    charge: C,
) -> Result<DMatrix<f64>, FitError>
where
    C: Fn(u64) -> Result<(), FitError>,
{
    let n = indices.len();
    let analytic = objective.gradient(x).is_some();
    if analytic {
        charge(1)?;
    }

    let coords = StepCoords::new(x, indices, HESSIAN_REL_STEP);
    let budget = Budget::new(charge);
    let w0 = coords.origin();

    let hw = if analytic {
        let grad = |w: &Vec<f64>| -> Vec<f64> {
            if !budget.spend() {
                return vec![f64::NAN; n];
            }
            match objective.gradient(&coords.to_full(w)) {
                Some(gx) => coords.to_step_gradient(&gx),
                None => vec![f64::NAN; n],
            }
        };
        match scheme {
            DiffScheme::Forward => w0.forward_hessian(&grad),
            DiffScheme::Central => w0.central_hessian(&grad),
        }
    } else {
        let cost = |w: &Vec<f64>| -> f64 {
            if budget.spend() {
                objective.value(&coords.to_full(w))
            } else {
                f64::NAN
            }
        };
        w0.forward_hessian_nograd(&cost)
    };
    let hw = budget.settle(hw)?;

    let scale = coords.scale();
    let mut hessian = DMatrix::from_fn(n, n, |r, c| hw[r][c] / (scale[r] * scale[c]));

    // Symmetrise: H = (H + H^T) / 2
    let ht = hessian.transpose();
    hessian = (&hessian + &ht) * 0.5;

    Ok(hessian)
}

/// Invert a Hessian via damped Cholesky.
///
/// Returns `None` if no damping level produces a positive-definite matrix with
/// finite, positive diagonal inverse.
pub fn invert_hessian(hessian: &DMatrix<f64>) -> Option<DMatrix<f64>> {
    let n = hessian.nrows();
    if n == 0 || hessian.iter().any(|v| !v.is_finite()) {
        return None;
    }
    let identity = DMatrix::identity(n, n);
    let diag_scale = (0..n)
        .map(|i| hessian[(i, i)].abs())
        .fold(0.0_f64, f64::max)
        .max(f64::MIN_POSITIVE);

    let mut damped = hessian.clone();
    let mut damping = 0.0_f64;
    let max_attempts = 10;

    for attempt in 0..max_attempts {
        if let Some(chol) = nalgebra::linalg::Cholesky::new(damped.clone()) {
            if attempt > 0 {
                tracing::warn!(damping, "Hessian not positive definite; inverted with damping");
            }
            let inverse = chol.solve(&identity);
            let diag_ok = (0..n).all(|i| inverse[(i, i)].is_finite() && inverse[(i, i)] > 0.0);
            return diag_ok.then_some(inverse);
        }

        let next_damping = if damping == 0.0 {
            diag_scale * 1e-9
        } else {
            damping * 10.0
        };
        for i in 0..n {
            damped[(i, i)] += next_damping - damping;
        }
        damping = next_damping;
    }

    tracing::warn!("Hessian inversion failed");
    None
}

/// Covariance `2 · up · H⁻¹` from an inverted Hessian.
pub fn covariance_from_inverse(inverse: &DMatrix<f64>, up: f64) -> DMatrix<f64> {
    inverse * (2.0 * up)
}

/// Estimated distance to minimum, `0.5 · gᵀ H⁻¹ g`.
pub fn edm(gradient: &[f64], inverse: &DMatrix<f64>) -> f64 {
    let n = gradient.len();
    let mut acc = 0.0;
    for i in 0..n {
        for j in 0..n {
            acc += gradient[i] * inverse[(i, j)] * gradient[j];
        }
    }
    0.5 * acc
}
