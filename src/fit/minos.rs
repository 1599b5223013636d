//! Profile scan for asymmetric (MINOS-style) errors.
//!
//! For one parameter the profile is the objective minimized over every other
//! free parameter with that one held fixed. The error on each side is the
//! offset from the best-fit value at which the profile rises by the error
//! definition `up` above the global minimum.
//!
//! The search works in units of the parabolic error `σ`: it brackets the
//! crossing by doubling the offset (1σ, 2σ, 4σ, ...) and then bisects.

/// Maximum number of bracket doublings (out to 2^11 σ).
const MAX_BRACKET: usize = 12;
/// Maximum number of bisection steps once bracketed.
const MAX_BISECT: usize = 60;
/// Acceptable distance of the profile from `fmin + up`, relative to `up`.
const CROSSING_TOL: f64 = 1e-3;

/// One side of a profile scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Crossing {
    /// Signed offset from the best-fit value.
    pub offset: f64,
    pub valid: bool,
}

impl Crossing {
    fn invalid(offset: f64) -> Self {
        Self {
            offset,
            valid: false,
        }
    }
}

/// Locate where `profile(value) - fmin` reaches `up` on one side of `center`.
///
/// `direction` is `-1.0` for the lower side and `+1.0` for the upper side.
/// `profile` returns `None` when the conditional minimization produced no
/// usable value; the crossing is then reported invalid at the last offset known
/// to lie inside the interval.
pub fn find_crossing<P>(
    center: f64,
    sigma: f64,
    fmin: f64,
    up: f64,
    direction: f64,
    mut profile: P,
) -> Crossing
where
    P: FnMut(f64) -> Option<f64>,
{
    if !(sigma.is_finite() && sigma > 0.0) {
        return Crossing::invalid(0.0);
    }
    let at = |k: f64| center + direction * k * sigma;

    let mut lo = 0.0_f64;
    let mut hi = None;
    let mut k = 1.0_f64;
    for _ in 0..MAX_BRACKET {
        let Some(value) = profile(at(k)) else {
            return Crossing::invalid(direction * lo * sigma);
        };
        if value - fmin >= up {
            hi = Some(k);
            break;
        }
        lo = k;
        k *= 2.0;
    }
    let Some(mut hi) = hi else {
        tracing::warn!(center, direction, "profile never crossed the error threshold");
        return Crossing::invalid(direction * lo * sigma);
    };

    let mut mid = 0.5 * (lo + hi);
    for _ in 0..MAX_BISECT {
        mid = 0.5 * (lo + hi);
        let Some(value) = profile(at(mid)) else {
            return Crossing::invalid(direction * lo * sigma);
        };
        let delta = value - fmin;
        if (delta - up).abs() < CROSSING_TOL * up {
            break;
        }
        if delta < up {
            lo = mid;
        } else {
            hi = mid;
        }
    }

    Crossing {
        offset: direction * mid * sigma,
        valid: true,
    }
}
