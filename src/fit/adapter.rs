//! Adapter that exposes an [`Objective`] as an `argmin` problem.
//!
//! The solver never sees the user's parameters directly. It works in internal
//! coordinates `u` over the free variables only:
//!
//! ```text
//! x[free[k]] = origin[k] + scale[k] * u[k]
//! ```
//!
//! with `scale[k]` roughly one standard error, so a unit step in `u` is a
//! comparable move for every parameter regardless of its natural magnitude.
//! Fixed variables keep their template value.
//!
//! Every objective evaluation is charged against a shared [`CallTracker`],
//! which also remembers the lowest point seen so a run cut short by the call
//! budget or a solver abort still has something to report.
//!
//! Objectives without an analytic gradient are differenced with `finitediff`.
//! Its closures cannot fail, so a refused evaluation is parked in a [`Budget`]
//! and surfaced once the differencing returns.

use std::cell::RefCell;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use argmin::core::{CostFunction, Error, Gradient};
use finitediff::FiniteDiff;

use crate::fit::error::FitError;
use crate::fit::minimizer::Objective;

/// Step `finitediff` takes in every coordinate, `sqrt(f64::EPSILON)`.
const FD_STEP: f64 = 1.490_116_119_384_765_6e-8;

/// Relative gradient steps: `sqrt(eps)` forward, `cbrt(eps)` central.
const FORWARD_REL_STEP: f64 = FD_STEP;
const CENTRAL_REL_STEP: f64 = 6.055_454_452_393_34e-6;

/// Finite-difference scheme used when the objective has no analytic gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffScheme {
    Forward,
    Central,
}

/// Lowest objective value observed and where.
#[derive(Debug, Clone)]
pub struct BestPoint {
    pub x: Vec<f64>,
    pub value: f64,
}

/// Counts objective evaluations against a ceiling and tracks the best point.
#[derive(Debug)]
pub struct CallTracker {
    limit: u64,
    calls: AtomicU64,
    best: Mutex<Option<BestPoint>>,
}

impl CallTracker {
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            calls: AtomicU64::new(0),
            best: Mutex::new(None),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn exhausted(&self) -> bool {
        self.calls() >= self.limit
    }

    /// Reserve `n` evaluations, failing once the ceiling would be exceeded.
    pub fn charge(&self, n: u64) -> Result<(), FitError> {
        let used = self.calls();
        if used.saturating_add(n) > self.limit {
            return Err(FitError::CallLimit { limit: self.limit });
        }
        self.calls.store(used + n, Ordering::Relaxed);
        Ok(())
    }

    /// Record evaluations that are not subject to the ceiling.
    pub fn add_uncharged(&self, n: u64) {
        self.calls.store(self.calls().saturating_add(n), Ordering::Relaxed);
    }

    pub fn record(&self, x: &[f64], value: f64) {
        if !value.is_finite() {
            return;
        }
        let mut best = self.best.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let improves = best.as_ref().is_none_or(|b| value < b.value);
        if improves {
            *best = Some(BestPoint {
                x: x.to_vec(),
                value,
            });
        }
    }

    pub fn best(&self) -> Option<BestPoint> {
        self.best
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

/// Mapping between the solver's internal coordinates and full parameter vectors.
#[derive(Debug, Clone)]
pub struct FreeLayout {
    template: Vec<f64>,
    free: Vec<usize>,
    origin: Vec<f64>,
    scale: Vec<f64>,
}

impl FreeLayout {
    /// `scale` has one entry per free index and must be finite and positive.
    pub fn new(template: Vec<f64>, free: Vec<usize>, scale: Vec<f64>) -> Self {
        let origin = free.iter().map(|&i| template[i]).collect();
        Self {
            template,
            free,
            origin,
            scale,
        }
    }

    pub fn free(&self) -> &[usize] {
        &self.free
    }

    pub fn n_free(&self) -> usize {
        self.free.len()
    }

    /// Internal coordinates of the template point (all zeros).
    pub fn start(&self) -> Vec<f64> {
        vec![0.0; self.free.len()]
    }

    pub fn to_full(&self, u: &[f64]) -> Vec<f64> {
        let mut x = self.template.clone();
        for (k, &i) in self.free.iter().enumerate() {
            x[i] = self.origin[k] + self.scale[k] * u[k];
        }
        x
    }

    /// Chain rule: gradient over the full vector to gradient over `u`.
    pub fn to_internal_gradient(&self, gx: &[f64]) -> Vec<f64> {
        self.free
            .iter()
            .zip(&self.scale)
            .map(|(&i, &s)| gx[i] * s)
            .collect()
    }
}

/// Bridges an [`Objective`] to `argmin`'s `CostFunction` and `Gradient`.
pub struct ArgminProblem<'a> {
    objective: &'a dyn Objective,
    layout: &'a FreeLayout,
    tracker: &'a CallTracker,
    scheme: DiffScheme,
}

impl<'a> ArgminProblem<'a> {
    pub fn new(
        objective: &'a dyn Objective,
        layout: &'a FreeLayout,
        tracker: &'a CallTracker,
        scheme: DiffScheme,
    ) -> Self {
        Self {
            objective,
            layout,
            tracker,
            scheme,
        }
    }
}

impl CostFunction for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, u: &Self::Param) -> Result<Self::Output, Error> {
        self.tracker.charge(1)?;
        let x = self.layout.to_full(u);
        let value = self.objective.value(&x);
        self.tracker.record(&x, value);
        tracing::trace!(value, "objective evaluated");
        Ok(value)
    }
}

impl Gradient for ArgminProblem<'_> {
    type Param = Vec<f64>;
    type Gradient = Vec<f64>;

    fn gradient(&self, u: &Self::Param) -> Result<Self::Gradient, Error> {
        let x = self.layout.to_full(u);
        let gx = full_gradient(
            self.objective,
            &x,
            self.layout.free(),
            self.scheme,
            |n| self.tracker.charge(n),
        )?;
        Ok(self.layout.to_internal_gradient(&gx))
    }
}

/// Call budget usable from inside `finitediff` closures.
///
/// [`Budget::spend`] charges one evaluation and returns `false` once the
/// budget refuses; the first refusal is kept and returned by [`Budget::settle`].
pub struct Budget<C> {
    charge: C,
    refused: RefCell<Option<FitError>>,
}

impl<C> Budget<C>
where
    C: Fn(u64) -> Result<(), FitError>,
{
    pub fn new(charge: C) -> Self {
        Self {
            charge,
            refused: RefCell::new(None),
        }
    }

    pub fn spend(&self) -> bool {
        if self.refused.borrow().is_some() {
            return false;
        }
        match (self.charge)(1) {
            Ok(()) => true,
            Err(e) => {
                *self.refused.borrow_mut() = Some(e);
                false
            }
        }
    }

    pub fn settle<T>(self, value: T) -> Result<T, FitError> {
        match self.refused.into_inner() {
            Some(e) => Err(e),
            None => Ok(value),
        }
    }
}

/// Coordinates `w` around `base` in which `finitediff`'s fixed step becomes a
/// step of `rel_step · max(|x_i|, 1)` in each selected variable:
///
/// ```text
/// x[indices[k]] = base[indices[k]] + scale[k] * w[k]
/// ```
pub struct StepCoords<'a> {
    base: &'a [f64],
    indices: &'a [usize],
    scale: Vec<f64>,
}

impl<'a> StepCoords<'a> {
    pub fn new(base: &'a [f64], indices: &'a [usize], rel_step: f64) -> Self {
        let scale = indices
            .iter()
            .map(|&i| rel_step * base[i].abs().max(1.0) / FD_STEP)
            .collect();
        Self {
            base,
            indices,
            scale,
        }
    }

    pub fn origin(&self) -> Vec<f64> {
        vec![0.0; self.indices.len()]
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn to_full(&self, w: &[f64]) -> Vec<f64> {
        let mut x = self.base.to_vec();
        for ((&i, &s), &wk) in self.indices.iter().zip(&self.scale).zip(w) {
            x[i] = self.base[i] + s * wk;
        }
        x
    }

    /// Gradient over the full vector to gradient over `w`.
    pub fn to_step_gradient(&self, gx: &[f64]) -> Vec<f64> {
        self.indices
            .iter()
            .zip(&self.scale)
            .map(|(&i, &s)| gx[i] * s)
            .collect()
    }
}

/// Gradient of `objective` at `x`; only `indices` are filled when differencing.
///
/// `charge` is called once per evaluation about to be spent.
pub fn full_gradient<C>(
    objective: &dyn Objective,
    x: &[f64],
    indices: &[usize],
    scheme: DiffScheme,
    charge: C,
) -> Result<Vec<f64>, FitError>
where
    C: Fn(u64) -> Result<(), FitError>,
{
    if let Some(g) = objective.gradient(x) {
        charge(1)?;
        return Ok(g);
    }

    let rel_step = match scheme {
        DiffScheme::Forward => FORWARD_REL_STEP,
        DiffScheme::Central => CENTRAL_REL_STEP,
    };
    let coords = StepCoords::new(x, indices, rel_step);
    let budget = Budget::new(charge);
    let cost = |w: &Vec<f64>| -> f64 {
        if budget.spend() {
            objective.value(&coords.to_full(w))
        } else {
            f64::NAN
        }
    };

    let w0 = coords.origin();
    let gw = match scheme {
        DiffScheme::Forward => w0.forward_diff(&cost),
        DiffScheme::Central => w0.central_diff(&cost),
    };
    let gw = budget.settle(gw)?;

    let mut g = vec![0.0; x.len()];
    for ((&i, &s), d) in indices.iter().zip(coords.scale()).zip(gw) {
        g[i] = d / s;
    }
    Ok(g)
}
