//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - rendered as JSON for scripting
//! - compared across pseudo-experiments

use serde::{Deserialize, Serialize};

use crate::error::{AppError, EXIT_INVALID_INPUT};

/// JSON form of floats that may be NaN or infinite.
///
/// JSON has no such numbers; they are written as `null` and read back as NaN.
/// Unconverged fits carry NaN errors, so reports depend on this to read back.
pub mod float_or_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &f64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if value.is_finite() {
            serializer.serialize_some(value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<f64, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }
}

/// A single activity measurement with asymmetric uncertainties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Measured activity `A(t)`.
    pub observed: f64,
    /// Measurement time (days).
    pub t: f64,
    /// Uncertainty below the measured value.
    pub err_minus: f64,
    /// Uncertainty above the measured value.
    pub err_plus: f64,
}

impl DataPoint {
    pub const fn new(observed: f64, t: f64, err_minus: f64, err_plus: f64) -> Self {
        Self {
            observed,
            t,
            err_minus,
            err_plus,
        }
    }

    /// Quadrature sum of both uncertainties.
    ///
    /// Kept for reporting; the chi-square never uses it.
    pub fn combined_error(&self) -> f64 {
        self.err_minus.hypot(self.err_plus)
    }

    /// Uncertainty that normalizes the residual `diff = prediction - observed`.
    ///
    /// A prediction above the measurement is compared against the upper error
    /// bar; anything else (including an exact hit) uses the lower one.
    pub fn error_for(&self, diff: f64) -> f64 {
        if diff > 0.0 {
            self.err_plus
        } else {
            self.err_minus
        }
    }
}

/// An ordered, validated collection of measurements.
///
/// Invariant: every uncertainty is finite and strictly positive, so the
/// chi-square never divides by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    points: Vec<DataPoint>,
}

impl Dataset {
    pub fn new(points: Vec<DataPoint>) -> Result<Self, AppError> {
        if points.is_empty() {
            return Err(AppError::new(EXIT_INVALID_INPUT, "Dataset has no data points."));
        }
        for (i, p) in points.iter().enumerate() {
            if !(p.observed.is_finite() && p.t.is_finite()) {
                return Err(AppError::new(
                    EXIT_INVALID_INPUT,
                    format!("Data point {i} has a non-finite value or time."),
                ));
            }
            if !(p.err_minus.is_finite() && p.err_minus > 0.0) {
                return Err(AppError::new(
                    EXIT_INVALID_INPUT,
                    format!("Data point {i}: err_minus={} must be finite and > 0.", p.err_minus),
                ));
            }
            if !(p.err_plus.is_finite() && p.err_plus > 0.0) {
                return Err(AppError::new(
                    EXIT_INVALID_INPUT,
                    format!("Data point {i}: err_plus={} must be finite and > 0.", p.err_plus),
                ));
            }
        }
        Ok(Self { points })
    }

    /// Build from points already known to satisfy the invariant.
    pub(crate) fn new_unchecked(points: Vec<DataPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Position of each decay parameter in the minimizer's variable list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamIndex {
    Lambda = 0,
    A0 = 1,
}

impl ParamIndex {
    pub const ALL: [ParamIndex; 2] = [ParamIndex::Lambda, ParamIndex::A0];

    /// Number of model parameters.
    pub const COUNT: usize = 2;

    pub fn index(self) -> usize {
        self as usize
    }

    /// Variable name registered with the minimizer.
    pub fn name(self) -> &'static str {
        match self {
            ParamIndex::Lambda => "lambda",
            ParamIndex::A0 => "A0",
        }
    }
}

/// Decay-law parameters `(λ, A0)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayParams {
    /// Decay constant (1/day).
    #[serde(with = "float_or_null")]
    pub lambda: f64,
    /// Activity at `t = 0`.
    #[serde(with = "float_or_null")]
    pub a0: f64,
}

impl DecayParams {
    pub const fn new(lambda: f64, a0: f64) -> Self {
        Self { lambda, a0 }
    }

    /// Read parameters from a minimizer vector laid out by [`ParamIndex`].
    ///
    /// # Panics
    /// Panics if `x` is shorter than [`ParamIndex::COUNT`].
    pub fn from_slice(x: &[f64]) -> Self {
        Self {
            lambda: x[ParamIndex::Lambda.index()],
            a0: x[ParamIndex::A0.index()],
        }
    }

    pub fn to_array(self) -> [f64; ParamIndex::COUNT] {
        let mut out = [0.0; ParamIndex::COUNT];
        out[ParamIndex::Lambda.index()] = self.lambda;
        out[ParamIndex::A0.index()] = self.a0;
        out
    }

    pub fn get(&self, which: ParamIndex) -> f64 {
        match which {
            ParamIndex::Lambda => self.lambda,
            ParamIndex::A0 => self.a0,
        }
    }
}

/// How much effort the minimizer spends on curvature estimates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Forward-difference Hessian.
    Fast,
    /// Central-difference Hessian.
    Default,
    /// Central-difference Hessian plus a polishing re-minimization.
    Thorough,
}

impl Strategy {
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Strategy::Fast),
            1 => Some(Strategy::Default),
            2 => Some(Strategy::Thorough),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Strategy::Fast => 0,
            Strategy::Default => 1,
            Strategy::Thorough => 2,
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Minimizer backend name passed to the factory.
    pub backend: String,
    /// Algorithm name passed to the factory.
    pub algorithm: String,

    pub initial: DecayParams,
    pub steps: DecayParams,

    pub strategy: Strategy,
    pub max_function_calls: u64,
    pub max_iterations: u64,
    pub tolerance: f64,

    /// Run the profile scan for asymmetric errors after the fit.
    pub minos: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            backend: "argmin".to_string(),
            algorithm: "migrad".to_string(),
            initial: DecayParams::new(0.2, 900.0),
            steps: DecayParams::new(0.01, 10.0),
            strategy: Strategy::Thorough,
            max_function_calls: 10_000,
            max_iterations: 10_000,
            tolerance: 1e-6,
            minos: false,
        }
    }
}

/// Asymmetric error interval from a profile scan.
///
/// `lower` is a negative offset and `upper` a positive one, both relative to
/// the best-fit value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MinosError {
    #[serde(with = "float_or_null")]
    pub lower: f64,
    #[serde(with = "float_or_null")]
    pub upper: f64,
    pub lower_valid: bool,
    pub upper_valid: bool,
}

impl MinosError {
    pub fn is_valid(&self) -> bool {
        self.lower_valid && self.upper_valid
    }
}

/// Output of a single decay fit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitResult {
    pub params: DecayParams,
    /// Parabolic (Hessian) standard errors.
    pub errors: DecayParams,
    #[serde(with = "float_or_null")]
    pub chi2: f64,
    pub converged: bool,

    pub n_points: usize,
    pub n_params: usize,

    /// Covariance matrix in [`ParamIndex`] order, when it could be formed.
    pub covariance: Option<[[f64; ParamIndex::COUNT]; ParamIndex::COUNT]>,
    /// Estimated distance to minimum.
    #[serde(with = "float_or_null")]
    pub edm: f64,
    pub function_calls: u64,
    pub iterations: u64,

    pub minos_lambda: Option<MinosError>,
    pub minos_a0: Option<MinosError>,
}

impl FitResult {
    /// Degrees of freedom of the chi-square.
    pub fn ndf(&self) -> usize {
        self.n_points.saturating_sub(self.n_params)
    }

    /// Correlation coefficient between λ and A0.
    pub fn correlation(&self) -> Option<f64> {
        let cov = self.covariance?;
        let l = ParamIndex::Lambda.index();
        let a = ParamIndex::A0.index();
        let denom = (cov[l][l] * cov[a][a]).sqrt();
        if denom.is_finite() && denom > 0.0 {
            Some(cov[l][a] / denom)
        } else {
            None
        }
    }

    pub fn minos(&self, which: ParamIndex) -> Option<MinosError> {
        match which {
            ParamIndex::Lambda => self.minos_lambda,
            ParamIndex::A0 => self.minos_a0,
        }
    }
}

/// Per-point fitted value and residual (used for the detail table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointResidual {
    pub point: DataPoint,
    #[serde(with = "float_or_null")]
    pub predicted: f64,
    /// `predicted - observed`, the sign that selects the error bar.
    #[serde(with = "float_or_null")]
    pub diff: f64,
    pub error_used: f64,
    #[serde(with = "float_or_null")]
    pub pull: f64,
    #[serde(with = "float_or_null")]
    pub chi2_term: f64,
}
