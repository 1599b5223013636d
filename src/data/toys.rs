//! Pseudo-experiment generation.
//!
//! Each toy keeps the template's times and uncertainties and redraws the
//! observed activity around the true curve. The draw is a two-piece normal
//! that mirrors the chi-square's error selection: a measurement that lands
//! below the truth is scattered with `err_plus` (the truth then sits above it,
//! inside its upper error bar) and one that lands above uses `err_minus`.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{DataPoint, Dataset, DecayParams};
use crate::error::{AppError, EXIT_RUNTIME};
use crate::models::predict;

/// Seeded generator for pseudo-datasets.
pub struct ToyGenerator {
    template: Dataset,
    truth: DecayParams,
    rng: StdRng,
    normal: Normal<f64>,
}

impl ToyGenerator {
    pub fn new(template: Dataset, truth: DecayParams, seed: u64) -> Result<Self, AppError> {
        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Noise distribution error: {e}")))?;
        Ok(Self {
            template,
            truth,
            rng: StdRng::seed_from_u64(seed),
            normal,
        })
    }

    pub fn truth(&self) -> DecayParams {
        self.truth
    }

    /// Draw one pseudo-dataset.
    pub fn generate(&mut self) -> Result<Dataset, AppError> {
        let Self {
            template,
            truth,
            rng,
            normal,
        } = self;
        let mut points = Vec::with_capacity(template.len());
        for p in template.points() {
            let mu = predict(truth, p.t);
            let observed = draw_two_piece(rng, normal, mu, p.err_minus, p.err_plus);
            points.push(DataPoint::new(observed, p.t, p.err_minus, p.err_plus));
        }
        Dataset::new(points)
    }
}

/// One draw from a two-piece normal with mode `mu`, width `err_plus` below it
/// and `err_minus` above it.
fn draw_two_piece(
    rng: &mut StdRng,
    normal: &Normal<f64>,
    mu: f64,
    err_minus: f64,
    err_plus: f64,
) -> f64 {
    let z: f64 = normal.sample(&mut *rng);
    let z = z.abs();
    // Both halves share the density value at the mode.
    let p_below = err_plus / (err_minus + err_plus);
    if rng.r#gen::<f64>() < p_below {
        mu - err_plus * z
    } else {
        mu + err_minus * z
    }
}
