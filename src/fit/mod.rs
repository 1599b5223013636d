//! Chi-square fitting.
//!
//! Responsibilities:
//!
//! - evaluate the asymmetric-error chi-square ([`chi2`])
//! - expose a minimizer capability and its `argmin` backend ([`minimizer`], [`lbfgs`])
//! - derive parabolic and profile-scan errors ([`hessian`], [`minos`])
//! - drive one fit from configuration to [`crate::domain::FitResult`] ([`driver`])

pub mod adapter;
pub mod chi2;
pub mod driver;
pub mod error;
pub mod hessian;
pub mod lbfgs;
pub mod minimizer;
pub mod minos;

pub use chi2::{ChiSquare, chi_square, chi_square_gradient};
pub use driver::{fit_decay, fit_with};
pub use error::FitError;
pub use minimizer::{CHI2_ERROR_DEF, Minimizer, Objective, create_minimizer};
