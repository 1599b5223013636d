//! `decay-fit` library crate.
//!
//! The binary (`decayfit`) is a thin wrapper around this library so that:
//!
//! - the model, objective and minimizer plumbing are testable without spawning processes
//! - the minimizer sits behind a trait and can be swapped without touching the model
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod models;
pub mod report;
