//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - measurements and the validated dataset (`DataPoint`, `Dataset`)
//! - the named parameter layout (`ParamIndex`, `DecayParams`)
//! - run configuration (`FitConfig`, `Strategy`)
//! - fit outputs (`FitResult`, `MinosError`, `PointResidual`)

pub mod types;

pub use types::*;
