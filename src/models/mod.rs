//! Exponential decay model.
//!
//! The model is implemented as small, pure functions so that fitting code can
//! stay generic.

pub mod model;

pub use model::*;
